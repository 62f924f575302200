//! Integration test: schematize a small crossing network and export it to SVG.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use arcschem_core::network::{LineInput, StationInput};
use arcschem_core::{NetworkInput, RunLimits, SchematizationConfig};
use arcschem_export::{SvgOptions, to_svg};

fn station(x: f64, y: f64) -> StationInput {
    StationInput {
        label: String::new(),
        x,
        y,
    }
}

#[test]
fn crossing_network_to_svg() {
    let input = NetworkInput {
        stations: vec![
            station(0.0, 0.0),
            station(-4.0, 0.0),
            station(-2.0, 0.7),
            station(2.0, -0.7),
            station(4.0, 0.0),
            station(0.0, -4.0),
            station(0.7, -2.0),
            station(-0.7, 2.0),
            station(0.0, 4.0),
        ],
        lines: vec![
            LineInput {
                label: "east-west".to_owned(),
                stations: vec![1, 2, 0, 3, 4],
            },
            LineInput {
                label: "north-south".to_owned(),
                stations: vec![5, 6, 0, 7, 8],
            },
        ],
    };
    let network = input.build().unwrap();
    let config = SchematizationConfig::default();
    let outcome = arcschem_core::schematize(network, &config, RunLimits::default())
        .expect("schematization should succeed");
    assert!(outcome.complexity < 8, "expected at least one simplification");

    let options = SvgOptions {
        title: Some("crossing"),
        config_json: Some("{\"candidates\":3}"),
        ..SvgOptions::default()
    };
    let svg = to_svg(&outcome.network, &options);

    assert!(svg.starts_with("<?xml"));
    assert!(svg.contains("<title>crossing</title>"));
    assert!(svg.contains("east-west"));
    assert!(svg.contains("north-south"));
    assert_eq!(svg.matches("<path").count(), 2);
    assert!(svg.contains("<circle"));
    assert!(svg.contains("</svg>"));
}
