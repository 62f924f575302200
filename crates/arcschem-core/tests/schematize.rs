//! Integration tests: schematize small networks end to end and check the
//! geometry that comes out.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use arcschem_core::geometry::{EPS, intersect, intersect_circle};
use arcschem_core::network::{LineInput, StationInput};
use arcschem_core::{
    Circle, Curve, NetworkInput, Point, RunLimits, RunState, Schematization,
    SchematizationConfig, StepRecorder, StrokeNetwork,
};

fn station(x: f64, y: f64) -> StationInput {
    StationInput {
        label: String::new(),
        x,
        y,
    }
}

fn line(label: &str, stations: &[usize]) -> LineInput {
    LineInput {
        label: label.to_owned(),
        stations: stations.to_vec(),
    }
}

/// Three wiggly lines meeting at a hub station at the origin.
fn three_way_hub() -> StrokeNetwork {
    let input = NetworkInput {
        stations: vec![
            station(0.0, 0.0),
            // horizontal
            station(-4.0, 0.0),
            station(-2.0, 0.6),
            station(2.0, -0.6),
            station(4.0, 0.0),
            // vertical
            station(0.0, -4.0),
            station(0.6, -2.0),
            station(-0.6, 2.0),
            station(0.0, 4.0),
            // diagonal
            station(-3.0, -3.0),
            station(-1.2, -1.8),
            station(1.8, 1.2),
            station(3.0, 3.0),
        ],
        lines: vec![
            line("horizontal", &[1, 2, 0, 3, 4]),
            line("vertical", &[5, 6, 0, 7, 8]),
            line("diagonal", &[9, 10, 0, 11, 12]),
        ],
    };
    input.build().unwrap()
}

fn curves(net: &StrokeNetwork) -> Vec<Curve> {
    net.arc_ids().into_iter().map(|a| net.curve(a)).collect()
}

/// Every contact between two arcs away from their endpoints.
fn stray_contacts(net: &StrokeNetwork) -> Vec<(bool, Point)> {
    let arcs = net.arc_ids();
    let mut contacts = Vec::new();
    for (i, &a) in arcs.iter().enumerate() {
        for &b in &arcs[i + 1..] {
            let same_stroke = net.arc_stroke(a) == net.arc_stroke(b);
            let hits = intersect(&net.curve(a), &net.curve(b), false);
            assert!(!hits.is_overlap(), "{a} overlaps {b}");
            contacts.extend(hits.points().iter().map(|&p| (same_stroke, p)));
        }
    }
    contacts
}

/// Stroke labels in the order their arcs cross a circle around `center`,
/// counterclockwise.
fn order_around(net: &StrokeNetwork, center: Point, radius: f64) -> Vec<String> {
    let ring = Circle::new(center, radius);
    let mut hits: Vec<(f64, String)> = Vec::new();
    for arc in net.arc_ids() {
        let label = net.stroke(net.arc_stroke(arc)).label().to_owned();
        for p in intersect_circle(&net.curve(arc), &ring, true).points() {
            let d = *p - center;
            hits.push((d.y.atan2(d.x), label.clone()));
        }
    }
    hits.sort_by(|a, b| a.0.total_cmp(&b.0));
    hits.into_iter().map(|(_, label)| label).collect()
}

/// Whether `b` is a rotation of `a`.
fn same_cycle(a: &[String], b: &[String]) -> bool {
    a.len() == b.len()
        && (0..a.len().max(1)).any(|k| a.iter().cycle().skip(k).zip(b).all(|(x, y)| x == y))
}

#[test]
fn hub_keeps_its_topology() {
    let config = SchematizationConfig::default();
    let initial = three_way_hub();
    let max_cross_distance = initial.diagonal() * config.max_cross_distance_fraction;
    let order_before = order_around(&initial, Point::ORIGIN, 0.8);
    assert_eq!(order_before.len(), 6);

    let mut engine = Schematization::new(config).unwrap();
    assert!(engine.init(initial));
    let cross = engine.network().cross_ids()[0];

    for _ in 0..50 {
        let before = engine.complexity();
        if !engine.step(0, f64::INFINITY) {
            break;
        }
        assert_eq!(engine.complexity(), before - 1);
        assert_eq!(engine.network().arc_count(), engine.complexity());
    }
    assert!(engine.steps() > 0);
    assert_ne!(engine.state(), RunState::Aborted);

    let net = engine.network();
    assert_eq!(net.cross(cross).strokes().len(), 3);

    let order_after = order_around(net, Point::ORIGIN, 0.8);
    assert!(
        same_cycle(&order_before, &order_after),
        "{order_before:?} became {order_after:?}"
    );

    // Contacts between strokes are accounted for by a tracked crossing:
    // inside its disk, or within the displacement allowed since the disk
    // was last settled.
    let disks = net.cross_disks();
    for (same_stroke, p) in stray_contacts(net) {
        assert!(!same_stroke, "stroke touches itself at {p:?}");
        assert!(
            disks.iter().any(|(_, disk)| {
                disk.center.distance(p) <= disk.radius.max(max_cross_distance) + EPS
            }),
            "strokes meet at {p:?}, away from every crossing"
        );
    }
}

#[test]
fn hub_vertices_stay_without_high_degree() {
    let config = SchematizationConfig {
        allow_high_degree: false,
        ..SchematizationConfig::default()
    };
    let mut engine = Schematization::new(config).unwrap();
    engine.init(three_way_hub());
    let cross = engine.network().cross_ids()[0];
    engine.run(RunLimits::default());

    let net = engine.network();
    assert_eq!(net.cross(cross).concrete().len(), 3);
    // Every stroke keeps the hub vertex, so two arcs each at least.
    assert!(engine.complexity() >= 6);
}

/// A wiggly line with a spur ending on its middle station.
fn t_junction() -> StrokeNetwork {
    let input = NetworkInput {
        stations: vec![
            station(0.0, 0.0),
            station(-4.0, 0.0),
            station(-2.0, 0.9),
            station(2.5, 1.0),
            station(4.5, 0.2),
            station(0.5, 1.6),
            station(0.2, 3.2),
        ],
        lines: vec![line("main", &[1, 2, 0, 3, 4]), line("spur", &[0, 5, 6])],
    };
    input.build().unwrap()
}

#[test]
fn spur_end_follows_the_line_it_ends_on() {
    let mut engine = Schematization::with_diagnostics(
        SchematizationConfig::default(),
        StepRecorder::new(),
    )
    .unwrap();
    engine.init(t_junction());
    engine.run(RunLimits::default());
    assert_ne!(engine.state(), RunState::Aborted);
    assert!(
        engine.diagnostics().steps().iter().any(|s| s.extensions > 0),
        "no step slid the spur"
    );

    let net = engine.network();
    let stroke_named = |label: &str| {
        net.strokes()
            .find(|&s| net.stroke(s).label() == label)
            .unwrap()
    };
    let main = stroke_named("main");
    let spur = stroke_named("spur");
    let spur_end = net.vertex(net.stroke(spur).vertices()[0]).position();
    let gap = net
        .arc_ids()
        .into_iter()
        .filter(|&a| net.arc_stroke(a) == main)
        .map(|a| net.curve(a).closest_point(spur_end).distance(spur_end))
        .fold(f64::INFINITY, f64::min);
    assert!(gap < EPS, "spur ends {gap} away from the main line");
}

#[test]
fn complexity_never_increases() {
    let mut engine = Schematization::with_diagnostics(
        SchematizationConfig::default(),
        StepRecorder::new(),
    )
    .unwrap();
    engine.init(three_way_hub());
    let initial = engine.complexity();
    engine.run(RunLimits::default());

    let steps = engine.diagnostics().steps();
    assert_eq!(steps.len(), engine.steps());
    let mut expected = initial;
    for record in steps {
        expected -= 1;
        assert_eq!(record.complexity_after, expected);
    }
    assert_eq!(engine.complexity(), expected);
}

#[test]
fn runs_are_deterministic() {
    let run = || {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(three_way_hub());
        engine.run(RunLimits {
            max_complexity: 4,
            max_cost: f64::INFINITY,
        });
        (engine.state(), engine.complexity(), curves(engine.network()))
    };
    assert_eq!(run(), run());
}

#[test]
fn cost_threshold_bounds_every_step() {
    let max_cost = 0.3;
    let mut engine = Schematization::with_diagnostics(
        SchematizationConfig::default(),
        StepRecorder::new(),
    )
    .unwrap();
    engine.init(three_way_hub());
    let state = engine.run(RunLimits {
        max_complexity: 0,
        max_cost,
    });
    assert!(matches!(state, RunState::ThresholdExceeded | RunState::Stuck));
    assert!(engine.diagnostics().steps().iter().all(|s| s.cost <= max_cost));
}

#[test]
fn history_replays_from_json_input() {
    let input: NetworkInput = serde_json::from_str(
        r#"{
            "stations": [
                {"x": 0.0, "y": 0.0},
                {"x": 1.0, "y": 0.8},
                {"x": 2.0, "y": 0.0},
                {"x": 3.0, "y": 0.8},
                {"x": 4.0, "y": 0.0}
            ],
            "lines": [{"label": "saw", "stations": [0, 1, 2, 3, 4]}]
        }"#,
    )
    .unwrap();
    let net = input.build().unwrap();
    let initial = curves(&net);

    let config = SchematizationConfig {
        record_history: true,
        ..SchematizationConfig::default()
    };
    let outcome = arcschem_core::schematize(net, &config, RunLimits::default()).unwrap();
    let history = outcome.history.unwrap();
    assert_eq!(history.maximum_complexity(), 4);
    assert_eq!(history.minimum_complexity(), outcome.complexity);

    let start: Vec<Curve> = history.at_complexity(4).arcs.iter().map(|a| a.curve).collect();
    assert_eq!(start, initial);

    // Snapshots are ordered by arc handle.
    let end: Vec<Curve> = history
        .at_complexity(0)
        .arcs
        .iter()
        .map(|a| a.curve)
        .collect();
    let mut live = outcome.network.arc_ids();
    live.sort();
    let live: Vec<Curve> = live.into_iter().map(|a| outcome.network.curve(a)).collect();
    assert_eq!(end, live);
}
