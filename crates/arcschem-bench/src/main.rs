//! arcschem-bench: CLI tool for running schematizations headlessly and
//! collecting diagnostics.
//!
//! Reads a network description (stations and lines, as JSON), simplifies
//! it with configurable parameters, and prints a per-step report. Useful
//! for:
//!
//! - Tuning the cost threshold and complexity floor for a data set
//! - Comparing candidate counts, angle resolutions and distance measures
//! - Measuring per-step durations to identify bottlenecks
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin arcschem-bench -- [OPTIONS] <NETWORK_PATH>
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use arcschem_core::{
    DistanceKind, NetworkInput, RunLimits, RunState, Schematization, SchematizationConfig,
    StepRecorder,
};
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Headless schematization runs and diagnostics for arcschem.
///
/// Simplifies a stroke network into circular arcs under a Fréchet
/// distance budget and prints per-step timing and cost diagnostics.
#[derive(Parser)]
#[command(name = "arcschem-bench", version)]
struct Cli {
    /// Path to the network description (JSON with `stations` and `lines`).
    network_path: PathBuf,

    /// Stop once the cheapest admissible operation costs more than this.
    #[arg(short = 'f', long, default_value_t = f64::INFINITY)]
    max_cost: f64,

    /// Stop once the arc count is at or below this.
    #[arg(short = 'c', long, default_value_t = 0)]
    complexity: usize,

    /// Resolution of the tangent-angle sweep.
    #[arg(short = 'a', long, default_value_t = SchematizationConfig::DEFAULT_ANGLE_STEPS)]
    angle_steps: usize,

    /// Candidate replacements kept per vertex.
    #[arg(short = 'n', long, default_value_t = SchematizationConfig::DEFAULT_CANDIDATES)]
    candidates: usize,

    /// Cost multiplier for straight replacements.
    #[arg(short = 's', long, default_value_t = SchematizationConfig::DEFAULT_STRAIGHT_REDUCTION)]
    straight_reduction: f64,

    /// Euclidean approximation factor of the distance measure.
    #[arg(short = 'e', long, default_value_t = SchematizationConfig::DEFAULT_EPSILON)]
    epsilon: f64,

    /// Maximum crossing displacement as a fraction of the network diagonal.
    #[arg(
        short = 'd',
        long,
        default_value_t = SchematizationConfig::DEFAULT_MAX_CROSS_DISTANCE_FRACTION
    )]
    cross_distance: f64,

    /// Never operate on vertices sitting on a crossing.
    #[arg(long)]
    no_high_degree: bool,

    /// Full schematization config as a JSON string.
    ///
    /// When provided, all other config flags are ignored. The JSON must
    /// be a valid `SchematizationConfig` serialization; missing fields
    /// take their defaults.
    #[arg(long)]
    config_json: Option<String>,

    /// Output diagnostics as JSON instead of human-readable report.
    #[arg(long)]
    json: bool,

    /// Write SVG output to file.
    #[arg(long)]
    svg: Option<PathBuf>,

    /// Log engine events at debug level.
    #[arg(short, long)]
    verbose: bool,
}

/// Build a [`SchematizationConfig`] from CLI arguments.
///
/// If `--config-json` is provided, the JSON is parsed directly and all
/// individual parameter flags are ignored. Otherwise, a config is
/// assembled from the individual flags.
fn config_from_cli(cli: &Cli) -> Result<SchematizationConfig, String> {
    if let Some(ref json) = cli.config_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --config-json: {e}"));
    }

    Ok(SchematizationConfig {
        allow_high_degree: !cli.no_high_degree,
        max_cross_distance_fraction: cli.cross_distance,
        angle_steps: cli.angle_steps,
        candidates: cli.candidates,
        straight_reduction: cli.straight_reduction,
        distance: DistanceKind::Approximate {
            epsilon: cli.epsilon,
        },
        ..SchematizationConfig::default()
    })
}

/// Install a stderr subscriber honouring `RUST_LOG`, defaulting to
/// `warn` (`debug` with `--verbose`).
fn init_tracing(verbose: bool) {
    let fallback = if verbose { "debug" } else { "warn" };
    let filter = if verbose {
        EnvFilter::new(fallback)
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let config = match config_from_cli(&cli) {
        Ok(c) => c,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let text = match std::fs::read_to_string(&cli.network_path) {
        Ok(text) => text,
        Err(e) => {
            eprintln!("Error reading {}: {e}", cli.network_path.display());
            return ExitCode::FAILURE;
        }
    };
    let input: NetworkInput = match serde_json::from_str(&text) {
        Ok(input) => input,
        Err(e) => {
            eprintln!("Error parsing {}: {e}", cli.network_path.display());
            return ExitCode::FAILURE;
        }
    };
    let network = match input.build() {
        Ok(network) => network,
        Err(e) => {
            eprintln!("Invalid network: {e}");
            return ExitCode::FAILURE;
        }
    };
    info!(
        stations = input.stations.len(),
        lines = input.lines.len(),
        "loaded network"
    );

    eprintln!("Network: {}", cli.network_path.display());
    eprintln!("Config: {config:#?}");
    eprintln!();

    let mut engine = match Schematization::with_diagnostics(config.clone(), StepRecorder::new()) {
        Ok(engine) => engine,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            return ExitCode::FAILURE;
        }
    };

    let started = Instant::now();
    engine.init(network);
    let initial_complexity = engine.complexity();
    let state = engine.run(RunLimits {
        max_complexity: cli.complexity,
        max_cost: cli.max_cost,
    });
    let diagnostics = engine.diagnostics().summary(
        initial_complexity,
        engine.complexity(),
        state,
        started.elapsed(),
    );

    if cli.json {
        match serde_json::to_string_pretty(&diagnostics) {
            Ok(json) => println!("{json}"),
            Err(e) => {
                eprintln!("Error serializing diagnostics: {e}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        println!("{}", diagnostics.report());
    }

    if let Some(ref svg_path) = cli.svg {
        let title = cli
            .network_path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("network");
        let desc = format!(
            "{} arcs after {} steps ({:?})",
            engine.complexity(),
            engine.steps(),
            state,
        );
        let config_json = serde_json::to_string(&config).ok();
        let options = arcschem_export::SvgOptions {
            title: Some(title),
            description: Some(&desc),
            config_json: config_json.as_deref(),
            ..arcschem_export::SvgOptions::default()
        };
        let svg = arcschem_export::to_svg(engine.network(), &options);
        match std::fs::write(svg_path, &svg) {
            Ok(()) => {
                eprintln!(
                    "SVG written to {} ({} bytes)",
                    svg_path.display(),
                    svg.len(),
                );
            }
            Err(e) => {
                eprintln!("Error writing SVG to {}: {e}", svg_path.display());
                return ExitCode::FAILURE;
            }
        }
    }

    if state == RunState::Aborted {
        if let Some(reason) = engine.abort_reason() {
            eprintln!("Schematization aborted: {reason}");
        }
        return ExitCode::FAILURE;
    }

    ExitCode::SUCCESS
}
