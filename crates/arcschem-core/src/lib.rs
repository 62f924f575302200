//! arcschem-core: Fréchet-bounded circular-arc schematization (sans-IO).
//!
//! Simplifies a network of polylines that meet at shared stations into
//! a network of circular arcs, one bend at a time, while keeping every
//! crossing and the cyclic order of strokes around it intact.
//!
//! This crate has **no I/O dependencies** -- it operates on in-memory
//! networks and returns structured data. Reading input files and writing
//! SVG lives in `arcschem-export` and `arcschem-bench`.

pub mod diagnostics;
pub mod frechet;
pub mod geometry;
pub mod history;
pub mod network;
pub mod schematization;
pub mod sec;
pub mod types;

pub use diagnostics::{Diagnostics, NoDiagnostics, RunDiagnostics, StepRecord, StepRecorder};
pub use frechet::{FrechetDistance, PolyhedralDistance};
pub use geometry::{Circle, Curve};
pub use history::{HistoryError, HistorySnapshot, SchematizationHistory};
pub use network::{NetworkError, NetworkInput, StrokeNetwork};
pub use schematization::{RunState, Schematization, SchematizationError, SchematizeOutcome};
pub use types::{ConfigError, DistanceKind, Point, Polyline, RunLimits, SchematizationConfig};

/// Schematize `network` until the run ends.
///
/// # Steps
///
/// 1. Validate the configuration and build the distance function
/// 2. Generate and check candidate operations for every bend
/// 3. Commit the cheapest admissible operation, repeatedly, until the
///    arc count reaches `limits.max_complexity`, the cheapest operation
///    costs more than `limits.max_cost`, or nothing admissible is left
///
/// # Errors
///
/// Returns [`SchematizationError::Config`] if the configuration is
/// invalid. Returns the retained error if a commit aborted the run.
pub fn schematize(
    network: StrokeNetwork,
    config: &SchematizationConfig,
    limits: RunLimits,
) -> Result<SchematizeOutcome, SchematizationError> {
    let mut engine = Schematization::new(config.clone())?;
    engine.init(network);
    engine.run(limits);
    if let Some(reason) = engine.abort_reason() {
        return Err(reason.clone());
    }
    Ok(engine.into_outcome())
}
