//! Run diagnostics: hooks into the engine plus a recorder that turns
//! them into a per-step report.
//!
//! The engine calls a [`Diagnostics`] implementation at every candidate
//! it scores, every operation found blocked, and every committed step.
//! [`NoDiagnostics`] ignores all of them. [`StepRecorder`] keeps the
//! steps and counts the rest.
//!
//! Durations are serialized as fractional seconds (`f64`) for JSON
//! compatibility, since `std::time::Duration` does not implement serde
//! traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::geometry::Curve;
use crate::network::VertexId;
use crate::schematization::{BlockReasons, RunState};

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Observer of engine events. Every method defaults to doing nothing.
pub trait Diagnostics {
    /// A candidate replacement for `vertex` was scored.
    fn candidate_generated(&mut self, _vertex: VertexId, _curve: &Curve, _cost: f64) {}

    /// An operation on `vertex` was found inadmissible.
    fn operation_blocked(&mut self, _vertex: VertexId, _reasons: &BlockReasons) {}

    /// A step was committed.
    fn step_committed(&mut self, _record: &StepRecord) {}
}

/// Diagnostics that ignore every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoDiagnostics;

impl Diagnostics for NoDiagnostics {}

/// One committed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepRecord {
    /// Step number, starting at 1.
    pub step: usize,
    /// Removed vertex.
    pub vertex: VertexId,
    /// Cost of the applied operation.
    pub cost: f64,
    /// Arc count after the step.
    pub complexity_after: usize,
    /// Number of arcs moved to follow the replacement.
    pub extensions: usize,
    /// Wall-clock time spent committing the step (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

/// Collects step records and event counts.
#[derive(Debug, Clone, Default)]
pub struct StepRecorder {
    steps: Vec<StepRecord>,
    candidates: usize,
    blocked: usize,
}

impl StepRecorder {
    /// Create an empty recorder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Steps recorded so far.
    #[must_use]
    pub fn steps(&self) -> &[StepRecord] {
        &self.steps
    }

    /// Summarize the run.
    #[must_use]
    pub fn summary(
        &self,
        initial_complexity: usize,
        final_complexity: usize,
        state: RunState,
        total_duration: Duration,
    ) -> RunDiagnostics {
        RunDiagnostics {
            steps: self.steps.clone(),
            candidates_generated: self.candidates,
            operations_blocked: self.blocked,
            initial_complexity,
            final_complexity,
            state,
            total_duration,
        }
    }
}

impl Diagnostics for StepRecorder {
    fn candidate_generated(&mut self, _vertex: VertexId, _curve: &Curve, _cost: f64) {
        self.candidates += 1;
    }

    fn operation_blocked(&mut self, _vertex: VertexId, _reasons: &BlockReasons) {
        self.blocked += 1;
    }

    fn step_committed(&mut self, record: &StepRecord) {
        self.steps.push(record.clone());
    }
}

/// Diagnostics collected from a whole run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Every committed step.
    pub steps: Vec<StepRecord>,
    /// Candidates scored, including regenerated ones.
    pub candidates_generated: usize,
    /// Operations found blocked, including rechecks.
    pub operations_blocked: usize,
    /// Arc count after initialization.
    pub initial_complexity: usize,
    /// Arc count at the end of the run.
    pub final_complexity: usize,
    /// How the run ended.
    pub state: RunState,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

impl RunDiagnostics {
    /// Highest cost among the committed steps, 0 for an empty run.
    #[must_use]
    pub fn max_cost(&self) -> f64 {
        self.steps.iter().map(|s| s.cost).fold(0.0, f64::max)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Schematization Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Complexity: {} -> {} ({} steps)",
            self.initial_complexity,
            self.final_complexity,
            self.steps.len(),
        ));
        lines.push(format!("Final state: {:?}", self.state));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(format!(
            "Candidates scored: {}  |  Blocked operations: {}",
            self.candidates_generated, self.operations_blocked,
        ));
        lines.push(format!("Max cost: {:.6}", self.max_cost()));
        lines.push(String::new());

        lines.push(format!(
            "{:>6} {:>12} {:>14} {:>10} {:>10}",
            "Step", "Vertex", "Cost", "Arcs", "Duration"
        ));
        lines.push("-".repeat(60));
        for s in &self.steps {
            lines.push(format!(
                "{:>6} {:>12} {:>14.6} {:>10} {:>8.3}ms",
                s.step,
                s.vertex.to_string(),
                s.cost,
                s.complexity_after,
                duration_ms(s.duration),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to fractional milliseconds.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
