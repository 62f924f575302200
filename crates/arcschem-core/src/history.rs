//! Replayable record of a schematization run.
//!
//! The history keeps the network's arcs and crossing disks as they were
//! at initialization, plus one [`HistoryEntry`] per committed step with
//! the arcs it removed and the arcs and disks it changed. Replaying a
//! prefix of the entries reconstructs the network geometry at any
//! intermediate complexity or cost.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::geometry::{Circle, Curve};
use crate::network::{ArcId, CrossId, StrokeId, StrokeNetwork};

/// Geometry of one arc at some point of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ArcSnapshot {
    /// Arc handle.
    pub arc: ArcId,
    /// Owning stroke.
    pub stroke: StrokeId,
    /// Geometry.
    pub curve: Curve,
}

impl ArcSnapshot {
    /// Capture an arc's current geometry.
    #[must_use]
    pub fn of(net: &StrokeNetwork, arc: ArcId) -> Self {
        Self {
            arc,
            stroke: net.arc_stroke(arc),
            curve: net.curve(arc),
        }
    }
}

/// Disk of one crossing at some point of the run.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CrossSnapshot {
    /// Crossing handle.
    pub cross: CrossId,
    /// Smallest enclosing disk of the meeting points.
    pub disk: Circle,
}

impl CrossSnapshot {
    /// Capture a crossing's current disk.
    #[must_use]
    pub fn of(net: &StrokeNetwork, cross: CrossId) -> Self {
        Self {
            cross,
            disk: *net.cross(cross).disk(),
        }
    }
}

/// Changes made by one committed step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// Cost of the applied operation.
    pub cost: f64,
    /// Arc count after the step.
    pub complexity_after: usize,
    /// Arcs that left the network.
    pub removed_arcs: Vec<ArcId>,
    /// Arcs added or reshaped.
    pub arcs: Vec<ArcSnapshot>,
    /// Crossings whose disk was recomputed.
    pub crosses: Vec<CrossSnapshot>,
}

/// Network geometry at one point of the run, sorted by handle.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySnapshot {
    /// Every live arc.
    pub arcs: Vec<ArcSnapshot>,
    /// Every crossing.
    pub crosses: Vec<CrossSnapshot>,
}

/// Errors raised when querying the history.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum HistoryError {
    /// The engine was configured without history recording.
    #[error("history recording is disabled")]
    NotRecorded,
}

/// The replayable record of a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SchematizationHistory {
    initial_complexity: usize,
    initial_arcs: Vec<ArcSnapshot>,
    initial_crosses: Vec<CrossSnapshot>,
    entries: Vec<HistoryEntry>,
}

impl SchematizationHistory {
    /// Start a history from the network as it is now.
    #[must_use]
    pub fn new(net: &StrokeNetwork) -> Self {
        Self {
            initial_complexity: net.arc_count(),
            initial_arcs: net
                .arc_ids()
                .into_iter()
                .map(|a| ArcSnapshot::of(net, a))
                .collect(),
            initial_crosses: net
                .cross_ids()
                .into_iter()
                .map(|c| CrossSnapshot::of(net, c))
                .collect(),
            entries: Vec::new(),
        }
    }

    /// Append a committed step.
    pub fn record(&mut self, entry: HistoryEntry) {
        self.entries.push(entry);
    }

    /// Committed steps in order.
    #[must_use]
    pub fn entries(&self) -> &[HistoryEntry] {
        &self.entries
    }

    /// Arc count before the first step.
    #[must_use]
    pub const fn maximum_complexity(&self) -> usize {
        self.initial_complexity
    }

    /// Arc count after the last step.
    #[must_use]
    pub fn minimum_complexity(&self) -> usize {
        self.entries
            .last()
            .map_or(self.initial_complexity, |e| e.complexity_after)
    }

    /// Geometry once the complexity first dropped to `complexity` or,
    /// if the run never got that far, at the end of the run.
    #[must_use]
    pub fn at_complexity(&self, complexity: usize) -> HistorySnapshot {
        let mut before = self.initial_complexity;
        let steps = self
            .entries
            .iter()
            .take_while(|e| {
                let take = before > complexity;
                before = e.complexity_after;
                take
            })
            .count();
        self.replay(steps)
    }

    /// Geometry after every step up to the first one costing more than
    /// `cost`.
    #[must_use]
    pub fn at_cost(&self, cost: f64) -> HistorySnapshot {
        let mut worst = f64::NEG_INFINITY;
        let steps = self
            .entries
            .iter()
            .take_while(|e| {
                worst = worst.max(e.cost);
                worst <= cost
            })
            .count();
        self.replay(steps)
    }

    fn replay(&self, steps: usize) -> HistorySnapshot {
        let mut arcs: BTreeMap<ArcId, ArcSnapshot> =
            self.initial_arcs.iter().map(|a| (a.arc, *a)).collect();
        let mut crosses: BTreeMap<CrossId, CrossSnapshot> =
            self.initial_crosses.iter().map(|c| (c.cross, *c)).collect();
        for entry in self.entries.iter().take(steps) {
            for arc in &entry.removed_arcs {
                arcs.remove(arc);
            }
            arcs.extend(entry.arcs.iter().map(|a| (a.arc, *a)));
            crosses.extend(entry.crosses.iter().map(|c| (c.cross, *c)));
        }
        HistorySnapshot {
            arcs: arcs.into_values().collect(),
            crosses: crosses.into_values().collect(),
        }
    }
}
