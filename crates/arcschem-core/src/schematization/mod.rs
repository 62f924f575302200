//! The iterative schematization engine.
//!
//! Every bend of the network (a vertex with an incoming and an outgoing
//! arc) holds a short list of candidate [`Operation`]s, each replacing
//! the bend and its two arcs by one circular arc. A step commits the
//! cheapest admissible operation across the whole network, then
//! regenerates or rechecks only the operations near the change.

mod candidates;
mod extension;
mod operation;
mod topology;

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace};

pub use candidates::{Candidate, CandidateGenerator};
pub use extension::{find_double_extension, find_end_extension, find_start_extension};
pub use operation::{BlockReasons, Operation};
pub use topology::TopologyChecker;

use crate::diagnostics::{Diagnostics, NoDiagnostics, StepRecord};
use crate::frechet::FrechetDistance;
use crate::history::{
    ArcSnapshot, CrossSnapshot, HistoryEntry, HistoryError, SchematizationHistory,
};
use crate::network::{ArcId, CrossId, NetworkError, StrokeNetwork, VertexId};
use crate::types::{ConfigError, Point, RunLimits, SchematizationConfig};

/// Where a run stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum RunState {
    /// No network loaded yet.
    #[default]
    Uninitialized,
    /// Network loaded and operations generated.
    Initialized,
    /// The last step committed an operation.
    StepApplied,
    /// The arc count is at or below the requested floor.
    ComplexityReached,
    /// The cheapest admissible operation costs more than allowed.
    ThresholdExceeded,
    /// No admissible operation is left.
    Stuck,
    /// A commit found the network inconsistent.
    Aborted,
}

impl RunState {
    /// Whether further steps are no-ops until the next `init`.
    #[must_use]
    pub const fn is_latched(self) -> bool {
        matches!(self, Self::Uninitialized | Self::Stuck | Self::Aborted)
    }
}

/// Errors raised by the engine.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchematizationError {
    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    /// The network rejected a mutation.
    #[error("network error: {0}")]
    Network(#[from] NetworkError),

    /// An arc recorded as extending no longer meets the replacement.
    #[error("no extension of {arc} found while removing {vertex}")]
    MissingExtension {
        /// Removed vertex.
        vertex: VertexId,
        /// Arc that should have been extended.
        arc: ArcId,
    },
}

/// Final state of a [`schematize`](crate::schematize) run.
#[derive(Debug, Clone)]
pub struct SchematizeOutcome {
    /// The simplified network.
    pub network: StrokeNetwork,
    /// How the run ended.
    pub state: RunState,
    /// Committed steps.
    pub steps: usize,
    /// Final arc count.
    pub complexity: usize,
    /// Replayable history, when recording was enabled.
    pub history: Option<SchematizationHistory>,
}

/// The engine. Owns the network between `init` and the end of the run.
#[derive(Debug)]
pub struct Schematization<G: Diagnostics = NoDiagnostics> {
    config: SchematizationConfig,
    frechet: FrechetDistance,
    angles: Vec<f64>,
    network: StrokeNetwork,
    operations: BTreeMap<VertexId, Vec<Operation>>,
    complexity: usize,
    max_cross_distance: f64,
    state: RunState,
    abort_reason: Option<SchematizationError>,
    history: Option<SchematizationHistory>,
    steps: usize,
    diagnostics: G,
}

impl Schematization {
    /// Engine with the given configuration and no diagnostics.
    ///
    /// # Errors
    ///
    /// Returns [`SchematizationError::Config`] if the configuration is
    /// invalid.
    pub fn new(config: SchematizationConfig) -> Result<Self, SchematizationError> {
        Self::with_diagnostics(config, NoDiagnostics)
    }
}

impl<G: Diagnostics> Schematization<G> {
    /// Engine reporting to `diagnostics`.
    ///
    /// # Errors
    ///
    /// Returns [`SchematizationError::Config`] if the configuration is
    /// invalid.
    pub fn with_diagnostics(
        config: SchematizationConfig,
        diagnostics: G,
    ) -> Result<Self, SchematizationError> {
        config.validate()?;
        let frechet = FrechetDistance::from_kind(&config.distance)?;
        let angles = config.sweep_angles();
        Ok(Self {
            config,
            frechet,
            angles,
            network: StrokeNetwork::new(),
            operations: BTreeMap::new(),
            complexity: 0,
            max_cross_distance: 0.0,
            state: RunState::Uninitialized,
            abort_reason: None,
            history: None,
            steps: 0,
            diagnostics,
        })
    }

    /// Load `network` and generate operations for every bend.
    ///
    /// Returns whether at least one admissible operation exists.
    pub fn init(&mut self, network: StrokeNetwork) -> bool {
        self.network = network;
        self.operations.clear();
        self.complexity = self.network.arc_count();
        self.max_cross_distance =
            self.network.diagonal() * self.config.max_cross_distance_fraction;
        self.state = RunState::Initialized;
        self.abort_reason = None;
        self.steps = 0;
        self.history = self
            .config
            .record_history
            .then(|| SchematizationHistory::new(&self.network));

        for vertex in self.network.vertex_ids() {
            self.make_operations(vertex);
        }

        let admissible = self
            .operations
            .values()
            .flatten()
            .any(|op| !op.is_blocked());
        info!(
            arcs = self.complexity,
            vertices = self.network.vertex_ids().len(),
            crosses = self.network.cross_ids().len(),
            max_cross_distance = self.max_cross_distance,
            admissible,
            "schematization initialized"
        );
        admissible
    }

    /// Commit the cheapest admissible operation.
    ///
    /// Returns `false`, leaving the network untouched, when the arc
    /// count is at or below `max_complexity`, when no operation is
    /// admissible, or when the cheapest one costs more than `max_cost`.
    /// Also `false` when the commit fails, which aborts the run.
    pub fn step(&mut self, max_complexity: usize, max_cost: f64) -> bool {
        if self.state.is_latched() {
            return false;
        }
        if self.complexity <= max_complexity {
            self.state = RunState::ComplexityReached;
            return false;
        }
        let Some(op) = self.best_operation().cloned() else {
            self.state = RunState::Stuck;
            return false;
        };
        if op.cost() > max_cost {
            self.state = RunState::ThresholdExceeded;
            return false;
        }

        match self.perform(&op) {
            Ok(()) => {
                self.state = RunState::StepApplied;
                true
            }
            Err(e) => {
                error!(vertex = %op.vertex(), error = %e, "schematization aborted");
                self.abort_reason = Some(e);
                self.state = RunState::Aborted;
                false
            }
        }
    }

    /// Step until the run ends.
    pub fn run(&mut self, limits: RunLimits) -> RunState {
        while self.step(limits.max_complexity, limits.max_cost) {}
        info!(
            state = ?self.state,
            complexity = self.complexity,
            steps = self.steps,
            "schematization finished"
        );
        self.state
    }

    /// Current arc count.
    #[must_use]
    pub const fn complexity(&self) -> usize {
        self.complexity
    }

    /// Current state.
    #[must_use]
    pub const fn state(&self) -> RunState {
        self.state
    }

    /// Committed steps since `init`.
    #[must_use]
    pub const fn steps(&self) -> usize {
        self.steps
    }

    /// The network being simplified.
    #[must_use]
    pub const fn network(&self) -> &StrokeNetwork {
        &self.network
    }

    /// Configuration in use.
    #[must_use]
    pub const fn config(&self) -> &SchematizationConfig {
        &self.config
    }

    /// The error that aborted the run, if any.
    #[must_use]
    pub const fn abort_reason(&self) -> Option<&SchematizationError> {
        self.abort_reason.as_ref()
    }

    /// Recorded history.
    ///
    /// # Errors
    ///
    /// Returns [`HistoryError::NotRecorded`] unless the configuration
    /// enables `record_history`.
    pub fn history(&self) -> Result<&SchematizationHistory, HistoryError> {
        self.history.as_ref().ok_or(HistoryError::NotRecorded)
    }

    /// Diagnostics sink.
    #[must_use]
    pub const fn diagnostics(&self) -> &G {
        &self.diagnostics
    }

    /// Pending operations of `vertex`, cheapest first.
    #[must_use]
    pub fn operations(&self, vertex: VertexId) -> &[Operation] {
        self.operations.get(&vertex).map_or(&[], Vec::as_slice)
    }

    /// Give up the engine, keeping the network and the history.
    #[must_use]
    pub fn into_outcome(self) -> SchematizeOutcome {
        SchematizeOutcome {
            network: self.network,
            state: self.state,
            steps: self.steps,
            complexity: self.complexity,
            history: self.history,
        }
    }

    // -----------------------------------------------------------------------
    // Operation bookkeeping
    // -----------------------------------------------------------------------

    /// Cheapest unblocked operation; ties go to the lowest vertex handle
    /// and the earlier candidate.
    fn best_operation(&self) -> Option<&Operation> {
        let mut best: Option<&Operation> = None;
        for op in self.operations.values().flatten() {
            if op.is_blocked() {
                continue;
            }
            if best.is_none_or(|b| op.cost() < b.cost()) {
                best = Some(op);
            }
        }
        best
    }

    /// Regenerate and check the operations of `vertex`.
    fn make_operations(&mut self, vertex: VertexId) {
        self.operations.remove(&vertex);
        let v = self.network.vertex(vertex);
        if !v.is_alive() || v.incoming().is_none() || v.outgoing().is_none() {
            return;
        }
        if v.cross().is_some() && !self.config.allow_high_degree {
            return;
        }

        let generator = CandidateGenerator {
            network: &self.network,
            frechet: &self.frechet,
            angles: &self.angles,
            max_cross_distance: self.max_cross_distance,
            straight_reduction: self.config.straight_reduction,
            capacity: self.config.candidates,
        };
        let candidates = generator.generate(vertex);
        trace!(
            %vertex,
            candidates = candidates.len(),
            best = candidates.first().map(|c| c.cost),
            "generated candidates"
        );

        let checker = TopologyChecker::new(&self.network, self.max_cross_distance);
        let mut ops = Vec::with_capacity(candidates.len());
        for Candidate { curve, cost } in candidates {
            self.diagnostics.candidate_generated(vertex, &curve, cost);
            let mut op = Operation::new(vertex, curve, cost);
            checker.recheck(&mut op);
            if op.is_blocked() {
                self.diagnostics.operation_blocked(vertex, op.blocks());
            }
            ops.push(op);
        }
        if !ops.is_empty() {
            self.operations.insert(vertex, ops);
        }
    }

    /// Crossings whose state an operation on `vertex` depends on.
    fn touched_crosses(&self, vertex: VertexId) -> BTreeSet<CrossId> {
        let net = &self.network;
        let v = net.vertex(vertex);
        let mut crosses: BTreeSet<CrossId> = v.cross().into_iter().collect();
        if let Some(inc) = v.incoming() {
            crosses.extend(net.vertex(net.arc(inc).start()).cross());
            crosses.extend(net.arc(inc).virtuals().iter().copied());
        }
        if let Some(out) = v.outgoing() {
            crosses.extend(net.vertex(net.arc(out).end()).cross());
            crosses.extend(net.arc(out).virtuals().iter().copied());
        }
        crosses
    }

    /// New endpoint positions of every arc extended by `op`.
    fn extension_moves(
        &self,
        op: &Operation,
    ) -> Result<Vec<(VertexId, Point)>, SchematizationError> {
        let net = &self.network;
        let vertex = op.vertex();
        let replacement = op.replacement();
        let mut moves = Vec::new();
        for arc in op.extended_arcs() {
            let record = net.arc(arc);
            let missing = SchematizationError::MissingExtension { vertex, arc };
            let starts = op.start_extension.contains(&arc);
            let ends = op.end_extension.contains(&arc);
            if starts && ends {
                let [start, end] =
                    find_double_extension(net, arc, replacement, vertex).ok_or(missing)?;
                moves.push((record.start(), start));
                moves.push((record.end(), end));
            } else if starts {
                let start = find_start_extension(net, arc, replacement, vertex).ok_or(missing)?;
                moves.push((record.start(), start));
            } else {
                let end = find_end_extension(net, arc, replacement, vertex).ok_or(missing)?;
                moves.push((record.end(), end));
            }
        }
        Ok(moves)
    }

    /// Commit `op`.
    fn perform(&mut self, op: &Operation) -> Result<(), SchematizationError> {
        let started = web_time::Instant::now();
        let vertex = op.vertex();
        let v = self.network.vertex(vertex);
        let (Some(inc), Some(out)) = (v.incoming(), v.outgoing()) else {
            return Err(NetworkError::Inconsistent("operated vertex lost an arc").into());
        };
        let extended: Vec<ArcId> = op.extended_arcs().collect();

        // Vertices whose operations are rebuilt from scratch.
        let mut regenerate: BTreeSet<VertexId> = BTreeSet::from([vertex]);
        if let Some(cross) = v.cross() {
            regenerate.extend(self.network.cross(cross).concrete().values().copied());
        }
        regenerate.extend(self.network.previous(vertex));
        regenerate.extend(self.network.next(vertex));
        for &arc in &extended {
            let record = self.network.arc(arc);
            for end in [record.start(), record.end()] {
                if !self.network.vertex(end).is_stroke_endpoint() {
                    regenerate.insert(end);
                }
            }
        }

        let moves = self.extension_moves(op)?;

        for stale in &regenerate {
            self.operations.remove(stale);
        }
        let mut recheck: BTreeSet<VertexId> = BTreeSet::new();
        for (&owner, ops) in &mut self.operations {
            for other in ops.iter_mut() {
                for arc in [inc, out].into_iter().chain(extended.iter().copied()) {
                    if other.uncheck(arc) {
                        recheck.insert(owner);
                    }
                }
            }
        }

        // Crossing disks are refreshed by `replace_vertex`, so the moved
        // endpoints must already be in place.
        let previous: Vec<(VertexId, Point)> = moves
            .iter()
            .map(|&(endpoint, _)| (endpoint, self.network.vertex(endpoint).position()))
            .collect();
        for &(endpoint, position) in &moves {
            self.network.set_vertex_position(endpoint, position);
        }
        let arc = match self.network.replace_vertex(vertex, op.replacement()) {
            Ok(arc) => arc,
            Err(e) => {
                for &(endpoint, position) in previous.iter().rev() {
                    self.network.set_vertex_position(endpoint, position);
                }
                return Err(e.into());
            }
        };
        self.complexity -= 1;
        self.steps += 1;

        let mut changed: BTreeSet<CrossId> =
            self.network.arc(arc).virtuals().iter().copied().collect();
        changed.extend(
            moves
                .iter()
                .filter_map(|&(endpoint, _)| self.network.vertex(endpoint).cross()),
        );
        let touched: Vec<ArcId> = std::iter::once(arc).chain(extended.iter().copied()).collect();

        if let Some(history) = &mut self.history {
            history.record(HistoryEntry {
                cost: op.cost(),
                complexity_after: self.complexity,
                removed_arcs: vec![inc, out],
                arcs: touched
                    .iter()
                    .map(|&a| ArcSnapshot::of(&self.network, a))
                    .collect(),
                crosses: changed
                    .iter()
                    .map(|&c| CrossSnapshot::of(&self.network, c))
                    .collect(),
            });
        }

        for (&owner, ops) in &self.operations {
            if !recheck.contains(&owner)
                && !self.touched_crosses(owner).is_disjoint(&changed)
                && !ops.is_empty()
            {
                recheck.insert(owner);
            }
        }

        let checker = TopologyChecker::new(&self.network, self.max_cross_distance);
        for (&owner, ops) in &mut self.operations {
            for other in ops.iter_mut() {
                if recheck.contains(&owner) {
                    checker.recheck(other);
                } else {
                    for &a in &touched {
                        checker.check_arc(a, other);
                    }
                }
                if other.is_blocked() {
                    self.diagnostics.operation_blocked(owner, other.blocks());
                }
            }
        }

        for &stale in &regenerate {
            self.make_operations(stale);
        }

        let record = StepRecord {
            step: self.steps,
            vertex,
            cost: op.cost(),
            complexity_after: self.complexity,
            extensions: extended.len(),
            duration: started.elapsed(),
        };
        debug!(
            step = record.step,
            %vertex,
            cost = record.cost,
            complexity = record.complexity_after,
            replaced = ?[inc, out],
            extensions = record.extensions,
            "committed step"
        );
        self.diagnostics.step_committed(&record);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::StepRecorder;
    use crate::network::StationId;

    fn zigzag() -> StrokeNetwork {
        let mut net = StrokeNetwork::new();
        let ids: Vec<StationId> = [(0.0, 0.0), (1.0, 0.4), (2.0, 0.0), (3.0, 0.4), (4.0, 0.0)]
            .iter()
            .map(|&(x, y)| net.add_station("", Point::new(x, y), false))
            .collect();
        net.add_stroke("zigzag", &ids, false).unwrap();
        net
    }

    fn two_segments() -> StrokeNetwork {
        let mut net = StrokeNetwork::new();
        let a = net.add_station("a", Point::new(0.0, 0.0), false);
        let b = net.add_station("b", Point::new(1.0, 0.0), false);
        let c = net.add_station("c", Point::new(0.0, 1.0), false);
        let d = net.add_station("d", Point::new(1.0, 1.0), false);
        net.add_stroke("low", &[a, b], false).unwrap();
        net.add_stroke("high", &[c, d], false).unwrap();
        net
    }

    #[test]
    fn invalid_config_is_rejected() {
        let config = SchematizationConfig {
            candidates: 0,
            ..SchematizationConfig::default()
        };
        assert_eq!(
            Schematization::new(config).unwrap_err(),
            SchematizationError::Config(ConfigError::InvalidCandidateCount)
        );
    }

    #[test]
    fn step_before_init_does_nothing() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        assert!(!engine.step(0, f64::INFINITY));
        assert_eq!(engine.state(), RunState::Uninitialized);
    }

    #[test]
    fn init_generates_operations_for_bends() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        assert!(engine.init(zigzag()));
        assert_eq!(engine.complexity(), 4);
        assert_eq!(engine.state(), RunState::Initialized);
        let bends: Vec<VertexId> = engine.network().vertex_ids()[1..4].to_vec();
        for bend in bends {
            let ops = engine.operations(bend);
            assert!(!ops.is_empty());
            assert!(ops.len() <= SchematizationConfig::DEFAULT_CANDIDATES);
            assert!(ops.windows(2).all(|w| w[0].cost() <= w[1].cost()));
        }
    }

    #[test]
    fn step_drops_complexity_by_one() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        assert!(engine.step(0, f64::INFINITY));
        assert_eq!(engine.complexity(), 3);
        assert_eq!(engine.network().arc_count(), 3);
        assert_eq!(engine.state(), RunState::StepApplied);
        assert_eq!(engine.steps(), 1);
    }

    #[test]
    fn complexity_floor_stops_run() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        assert!(!engine.step(4, f64::INFINITY));
        assert_eq!(engine.state(), RunState::ComplexityReached);
        assert_eq!(engine.complexity(), 4);
    }

    #[test]
    fn threshold_does_not_latch() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        assert!(!engine.step(0, 0.0));
        assert_eq!(engine.state(), RunState::ThresholdExceeded);
        assert_eq!(engine.complexity(), 4);
        assert!(engine.step(0, f64::INFINITY));
    }

    #[test]
    fn no_bends_means_stuck() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        assert!(!engine.init(two_segments()));
        assert!(!engine.step(0, f64::INFINITY));
        assert_eq!(engine.state(), RunState::Stuck);
        // Latched until the next init.
        assert!(!engine.step(0, f64::INFINITY));
        assert_eq!(engine.state(), RunState::Stuck);
        assert!(engine.init(zigzag()));
        assert_eq!(engine.state(), RunState::Initialized);
    }

    #[test]
    fn run_records_every_step() {
        let config = SchematizationConfig {
            record_history: true,
            ..SchematizationConfig::default()
        };
        let mut engine = Schematization::with_diagnostics(config, StepRecorder::new()).unwrap();
        engine.init(zigzag());
        let state = engine.run(RunLimits {
            max_complexity: 3,
            max_cost: f64::INFINITY,
        });
        assert_eq!(state, RunState::ComplexityReached);

        let steps = engine.diagnostics().steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].complexity_after, 3);

        let history = engine.history().unwrap();
        assert_eq!(history.maximum_complexity(), 4);
        assert_eq!(history.minimum_complexity(), 3);
        assert_eq!(history.at_complexity(4).arcs.len(), 4);
        assert_eq!(history.at_complexity(3).arcs.len(), 3);
    }

    #[test]
    fn history_requires_recording() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        assert_eq!(engine.history().unwrap_err(), HistoryError::NotRecorded);
    }

    #[test]
    fn failed_commit_leaves_network_untouched() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        let stale = engine.best_operation().cloned().unwrap();
        assert!(engine.step(0, f64::INFINITY));

        let curves = |e: &Schematization| {
            e.network()
                .arc_ids()
                .into_iter()
                .map(|a| e.network().curve(a))
                .collect::<Vec<_>>()
        };
        let before = curves(&engine);
        let positions: Vec<Point> = engine
            .network()
            .vertex_ids()
            .into_iter()
            .map(|v| engine.network().vertex(v).position())
            .collect();

        assert!(engine.perform(&stale).is_err());
        assert_eq!(engine.complexity(), 3);
        assert_eq!(engine.steps(), 1);
        assert_eq!(engine.network().arc_count(), 3);
        assert_eq!(curves(&engine), before);
        let after: Vec<Point> = engine
            .network()
            .vertex_ids()
            .into_iter()
            .map(|v| engine.network().vertex(v).position())
            .collect();
        assert_eq!(after, positions);
    }

    #[test]
    fn committed_curve_matches_operation() {
        let mut engine = Schematization::new(SchematizationConfig::default()).unwrap();
        engine.init(zigzag());
        let best = engine.best_operation().cloned().unwrap();
        assert!(engine.step(0, f64::INFINITY));
        let matching = engine
            .network()
            .arc_ids()
            .into_iter()
            .map(|a| engine.network().curve(a))
            .any(|c| {
                c.start().approx_eq(best.replacement().start())
                    && c.end().approx_eq(best.replacement().end())
            });
        assert!(matching);
    }
}
