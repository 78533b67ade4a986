use cascade_core::{
    CascadeError, CycleStats, Edit, EditRecord, EngineConfig, GraphStore, Result, Vertex,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use tracing::{debug, error, trace, warn};

use crate::budget::BudgetMeter;
use crate::{
    verify, CascadeProgress, Classifier, EditEffect, Graph, MinQueue, PropagationEngine,
    RepairEngine, SsspState, StepBudget,
};

/// Where the engine is in an edit/cascade cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Phase {
    /// Tree consistent with the graph, queues empty.
    #[default]
    Idle,
    /// Edits applied and classified; a cascade is due.
    Classified,
    /// A bounded cascade yielded inside the repair pass.
    Repairing,
    /// A bounded cascade yielded inside the propagation pass.
    Propagating,
}

impl Phase {
    pub fn accepts_edits(self) -> bool {
        matches!(self, Phase::Idle | Phase::Classified)
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Phase::Idle => "idle",
            Phase::Classified => "classified",
            Phase::Repairing => "repairing",
            Phase::Propagating => "propagating",
        };
        write!(f, "{}", s)
    }
}

/// Incremental shortest-path tree over a mutable graph.
///
/// Typical use:
///
/// ```
/// use cascade_core::Edit;
/// use cascade_graph::{CascadeEngine, Graph};
///
/// let graph = Graph::from_edges([("a", "b", 1.0), ("b", "c", 1.0)]);
/// let mut engine = CascadeEngine::new(graph);
/// engine.solve("a").unwrap();
/// engine.apply_batch(&[Edit::AddEdge("a", "c", 1.5)]).unwrap();
/// engine.cascade();
/// assert_eq!(engine.distance(&"c"), 1.5);
/// ```
#[derive(Debug, Clone)]
pub struct CascadeEngine<V: Vertex> {
    graph: Graph<V>,
    state: SsspState<V>,
    repair_queue: MinQueue<V>,
    propagation_queue: MinQueue<V>,
    repair: RepairEngine<V>,
    propagation: PropagationEngine<V>,
    phase: Phase,
    config: EngineConfig,
}

impl<V: Vertex> CascadeEngine<V> {
    pub fn new(graph: Graph<V>) -> Self {
        Self::with_config(graph, EngineConfig::default())
    }

    pub fn with_config(graph: Graph<V>, config: EngineConfig) -> Self {
        Self {
            graph,
            state: SsspState::new(),
            repair_queue: MinQueue::new(),
            propagation_queue: MinQueue::new(),
            repair: RepairEngine::new(),
            propagation: PropagationEngine::new(),
            phase: Phase::Idle,
            config,
        }
    }

    pub fn graph(&self) -> &Graph<V> {
        &self.graph
    }

    pub fn state(&self) -> &SsspState<V> {
        &self.state
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn into_graph(self) -> Graph<V> {
        self.graph
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn source(&self) -> Option<&V> {
        self.state.source()
    }

    /// Queued `(repair, propagation)` entries, stale ones included.
    pub fn pending(&self) -> (usize, usize) {
        (self.repair_queue.len(), self.propagation_queue.len())
    }

    pub fn distance(&self, v: &V) -> f64 {
        self.state.distance(v)
    }

    pub fn parent(&self, v: &V) -> Option<&V> {
        self.state.parent(v)
    }

    pub fn distances(&self) -> BTreeMap<V, f64> {
        self.state.distances()
    }

    pub fn path(&self, v: &V) -> Option<Vec<V>> {
        self.state.path_to(v)
    }

    pub fn solve(&mut self, source: V) -> Result<()> {
        self.solve_with(source, &mut CycleStats::new())
    }

    /// Recomputes the tree from scratch. Allowed in every phase; any pending
    /// or suspended work is discarded.
    pub fn solve_with(&mut self, source: V, stats: &mut CycleStats) -> Result<()> {
        stats.timed(|stats| {
            self.state.solve(&self.graph, source, stats)?;
            self.repair_queue.clear();
            self.propagation_queue.clear();
            self.repair.reset();
            self.propagation.reset();
            self.phase = Phase::Idle;
            Ok(())
        })
    }

    pub fn apply_batch(&mut self, edits: &[Edit<V>]) -> Result<Vec<bool>> {
        self.apply_batch_with(edits, &mut CycleStats::new())
    }

    /// Applies `edits` in order and classifies each successful one.
    ///
    /// Returns one flag per edit. A target already named earlier in the batch
    /// is rejected. Before the first `solve` the graph is mutated but nothing
    /// is classified.
    pub fn apply_batch_with(&mut self, edits: &[Edit<V>], stats: &mut CycleStats) -> Result<Vec<bool>> {
        if !self.phase.accepts_edits() {
            return Err(CascadeError::CycleInProgress(self.phase.to_string()));
        }

        if !self.state.is_solved() {
            return Ok(self.graph.apply_batch(edits));
        }

        stats.timed(|stats| {
            let mut classifier = Classifier::new(
                &mut self.graph,
                &mut self.state,
                &mut self.repair_queue,
                &mut self.propagation_queue,
            );
            let mut seen = BTreeSet::new();
            let mut applied = Vec::with_capacity(edits.len());
            let mut orphaned = 0;
            let mut deferred = 0;
            for edit in edits {
                let effect = if seen.insert(edit.target()) {
                    classifier.apply(edit, stats)
                } else {
                    trace!(edit = ?edit, "Rejected repeated batch target");
                    None
                };
                match effect {
                    Some(EditEffect::Orphaned(n)) => orphaned += n,
                    Some(EditEffect::Deferred) => deferred += 1,
                    _ => {}
                }
                applied.push(effect.is_some());
            }

            self.phase = Phase::Classified;
            debug!(
                edits = edits.len(),
                applied = applied.iter().filter(|ok| **ok).count(),
                orphaned,
                deferred,
                "Classified edit batch"
            );
            Ok(applied)
        })
    }

    /// Decodes wire records and applies them as one batch. A record that
    /// fails to decode is reported and counts as a rejected edit.
    pub fn apply_records(&mut self, records: Vec<EditRecord<V>>) -> Result<Vec<bool>> {
        self.apply_records_with(records, &mut CycleStats::new())
    }

    pub fn apply_records_with(
        &mut self,
        records: Vec<EditRecord<V>>,
        stats: &mut CycleStats,
    ) -> Result<Vec<bool>> {
        let mut slots = Vec::with_capacity(records.len());
        let mut edits = Vec::with_capacity(records.len());
        for (index, record) in records.into_iter().enumerate() {
            match Edit::try_from(record) {
                Ok(edit) => {
                    slots.push(Some(edits.len()));
                    edits.push(edit);
                }
                Err(e) => {
                    warn!(index, error = %e, "Skipping undecodable edit record");
                    slots.push(None);
                }
            }
        }

        let applied = self.apply_batch_with(&edits, stats)?;
        Ok(slots
            .into_iter()
            .map(|slot| slot.is_some_and(|i| applied[i]))
            .collect())
    }

    /// Runs repair and propagation to completion. Returns the work done.
    pub fn cascade(&mut self) -> u64 {
        self.cascade_with(&mut CycleStats::new())
    }

    pub fn cascade_with(&mut self, stats: &mut CycleStats) -> u64 {
        self.cascade_bounded(StepBudget::unlimited(), stats).steps()
    }

    /// Runs one slice of the cascade under the configured `step_budget`, or
    /// the whole cascade when none is set.
    pub fn cascade_step(&mut self, stats: &mut CycleStats) -> CascadeProgress {
        let budget = self
            .config
            .step_budget
            .map_or_else(StepBudget::unlimited, StepBudget::steps);
        self.cascade_bounded(budget, stats)
    }

    /// Runs repair then propagation until both queues are empty or `budget`
    /// is spent. A suspended cascade resumes on the next call.
    pub fn cascade_bounded(&mut self, budget: StepBudget, stats: &mut CycleStats) -> CascadeProgress {
        if self.phase == Phase::Idle {
            return CascadeProgress::Complete { steps: 0 };
        }

        let mut meter = BudgetMeter::new(budget);
        let complete = stats.timed(|stats| {
            if matches!(self.phase, Phase::Classified | Phase::Repairing) {
                self.phase = Phase::Repairing;
                if !self.repair.run(
                    &self.graph,
                    &mut self.state,
                    &mut self.repair_queue,
                    &mut self.propagation_queue,
                    stats,
                    &mut meter,
                ) {
                    return false;
                }
                self.phase = Phase::Propagating;
            }

            if !self.propagation.run(
                &self.graph,
                &mut self.state,
                &mut self.propagation_queue,
                stats,
                &mut meter,
            ) {
                return false;
            }
            self.phase = Phase::Idle;
            true
        });

        let steps = meter.steps();
        if !complete {
            debug!(steps, phase = %self.phase, "Cascade suspended");
            return CascadeProgress::Suspended { steps };
        }

        debug!(steps, "Cascade complete");
        if self.config.verify_after_cascade {
            for violation in verify::check_tree(self) {
                error!(%violation, "Shortest-path tree invariant violated");
            }
        }
        CascadeProgress::Complete { steps }
    }
}
