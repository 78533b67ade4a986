use cascade_core::{CycleStats, GraphStore, Vertex};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::budget::BudgetMeter;
use crate::{Graph, MinQueue, SsspState};

/// Spreads distance improvements outward from the propagation queue.
///
/// This is the full-solve relaxation loop run on the existing state, seeded
/// only with the vertices that changed.
#[derive(Debug, Clone)]
pub struct PropagationEngine<V: Vertex> {
    visited: FxHashSet<V>,
}

impl<V: Vertex> Default for PropagationEngine<V> {
    fn default() -> Self {
        Self {
            visited: FxHashSet::default(),
        }
    }
}

impl<V: Vertex> PropagationEngine<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_idle(&self) -> bool {
        self.visited.is_empty()
    }

    pub fn reset(&mut self) {
        self.visited.clear();
    }

    /// Drains `queue`. Returns `false` if the budget ran out first.
    pub(crate) fn run(
        &mut self,
        graph: &Graph<V>,
        state: &mut SsspState<V>,
        queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        meter: &mut BudgetMeter,
    ) -> bool {
        while !queue.is_empty() {
            if !meter.try_step() {
                return false;
            }
            let Some((distance, v)) = queue.pop() else {
                break;
            };
            if !graph.contains_vertex(&v) || self.visited.contains(&v) {
                continue;
            }
            let current = state.distance(&v);
            if distance != current {
                // No decrease-key; requeue under the live distance
                queue.push(current, v);
                continue;
            }
            stats.access();
            self.visited.insert(v.clone());

            let visited = &self.visited;
            state.relax_neighbors(graph, &v, queue, stats, |k| !visited.contains(k));
        }

        if !self.visited.is_empty() {
            debug!(settled = self.visited.len(), "Propagated distance changes");
        }
        self.reset();
        true
    }
}
