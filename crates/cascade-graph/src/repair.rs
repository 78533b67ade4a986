//! Repair of orphaned subtrees.
//!
//! A repair cycle runs three stages over the repair queue:
//!
//! 1. **Detach**: every queued vertex joins the orphan set. One that still
//!    has a parent (a deferred weight increase, or an orphan re-attached by a
//!    later edit of the batch) is unlinked with its current subtree first,
//!    since distances below it may now be too small.
//! 2. **Reattach**: each orphan takes its best neighbour outside the orphan
//!    set as provisional parent.
//! 3. **Settle**: a Dijkstra pass restricted to the orphan set spreads the
//!    provisional distances across orphan-orphan edges. Settled vertices are
//!    handed to the propagation queue so the rest of the tree can profit.
//!
//! Stage progress survives a budget yield, so a suspended cycle resumes
//! exactly where it stopped.

use cascade_core::{CycleStats, GraphStore, Vertex};
use rustc_hash::FxHashSet;
use std::collections::{BTreeSet, VecDeque};
use tracing::{debug, trace};

use crate::budget::BudgetMeter;
use crate::classify::unlink;
use crate::{Graph, MinQueue, SsspState};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum Stage {
    #[default]
    Detach,
    Reattach,
    Settle,
}

#[derive(Debug, Clone)]
pub struct RepairEngine<V: Vertex> {
    stage: Stage,
    orphans: BTreeSet<V>,
    reattach: VecDeque<V>,
    visited: FxHashSet<V>,
}

impl<V: Vertex> Default for RepairEngine<V> {
    fn default() -> Self {
        Self {
            stage: Stage::default(),
            orphans: BTreeSet::new(),
            reattach: VecDeque::new(),
            visited: FxHashSet::default(),
        }
    }
}

impl<V: Vertex> RepairEngine<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// True when no repair cycle is half-way through.
    pub fn is_idle(&self) -> bool {
        self.stage == Stage::Detach && self.orphans.is_empty()
    }

    /// Orphans of the cycle in progress.
    pub fn orphans(&self) -> &BTreeSet<V> {
        &self.orphans
    }

    pub fn reset(&mut self) {
        self.stage = Stage::Detach;
        self.orphans.clear();
        self.reattach.clear();
        self.visited.clear();
    }

    /// Drains `repair_queue`. Returns `false` if the budget ran out first.
    pub(crate) fn run(
        &mut self,
        graph: &Graph<V>,
        state: &mut SsspState<V>,
        repair_queue: &mut MinQueue<V>,
        propagation_queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        meter: &mut BudgetMeter,
    ) -> bool {
        if self.stage == Stage::Detach {
            if !self.detach(graph, state, repair_queue, stats, meter) {
                return false;
            }
            self.reattach = self.orphans.iter().cloned().collect();
            self.stage = Stage::Reattach;
        }

        if self.stage == Stage::Reattach {
            if !self.reattach(graph, state, repair_queue, stats, meter) {
                return false;
            }
            self.stage = Stage::Settle;
        }

        if !self.settle(graph, state, repair_queue, propagation_queue, stats, meter) {
            return false;
        }

        let reconnected = self
            .orphans
            .iter()
            .filter(|v| state.distance(v).is_finite())
            .count();
        if !self.orphans.is_empty() {
            debug!(
                orphans = self.orphans.len(),
                reconnected,
                "Repaired orphaned subtrees"
            );
        }
        self.reset();
        true
    }

    fn detach(
        &mut self,
        graph: &Graph<V>,
        state: &mut SsspState<V>,
        repair_queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        meter: &mut BudgetMeter,
    ) -> bool {
        while !repair_queue.is_empty() {
            if !meter.try_step() {
                return false;
            }
            let Some((_, x)) = repair_queue.pop() else {
                break;
            };
            if !graph.contains_vertex(&x) || state.is_source(&x) || self.orphans.contains(&x) {
                continue;
            }
            stats.access();
            if state.parent(&x).is_some() {
                for detached in unlink(graph, state, &x) {
                    stats.change();
                    self.orphans.insert(detached);
                }
            } else {
                state.detach(&x);
                self.orphans.insert(x);
            }
        }
        true
    }

    fn reattach(
        &mut self,
        graph: &Graph<V>,
        state: &mut SsspState<V>,
        repair_queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        meter: &mut BudgetMeter,
    ) -> bool {
        while !self.reattach.is_empty() {
            if !meter.try_step() {
                return false;
            }
            let Some(v) = self.reattach.pop_front() else {
                break;
            };
            state.detach(&v);

            let mut best: Option<(f64, &V, f64)> = None;
            for (k, weight) in graph.neighbors(&v) {
                if self.orphans.contains(k) || state.is_tree_edge(&v, k) {
                    continue;
                }
                stats.compare();
                let candidate = state.distance(k) + weight;
                if candidate < best.map_or(f64::INFINITY, |(d, _, _)| d) {
                    best = Some((candidate, k, weight));
                }
            }

            if let Some((distance, parent, weight)) = best {
                state.attach(&v, parent, weight);
                stats.change();
                trace!(vertex = ?v, parent = ?parent, distance, "Reattached orphan");
                repair_queue.push(distance, v);
            }
        }
        true
    }

    fn settle(
        &mut self,
        graph: &Graph<V>,
        state: &mut SsspState<V>,
        repair_queue: &mut MinQueue<V>,
        propagation_queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        meter: &mut BudgetMeter,
    ) -> bool {
        while !repair_queue.is_empty() {
            if !meter.try_step() {
                return false;
            }
            let Some((distance, v)) = repair_queue.pop() else {
                break;
            };
            if self.visited.contains(&v) || distance != state.distance(&v) {
                continue;
            }
            stats.access();
            self.visited.insert(v.clone());

            let orphans = &self.orphans;
            let visited = &self.visited;
            state.relax_neighbors(graph, &v, repair_queue, stats, |k| {
                orphans.contains(k) && !visited.contains(k)
            });
            propagation_queue.push(distance, v);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::budget::StepBudget;

    /// s -1- a -1- b -1- c with a detour s -4- c
    fn detour() -> (Graph<&'static str>, SsspState<&'static str>) {
        let graph = Graph::from_edges([
            ("s", "a", 1.0),
            ("a", "b", 1.0),
            ("b", "c", 1.0),
            ("s", "c", 4.0),
        ]);
        let mut state = SsspState::new();
        state.solve(&graph, "s", &mut CycleStats::new()).unwrap();
        (graph, state)
    }

    fn run_to_end(
        repair: &mut RepairEngine<&'static str>,
        graph: &Graph<&'static str>,
        state: &mut SsspState<&'static str>,
        queue: &mut MinQueue<&'static str>,
    ) -> MinQueue<&'static str> {
        let mut propagation = MinQueue::new();
        let mut meter = BudgetMeter::new(StepBudget::unlimited());
        assert!(repair.run(graph, state, queue, &mut propagation, &mut CycleStats::new(), &mut meter));
        propagation
    }

    #[test]
    fn test_orphans_find_way_back() {
        let (mut graph, mut state) = detour();
        graph.remove_edge(&"s", &"a");
        let mut queue = MinQueue::new();
        for v in unlink(&graph, &mut state, &"a") {
            queue.push(f64::INFINITY, v);
        }

        let mut repair = RepairEngine::new();
        let propagation = run_to_end(&mut repair, &graph, &mut state, &mut queue);

        assert_eq!(state.distance(&"c"), 4.0);
        assert_eq!(state.distance(&"b"), 5.0);
        assert_eq!(state.distance(&"a"), 6.0);
        assert_eq!(state.parent(&"a"), Some(&"b"));
        assert_eq!(state.height(&"a"), 3);
        assert_eq!(propagation.len(), 3);
        assert!(repair.is_idle());
    }

    #[test]
    fn test_disconnected_orphans_stay_unreachable() {
        let (mut graph, mut state) = detour();
        graph.remove_edge(&"s", &"a");
        graph.remove_edge(&"s", &"c");
        let mut queue = MinQueue::new();
        for v in unlink(&graph, &mut state, &"a") {
            queue.push(f64::INFINITY, v);
        }

        let mut repair = RepairEngine::new();
        let propagation = run_to_end(&mut repair, &graph, &mut state, &mut queue);
        for v in ["a", "b", "c"] {
            assert_eq!(state.distance(&v), f64::INFINITY);
            assert_eq!(state.parent(&v), None);
        }
        assert!(propagation.is_empty());
    }

    #[test]
    fn test_deferred_increase_detaches_subtree() {
        let (mut graph, mut state) = detour();
        graph.modify_edge_weight(&"s", &"a", 10.0);
        let mut queue = MinQueue::new();
        queue.push(state.distance(&"a"), "a");

        let mut repair = RepairEngine::new();
        run_to_end(&mut repair, &graph, &mut state, &mut queue);
        assert_eq!(state.distance(&"c"), 4.0);
        assert_eq!(state.distance(&"b"), 5.0);
        assert_eq!(state.distance(&"a"), 6.0);
    }

    #[test]
    fn test_resumes_after_yield() {
        let (mut graph, mut state) = detour();
        graph.remove_edge(&"s", &"a");
        let mut queue = MinQueue::new();
        for v in unlink(&graph, &mut state, &"a") {
            queue.push(f64::INFINITY, v);
        }

        let mut repair = RepairEngine::new();
        let mut propagation = MinQueue::new();
        let mut rounds = 0;
        loop {
            rounds += 1;
            let mut meter = BudgetMeter::new(StepBudget::steps(1));
            if repair.run(&graph, &mut state, &mut queue, &mut propagation, &mut CycleStats::new(), &mut meter) {
                break;
            }
        }
        assert!(rounds > 3);
        assert_eq!(state.distance(&"a"), 6.0);
        assert_eq!(state.distance(&"b"), 5.0);
    }
}
