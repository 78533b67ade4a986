//! Edit classification.
//!
//! Each edit is applied to the graph and immediately classified against the
//! shortest-path tree, so that later edits of a batch observe the state the
//! earlier ones left behind. Classification only does local, constant-size
//! work per edit (plus unlinking of orphaned subtrees); the expensive part is
//! deferred to the repair and propagation queues.

use cascade_core::{CycleStats, Edit, GraphStore, Vertex};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::trace;

use crate::{Graph, MinQueue, SsspState};

/// What classifying one applied edit did to the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EditEffect {
    /// No tree effect.
    Unchanged,
    /// The far endpoint improved and was queued for propagation.
    Relaxed,
    /// A tree edge disappeared; this many vertices were unlinked.
    Orphaned(usize),
    /// A tree edge got heavier; the child was queued for repair.
    Deferred,
    /// A new vertex was seeded as unreachable.
    Seeded,
    /// A vertex and its state entries were dropped.
    Dropped,
}

impl fmt::Display for EditEffect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EditEffect::Unchanged => write!(f, "unchanged"),
            EditEffect::Relaxed => write!(f, "relaxed"),
            EditEffect::Orphaned(n) => write!(f, "orphaned({})", n),
            EditEffect::Deferred => write!(f, "deferred"),
            EditEffect::Seeded => write!(f, "seeded"),
            EditEffect::Dropped => write!(f, "dropped"),
        }
    }
}

/// Detaches `root` and every vertex below it in the tree.
///
/// Children are found through graph neighbours whose parent is the vertex
/// being detached; tree edges always exist in the graph, so this visits the
/// whole subtree. Returns the detached vertices, `root` first.
pub fn unlink<V: Vertex>(graph: &Graph<V>, state: &mut SsspState<V>, root: &V) -> Vec<V> {
    let mut detached = Vec::new();
    let mut worklist = vec![root.clone()];

    while let Some(x) = worklist.pop() {
        let children: Vec<V> = graph
            .neighbors(&x)
            .filter(|(k, _)| state.is_tree_edge(&x, k))
            .map(|(k, _)| k.clone())
            .collect();
        state.detach(&x);
        trace!(vertex = ?x, "Unlinked vertex");
        worklist.extend(children);
        detached.push(x);
    }

    detached
}

/// Applies edits to the graph and classifies each one against the tree.
pub struct Classifier<'a, V: Vertex> {
    graph: &'a mut Graph<V>,
    state: &'a mut SsspState<V>,
    repair_queue: &'a mut MinQueue<V>,
    propagation_queue: &'a mut MinQueue<V>,
}

impl<'a, V: Vertex> Classifier<'a, V> {
    pub fn new(
        graph: &'a mut Graph<V>,
        state: &'a mut SsspState<V>,
        repair_queue: &'a mut MinQueue<V>,
        propagation_queue: &'a mut MinQueue<V>,
    ) -> Self {
        Self {
            graph,
            state,
            repair_queue,
            propagation_queue,
        }
    }

    /// Applies `edit` and classifies it. `None` means the edit was rejected
    /// and neither the graph nor the tree changed.
    pub fn apply(&mut self, edit: &Edit<V>, stats: &mut CycleStats) -> Option<EditEffect> {
        let effect = match edit {
            Edit::AddVertex(v) => {
                if !self.graph.add_vertex(v.clone()) {
                    return None;
                }
                self.state.insert_vertex(v.clone());
                EditEffect::Seeded
            }
            Edit::RemoveVertex(v) => {
                if self.state.is_source(v) {
                    return None;
                }
                // Children must be collected while their tree edges still exist
                let children: Vec<V> = self
                    .graph
                    .neighbors(v)
                    .filter(|(k, _)| self.state.is_tree_edge(v, k))
                    .map(|(k, _)| k.clone())
                    .collect();
                if !self.graph.remove_vertex(v) {
                    return None;
                }
                let mut orphaned = 0;
                for child in &children {
                    orphaned += self.orphan(child);
                }
                self.state.remove_vertex(v);
                stats.change();
                if orphaned > 0 {
                    EditEffect::Orphaned(orphaned)
                } else {
                    EditEffect::Dropped
                }
            }
            Edit::AddEdge(a, b, w) => {
                if !self.graph.add_edge(a.clone(), b.clone(), *w) {
                    return None;
                }
                let (u, v) = self.anchor(a, b);
                self.relax(&u, &v, *w, stats)
            }
            Edit::RemoveEdge(a, b) => {
                if !self.graph.remove_edge(a, b) {
                    return None;
                }
                let (u, v) = self.anchor(a, b);
                if self.state.is_tree_edge(&u, &v) {
                    self.propagation_queue.push(self.state.distance(&u), u);
                    EditEffect::Orphaned(self.orphan(&v))
                } else {
                    EditEffect::Unchanged
                }
            }
            Edit::ModifyEdge(a, b, w) => {
                if !self.graph.modify_edge_weight(a, b, *w) {
                    return None;
                }
                let (u, v) = self.anchor(a, b);
                if !self.state.is_tree_edge(&u, &v) {
                    self.relax(&u, &v, *w, stats)
                } else {
                    stats.compare();
                    if self.state.distance(&u) + *w <= self.state.distance(&v) {
                        self.state.reweigh(&v, *w);
                        stats.change();
                        self.propagation_queue.push(self.state.distance(&v), v);
                        EditEffect::Relaxed
                    } else {
                        self.repair_queue.push(self.state.distance(&v), v);
                        EditEffect::Deferred
                    }
                }
            }
        };

        trace!(kind = %edit.kind(), effect = %effect, "Classified edit");
        Some(effect)
    }

    /// Orders the endpoints of an edge as `(anchor, other)`.
    ///
    /// On a tree edge the parent is the anchor. Otherwise the endpoint with
    /// the smaller cached distance is, with the lower id winning ties.
    fn anchor(&self, a: &V, b: &V) -> (V, V) {
        if self.state.is_tree_edge(a, b) {
            return (a.clone(), b.clone());
        }
        if self.state.is_tree_edge(b, a) {
            return (b.clone(), a.clone());
        }
        let (da, db) = (self.state.distance(a), self.state.distance(b));
        match da.total_cmp(&db).then_with(|| a.cmp(b)) {
            std::cmp::Ordering::Greater => (b.clone(), a.clone()),
            _ => (a.clone(), b.clone()),
        }
    }

    fn relax(&mut self, u: &V, v: &V, weight: f64, stats: &mut CycleStats) -> EditEffect {
        stats.compare();
        let candidate = self.state.distance(u) + weight;
        if candidate < self.state.distance(v) {
            self.state.attach(v, u, weight);
            stats.change();
            self.propagation_queue.push(candidate, v.clone());
            EditEffect::Relaxed
        } else {
            EditEffect::Unchanged
        }
    }

    fn orphan(&mut self, root: &V) -> usize {
        let detached = unlink(self.graph, self.state, root);
        for x in &detached {
            self.repair_queue.push(f64::INFINITY, x.clone());
        }
        detached.len()
    }
}
