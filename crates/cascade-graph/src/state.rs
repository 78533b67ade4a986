use cascade_core::{CascadeError, CycleStats, GraphStore, Result, Vertex};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use crate::{Graph, MinQueue};

/// Tree link of a vertex in the shortest-path tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredRecord<V> {
    /// `None` for the source and for unreachable vertices.
    pub parent: Option<V>,
    /// Number of tree edges between the source and this vertex.
    pub height: u32,
    /// Weight of the tree edge `(parent, v)` as of the last update.
    pub edge_weight: f64,
}

impl<V> Default for PredRecord<V> {
    fn default() -> Self {
        Self {
            parent: None,
            height: 0,
            edge_weight: 0.0,
        }
    }
}

/// Distance cache plus predecessor records for one source.
#[derive(Debug, Clone)]
pub struct SsspState<V: Vertex> {
    source: Option<V>,
    cache: FxHashMap<V, f64>,
    pred: FxHashMap<V, PredRecord<V>>,
}

impl<V: Vertex> Default for SsspState<V> {
    fn default() -> Self {
        Self {
            source: None,
            cache: FxHashMap::default(),
            pred: FxHashMap::default(),
        }
    }
}

impl<V: Vertex> SsspState<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn source(&self) -> Option<&V> {
        self.source.as_ref()
    }

    pub fn is_solved(&self) -> bool {
        self.source.is_some()
    }

    pub fn is_source(&self, v: &V) -> bool {
        self.source.as_ref() == Some(v)
    }

    pub fn contains(&self, v: &V) -> bool {
        self.cache.contains_key(v)
    }

    /// Cached distance; unknown vertices read as unreachable.
    pub fn distance(&self, v: &V) -> f64 {
        self.cache.get(v).copied().unwrap_or(f64::INFINITY)
    }

    pub fn parent(&self, v: &V) -> Option<&V> {
        self.pred.get(v).and_then(|record| record.parent.as_ref())
    }

    pub fn height(&self, v: &V) -> u32 {
        self.pred.get(v).map_or(0, |record| record.height)
    }

    pub fn record(&self, v: &V) -> Option<&PredRecord<V>> {
        self.pred.get(v)
    }

    /// True when `(parent, child)` is the tree edge of `child`.
    pub fn is_tree_edge(&self, parent: &V, child: &V) -> bool {
        self.parent(child) == Some(parent)
    }

    /// Snapshot of every cached distance, ordered by vertex.
    pub fn distances(&self) -> BTreeMap<V, f64> {
        self.cache
            .iter()
            .map(|(v, d)| (v.clone(), *d))
            .collect()
    }

    /// Tree path from the source to `v`, or `None` if `v` is unreachable.
    pub fn path_to(&self, v: &V) -> Option<Vec<V>> {
        if !self.distance(v).is_finite() {
            return None;
        }
        let mut path = vec![v.clone()];
        let mut current = v;
        while let Some(parent) = self.parent(current) {
            if path.len() > self.pred.len() {
                // Broken parent chain; never follow a cycle.
                return None;
            }
            path.push(parent.clone());
            current = parent;
        }
        if !self.is_source(current) {
            return None;
        }
        path.reverse();
        Some(path)
    }

    /// Makes `parent` the tree parent of `child` over an edge of `weight`,
    /// deriving distance and height from the parent's current values.
    pub fn attach(&mut self, child: &V, parent: &V, weight: f64) {
        let distance = self.distance(parent) + weight;
        let height = self.height(parent) + 1;
        self.cache.insert(child.clone(), distance);
        self.pred.insert(
            child.clone(),
            PredRecord {
                parent: Some(parent.clone()),
                height,
                edge_weight: weight,
            },
        );
    }

    /// Re-weights the existing tree edge of `child` in place. Distance and
    /// height are re-derived from the parent, which may have moved since.
    pub fn reweigh(&mut self, child: &V, weight: f64) {
        let Some(parent) = self.parent(child).cloned() else {
            return;
        };
        let distance = self.distance(&parent) + weight;
        let height = self.height(&parent) + 1;
        self.cache.insert(child.clone(), distance);
        if let Some(record) = self.pred.get_mut(child) {
            record.edge_weight = weight;
            record.height = height;
        }
    }

    /// Cuts `v` off the tree: no parent, distance `∞`.
    pub fn detach(&mut self, v: &V) {
        self.cache.insert(v.clone(), f64::INFINITY);
        self.pred.insert(v.clone(), PredRecord::default());
    }

    /// Seeds a fresh, unreachable vertex.
    pub fn insert_vertex(&mut self, v: V) {
        self.cache.insert(v.clone(), f64::INFINITY);
        self.pred.insert(v, PredRecord::default());
    }

    pub fn remove_vertex(&mut self, v: &V) {
        self.cache.remove(v);
        self.pred.remove(v);
    }

    /// Forgets the source and every cached entry.
    pub fn clear(&mut self) {
        self.source = None;
        self.cache.clear();
        self.pred.clear();
    }

    /// Re-initialises every vertex of `graph` for `source`.
    pub fn reset(&mut self, graph: &Graph<V>, source: V) {
        self.cache.clear();
        self.pred.clear();
        for v in graph.vertices() {
            self.insert_vertex(v.clone());
        }
        self.cache.insert(source.clone(), 0.0);
        self.source = Some(source);
    }

    /// Full Dijkstra from `source`, replacing all cached state.
    pub fn solve(&mut self, graph: &Graph<V>, source: V, stats: &mut CycleStats) -> Result<()> {
        if !graph.contains_vertex(&source) {
            return Err(CascadeError::VertexNotFound(format!("{:?}", source)));
        }
        self.reset(graph, source.clone());

        let mut queue = MinQueue::new();
        let mut settled: FxHashSet<V> = FxHashSet::default();
        queue.push(0.0, source);

        while let Some((_, v)) = queue.pop() {
            // Lazy deletion: later entries for a settled vertex are stale
            if !settled.insert(v.clone()) {
                continue;
            }
            stats.access();
            self.relax_neighbors(graph, &v, &mut queue, stats, |k| !settled.contains(k));
        }

        debug!(
            vertices = graph.vertex_count(),
            edges = graph.edge_count(),
            reachable = settled.len(),
            "Solved shortest-path tree"
        );
        Ok(())
    }

    /// Relaxes every neighbour of `v` accepted by `eligible`, pushing each
    /// improved neighbour onto `queue`. Returns the number of improvements.
    pub(crate) fn relax_neighbors<F>(
        &mut self,
        graph: &Graph<V>,
        v: &V,
        queue: &mut MinQueue<V>,
        stats: &mut CycleStats,
        mut eligible: F,
    ) -> usize
    where
        F: FnMut(&V) -> bool,
    {
        let base = self.distance(v);
        if !base.is_finite() {
            return 0;
        }

        let mut improved = 0;
        for (k, weight) in graph.neighbors(v) {
            if !eligible(k) {
                continue;
            }
            stats.compare();
            let candidate = base + weight;
            if candidate < self.distance(k) {
                self.attach(k, v, weight);
                stats.change();
                queue.push(candidate, k.clone());
                improved += 1;
            } else if candidate == self.distance(k)
                && self.is_tree_edge(v, k)
                && self.height(k) != self.height(v) + 1
            {
                // Same distance, but `v` changed depth: refresh the subtree
                self.attach(k, v, weight);
                stats.change();
                queue.push(candidate, k.clone());
            }
        }
        improved
    }
}
