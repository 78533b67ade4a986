use std::collections::BTreeSet;

use crate::{Edit, Vertex};

/// Mutable weighted undirected graph.
///
/// Every mutation reports success as a `bool` and leaves the store untouched
/// when it fails; invalid input is never an error.
pub trait GraphStore<V: Vertex> {
    fn add_vertex(&mut self, v: V) -> bool;
    fn remove_vertex(&mut self, v: &V) -> bool;
    fn add_edge(&mut self, u: V, v: V, weight: f64) -> bool;
    fn remove_edge(&mut self, u: &V, v: &V) -> bool;
    fn modify_edge_weight(&mut self, u: &V, v: &V, weight: f64) -> bool;

    fn contains_vertex(&self, v: &V) -> bool;
    fn weight(&self, u: &V, v: &V) -> Option<f64>;

    fn contains_edge(&self, u: &V, v: &V) -> bool {
        self.weight(u, v).is_some()
    }

    fn apply(&mut self, edit: &Edit<V>) -> bool {
        match edit {
            Edit::AddVertex(v) => self.add_vertex(v.clone()),
            Edit::RemoveVertex(v) => self.remove_vertex(v),
            Edit::AddEdge(u, v, w) => self.add_edge(u.clone(), v.clone(), *w),
            Edit::RemoveEdge(u, v) => self.remove_edge(u, v),
            Edit::ModifyEdge(u, v, w) => self.modify_edge_weight(u, v, *w),
        }
    }

    /// Applies `edits` in order; later edits observe earlier successes.
    ///
    /// Each target is touched at most once per batch: a later edit on a
    /// vertex or edge already named in the batch is rejected, whether or not
    /// the first one succeeded.
    fn apply_batch(&mut self, edits: &[Edit<V>]) -> Vec<bool> {
        let mut seen = BTreeSet::new();
        edits
            .iter()
            .map(|edit| seen.insert(edit.target()) && self.apply(edit))
            .collect()
    }
}
