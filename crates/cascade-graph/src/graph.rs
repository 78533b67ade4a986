use cascade_core::{is_valid_weight, GraphStore, Vertex};
use std::collections::BTreeMap;

use crate::Edge;

/// Weighted undirected graph with symmetric adjacency.
///
/// Adjacency is kept in ordered maps so that neighbour iteration is
/// deterministic (ascending vertex id); tie-breaks in the engine depend on it.
#[derive(Debug, Clone, PartialEq)]
pub struct Graph<V: Vertex> {
    adjacency: BTreeMap<V, BTreeMap<V, f64>>,
    edge_count: usize,
}

impl<V: Vertex> Default for Graph<V> {
    fn default() -> Self {
        Self {
            adjacency: BTreeMap::new(),
            edge_count: 0,
        }
    }
}

impl<V: Vertex> Graph<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a graph from an edge list, creating endpoints on demand.
    /// Invalid or duplicate edges are skipped.
    pub fn from_edges<I>(edges: I) -> Self
    where
        I: IntoIterator<Item = (V, V, f64)>,
    {
        let mut graph = Self::new();
        for (u, v, w) in edges {
            graph.add_vertex(u.clone());
            graph.add_vertex(v.clone());
            graph.add_edge(u, v, w);
        }
        graph
    }

    pub fn vertex_count(&self) -> usize {
        self.adjacency.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edge_count
    }

    pub fn is_empty(&self) -> bool {
        self.adjacency.is_empty()
    }

    pub fn vertices(&self) -> impl Iterator<Item = &V> + '_ {
        self.adjacency.keys()
    }

    /// Neighbours of `v` with the connecting weight, in ascending id order.
    pub fn neighbors<'a>(&'a self, v: &V) -> impl Iterator<Item = (&'a V, f64)> + 'a {
        self.adjacency
            .get(v)
            .into_iter()
            .flat_map(|adj| adj.iter().map(|(k, w)| (k, *w)))
    }

    pub fn degree(&self, v: &V) -> usize {
        self.adjacency.get(v).map_or(0, BTreeMap::len)
    }

    /// Every undirected edge exactly once, reported with `from < to`.
    pub fn edges(&self) -> impl Iterator<Item = Edge<V>> + '_ {
        self.adjacency.iter().flat_map(|(u, adj)| {
            adj.iter()
                .filter(move |(v, _)| u < *v)
                .map(move |(v, w)| Edge::new(u.clone(), v.clone(), *w))
        })
    }
}

impl<V: Vertex> GraphStore<V> for Graph<V> {
    fn add_vertex(&mut self, v: V) -> bool {
        if self.adjacency.contains_key(&v) {
            return false;
        }
        self.adjacency.insert(v, BTreeMap::new());
        true
    }

    fn remove_vertex(&mut self, v: &V) -> bool {
        let Some(adj) = self.adjacency.remove(v) else {
            return false;
        };
        for neighbor in adj.keys() {
            if let Some(other) = self.adjacency.get_mut(neighbor) {
                other.remove(v);
            }
        }
        self.edge_count -= adj.len();
        true
    }

    fn add_edge(&mut self, u: V, v: V, weight: f64) -> bool {
        if u == v
            || !is_valid_weight(weight)
            || !self.adjacency.contains_key(&u)
            || !self.adjacency.contains_key(&v)
            || self.contains_edge(&u, &v)
        {
            return false;
        }
        if let Some(adj) = self.adjacency.get_mut(&u) {
            adj.insert(v.clone(), weight);
        }
        if let Some(adj) = self.adjacency.get_mut(&v) {
            adj.insert(u, weight);
        }
        self.edge_count += 1;
        true
    }

    fn remove_edge(&mut self, u: &V, v: &V) -> bool {
        if !self.contains_edge(u, v) {
            return false;
        }
        if let Some(adj) = self.adjacency.get_mut(u) {
            adj.remove(v);
        }
        if let Some(adj) = self.adjacency.get_mut(v) {
            adj.remove(u);
        }
        self.edge_count -= 1;
        true
    }

    fn modify_edge_weight(&mut self, u: &V, v: &V, weight: f64) -> bool {
        if !is_valid_weight(weight) || !self.contains_edge(u, v) {
            return false;
        }
        if let Some(w) = self.adjacency.get_mut(u).and_then(|adj| adj.get_mut(v)) {
            *w = weight;
        }
        if let Some(w) = self.adjacency.get_mut(v).and_then(|adj| adj.get_mut(u)) {
            *w = weight;
        }
        true
    }

    fn contains_vertex(&self, v: &V) -> bool {
        self.adjacency.contains_key(v)
    }

    fn weight(&self, u: &V, v: &V) -> Option<f64> {
        self.adjacency.get(u).and_then(|adj| adj.get(v)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cascade_core::Edit;

    fn triangle() -> Graph<&'static str> {
        Graph::from_edges([("a", "b", 1.0), ("b", "c", 2.0), ("a", "c", 4.0)])
    }

    #[test]
    fn test_symmetric_adjacency() {
        let graph = triangle();
        assert_eq!(graph.vertex_count(), 3);
        assert_eq!(graph.edge_count(), 3);
        assert_eq!(graph.weight(&"a", &"b"), Some(1.0));
        assert_eq!(graph.weight(&"b", &"a"), Some(1.0));
        let neighbors: Vec<_> = graph.neighbors(&"c").map(|(k, w)| (*k, w)).collect();
        assert_eq!(neighbors, vec![("a", 4.0), ("b", 2.0)]);
    }

    #[test]
    fn test_edge_validation() {
        let mut graph = triangle();
        assert!(!graph.add_edge("a", "b", 3.0), "duplicate edge");
        assert!(!graph.add_edge("b", "a", 3.0), "duplicate edge, reversed");
        assert!(!graph.add_edge("a", "a", 1.0), "self loop");
        assert!(!graph.add_edge("a", "z", 1.0), "missing endpoint");
        assert!(graph.add_vertex("d"));
        assert!(!graph.add_edge("a", "d", 0.0));
        assert!(!graph.add_edge("a", "d", -1.0));
        assert!(!graph.add_edge("a", "d", f64::NAN));
        assert!(!graph.add_edge("a", "d", f64::INFINITY));
        assert!(graph.add_edge("a", "d", 0.5));
        assert_eq!(graph.edge_count(), 4);
    }

    #[test]
    fn test_modify_and_remove() {
        let mut graph = triangle();
        assert!(graph.modify_edge_weight(&"c", &"a", 3.0));
        assert_eq!(graph.weight(&"a", &"c"), Some(3.0));
        assert!(!graph.modify_edge_weight(&"a", &"c", -2.0));
        assert_eq!(graph.weight(&"a", &"c"), Some(3.0));
        assert!(!graph.modify_edge_weight(&"a", &"z", 2.0));

        assert!(graph.remove_edge(&"b", &"a"));
        assert!(!graph.remove_edge(&"a", &"b"));
        assert_eq!(graph.edge_count(), 2);
    }

    #[test]
    fn test_remove_vertex_drops_incident_edges() {
        let mut graph = triangle();
        assert!(graph.remove_vertex(&"b"));
        assert!(!graph.remove_vertex(&"b"));
        assert_eq!(graph.edge_count(), 1);
        assert!(!graph.contains_edge(&"a", &"b"));
        assert_eq!(graph.degree(&"c"), 1);
    }

    #[test]
    fn test_batch_is_ordered_and_atomic_per_edit() {
        let mut graph: Graph<u32> = Graph::new();
        let results = graph.apply_batch(&[
            Edit::AddVertex(1),
            Edit::AddVertex(2),
            Edit::AddEdge(1, 2, 5.0),
            Edit::RemoveEdge(1, 3),
        ]);
        assert_eq!(results, vec![true, true, true, false]);

        let results = graph.apply_batch(&[Edit::ModifyEdge(2, 1, 2.0), Edit::AddVertex(1)]);
        assert_eq!(results, vec![true, false]);
        assert_eq!(graph.weight(&1, &2), Some(2.0));
    }

    #[test]
    fn test_batch_touches_each_target_once() {
        let mut graph = triangle();
        let results = graph.apply_batch(&[
            Edit::ModifyEdge("a", "b", 7.0),
            Edit::ModifyEdge("b", "a", 8.0),
            Edit::RemoveEdge("a", "b"),
            Edit::RemoveVertex("c"),
            Edit::AddVertex("c"),
        ]);
        assert_eq!(results, vec![true, false, false, true, false]);
        assert_eq!(graph.weight(&"a", &"b"), Some(7.0));
        assert!(!graph.contains_vertex(&"c"));
    }

    #[test]
    fn test_edges_listed_once() {
        let graph = triangle();
        let edges: Vec<_> = graph.edges().collect();
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().all(|e| e.from < e.to));
    }
}
