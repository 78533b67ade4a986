//! Random graphs and edit batches for fuzzing and benchmarks.

use cascade_core::{ConfigError, Edit, EditKind, GraphStore};
use rand::seq::IndexedRandom;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::Graph;

/// Inclusive range of integer edge weights.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WeightRange {
    pub min: u32,
    pub max: u32,
}

impl Default for WeightRange {
    fn default() -> Self {
        Self { min: 1, max: 10 }
    }
}

impl WeightRange {
    pub fn new(min: u32, max: u32) -> Result<Self, ConfigError> {
        if min == 0 || min > max {
            return Err(ConfigError::ValidationError(format!(
                "weight range [{}, {}] must be non-empty and positive",
                min, max
            )));
        }
        Ok(Self { min, max })
    }

    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        f64::from(rng.random_range(self.min..=self.max))
    }
}

/// Erdős–Rényi graph on vertices `0..n`: every pair is joined
/// independently with probability `p`.
pub fn erdos_renyi<R: Rng + ?Sized>(n: u32, p: f64, weights: WeightRange, rng: &mut R) -> Graph<u32> {
    let p = p.clamp(0.0, 1.0);
    let mut graph = Graph::new();
    for v in 0..n {
        graph.add_vertex(v);
    }
    for u in 0..n {
        for v in (u + 1)..n {
            if rng.random_bool(p) {
                graph.add_edge(u, v, weights.sample(rng));
            }
        }
    }
    graph
}

/// Shape of a random edit batch.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchSpec {
    pub count: usize,
    pub kinds: Vec<EditKind>,
    pub weights: WeightRange,
    /// Never chosen for vertex removal.
    pub protected: Option<u32>,
}

impl Default for BatchSpec {
    fn default() -> Self {
        Self {
            count: 50,
            kinds: EditKind::EDGE_KINDS.to_vec(),
            weights: WeightRange::default(),
            protected: Some(0),
        }
    }
}

/// Draws a batch of edits against `graph` as it is now.
///
/// Targets are picked from the graph at generation time, so a later edit
/// may hit an edge an earlier one already removed; the engine rejects those.
pub fn random_batch<R: Rng + ?Sized>(graph: &Graph<u32>, spec: &BatchSpec, rng: &mut R) -> Vec<Edit<u32>> {
    let vertices: Vec<u32> = graph.vertices().copied().collect();
    let edges: Vec<(u32, u32)> = graph.edges().map(|e| (e.from, e.to)).collect();
    let mut next_vertex = vertices.last().map_or(0, |v| v + 1);
    let mut batch = Vec::with_capacity(spec.count);

    for _ in 0..spec.count {
        let Some(kind) = spec.kinds.choose(rng) else {
            break;
        };
        let edit = match kind {
            EditKind::AddEdge => random_non_edge(graph, &vertices, rng)
                .map(|(u, v)| Edit::AddEdge(u, v, spec.weights.sample(rng))),
            EditKind::RemoveEdge => edges.choose(rng).map(|&(u, v)| Edit::RemoveEdge(u, v)),
            EditKind::ModifyEdge => edges
                .choose(rng)
                .map(|&(u, v)| Edit::ModifyEdge(u, v, spec.weights.sample(rng))),
            EditKind::AddVertex => {
                next_vertex += 1;
                Some(Edit::AddVertex(next_vertex - 1))
            }
            EditKind::RemoveVertex => vertices
                .choose(rng)
                .filter(|v| Some(**v) != spec.protected)
                .map(|&v| Edit::RemoveVertex(v)),
        };
        batch.extend(edit);
    }

    batch
}

fn random_non_edge<R: Rng + ?Sized>(graph: &Graph<u32>, vertices: &[u32], rng: &mut R) -> Option<(u32, u32)> {
    if vertices.len() < 2 {
        return None;
    }
    for _ in 0..64 {
        let (Some(&u), Some(&v)) = (vertices.choose(rng), vertices.choose(rng)) else {
            return None;
        };
        if u != v && !graph.contains_edge(&u, &v) {
            return Some((u, v));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_erdos_renyi_extremes() {
        let mut rng = StdRng::seed_from_u64(7);
        let empty = erdos_renyi(8, 0.0, WeightRange::default(), &mut rng);
        assert_eq!(empty.vertex_count(), 8);
        assert_eq!(empty.edge_count(), 0);

        let complete = erdos_renyi(8, 1.0, WeightRange::default(), &mut rng);
        assert_eq!(complete.edge_count(), 28);
        assert!(complete.edges().all(|e| (1.0..=10.0).contains(&e.weight)));
    }

    #[test]
    fn test_seeded_generation_is_reproducible() {
        let a = erdos_renyi(12, 0.4, WeightRange::default(), &mut StdRng::seed_from_u64(42));
        let b = erdos_renyi(12, 0.4, WeightRange::default(), &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn test_random_batch_shapes() {
        let mut rng = StdRng::seed_from_u64(3);
        let graph = erdos_renyi(10, 0.5, WeightRange::default(), &mut rng);
        let spec = BatchSpec {
            count: 40,
            ..Default::default()
        };
        let batch = random_batch(&graph, &spec, &mut rng);
        assert!(!batch.is_empty() && batch.len() <= 40);
        assert!(batch.iter().all(|edit| edit.kind().is_edge()));
        for edit in &batch {
            if let Edit::AddEdge(u, v, _) = edit {
                assert_ne!(u, v);
                assert!(!graph.contains_edge(u, v));
            }
        }
    }

    #[test]
    fn test_protected_vertex_is_never_removed() {
        let mut rng = StdRng::seed_from_u64(11);
        let graph = erdos_renyi(4, 0.5, WeightRange::default(), &mut rng);
        let spec = BatchSpec {
            count: 200,
            kinds: vec![EditKind::RemoveVertex],
            weights: WeightRange::default(),
            protected: Some(0),
        };
        let batch = random_batch(&graph, &spec, &mut rng);
        assert!(batch.iter().all(|edit| *edit != Edit::RemoveVertex(0)));
    }

    #[test]
    fn test_weight_range_validation() {
        assert!(WeightRange::new(0, 3).is_err());
        assert!(WeightRange::new(5, 2).is_err());
        assert_eq!(WeightRange::new(2, 2).unwrap().sample(&mut StdRng::seed_from_u64(1)), 2.0);
    }
}
