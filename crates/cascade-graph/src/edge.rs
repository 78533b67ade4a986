use serde::{Deserialize, Serialize};

/// An undirected weighted edge as listed by `Graph::edges`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Edge<V> {
    pub from: V,
    pub to: V,
    pub weight: f64,
}

impl<V> Edge<V> {
    pub fn new(from: V, to: V, weight: f64) -> Self {
        Self { from, to, weight }
    }

    pub fn into_tuple(self) -> (V, V, f64) {
        (self.from, self.to, self.weight)
    }
}

impl<V> From<(V, V, f64)> for Edge<V> {
    fn from((from, to, weight): (V, V, f64)) -> Self {
        Self::new(from, to, weight)
    }
}
