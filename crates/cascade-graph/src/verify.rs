//! Consistency checks for the shortest-path tree.
//!
//! These never repair anything; they report what is wrong so tests, the
//! fuzzer and `verify_after_cascade` can surface defects.

use approx::relative_eq;
use cascade_core::{CascadeError, CycleStats, GraphStore, Result, Vertex};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::{CascadeEngine, SsspState};

const TOLERANCE: f64 = 1e-9;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum InvariantViolation {
    #[error("Source {vertex} has distance {distance} and parent {parent:?}")]
    BadSource {
        vertex: String,
        distance: f64,
        parent: Option<String>,
    },

    #[error("Vertex {0} has no cached state")]
    MissingState(String),

    #[error("Vertex {0} is reachable but has no parent")]
    ReachableWithoutParent(String),

    #[error("Vertex {vertex} is unreachable but has parent {parent}")]
    UnreachableWithParent { vertex: String, parent: String },

    #[error("Tree edge ({parent}, {vertex}) is not in the graph")]
    MissingTreeEdge { vertex: String, parent: String },

    #[error("Tree edge ({parent}, {vertex}) records weight {recorded}, graph has {live}")]
    EdgeWeightMismatch {
        vertex: String,
        parent: String,
        recorded: f64,
        live: f64,
    },

    #[error("Vertex {vertex} has distance {cached}, parent implies {expected}")]
    DistanceMismatch {
        vertex: String,
        cached: f64,
        expected: f64,
    },

    #[error("Vertex {vertex} has height {height}, parent implies {expected}")]
    HeightMismatch {
        vertex: String,
        height: u32,
        expected: u32,
    },

    #[error("Parent chain of {0} does not reach the source")]
    Cycle(String),

    #[error("Edge ({from}, {to}) would shorten {to} from {cached} to {offered}")]
    TenseEdge {
        from: String,
        to: String,
        cached: f64,
        offered: f64,
    },
}

/// Vertex whose cached distance differs from a fresh solve.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceDiff<V> {
    pub vertex: V,
    pub cached: f64,
    pub expected: f64,
}

fn name<V: Vertex>(v: &V) -> String {
    format!("{:?}", v)
}

/// Lists every violation of the tree invariants. Empty before the first
/// solve and whenever the engine is consistent.
pub fn check_tree<V: Vertex>(engine: &CascadeEngine<V>) -> Vec<InvariantViolation> {
    let graph = engine.graph();
    let state = engine.state();
    let Some(source) = state.source() else {
        return Vec::new();
    };

    let mut violations = Vec::new();
    if state.distance(source) != 0.0 || state.parent(source).is_some() {
        violations.push(InvariantViolation::BadSource {
            vertex: name(source),
            distance: state.distance(source),
            parent: state.parent(source).map(name),
        });
    }

    for v in graph.vertices() {
        let Some(record) = state.record(v) else {
            violations.push(InvariantViolation::MissingState(name(v)));
            continue;
        };
        if state.is_source(v) {
            continue;
        }
        let distance = state.distance(v);

        let Some(parent) = record.parent.as_ref() else {
            if distance.is_finite() {
                violations.push(InvariantViolation::ReachableWithoutParent(name(v)));
            }
            continue;
        };
        if !distance.is_finite() {
            violations.push(InvariantViolation::UnreachableWithParent {
                vertex: name(v),
                parent: name(parent),
            });
            continue;
        }

        match graph.weight(parent, v) {
            None => violations.push(InvariantViolation::MissingTreeEdge {
                vertex: name(v),
                parent: name(parent),
            }),
            Some(live) if live != record.edge_weight => {
                violations.push(InvariantViolation::EdgeWeightMismatch {
                    vertex: name(v),
                    parent: name(parent),
                    recorded: record.edge_weight,
                    live,
                })
            }
            Some(_) => {}
        }

        let expected = state.distance(parent) + record.edge_weight;
        if !relative_eq!(distance, expected, max_relative = TOLERANCE) {
            violations.push(InvariantViolation::DistanceMismatch {
                vertex: name(v),
                cached: distance,
                expected,
            });
        }

        let expected_height = state.height(parent) + 1;
        if record.height != expected_height {
            violations.push(InvariantViolation::HeightMismatch {
                vertex: name(v),
                height: record.height,
                expected: expected_height,
            });
        }

        if !reaches_source(state, v, graph.vertex_count()) {
            violations.push(InvariantViolation::Cycle(name(v)));
        }
    }

    for edge in graph.edges() {
        for (from, to) in [(&edge.from, &edge.to), (&edge.to, &edge.from)] {
            let offered = state.distance(from) + edge.weight;
            let cached = state.distance(to);
            if offered < cached && !relative_eq!(offered, cached, max_relative = TOLERANCE) {
                violations.push(InvariantViolation::TenseEdge {
                    from: name(from),
                    to: name(to),
                    cached,
                    offered,
                });
            }
        }
    }

    violations
}

fn reaches_source<V: Vertex>(state: &SsspState<V>, v: &V, limit: usize) -> bool {
    let mut current = v;
    for _ in 0..=limit {
        if state.is_source(current) {
            return true;
        }
        match state.parent(current) {
            Some(parent) => current = parent,
            None => return false,
        }
    }
    false
}

/// Re-solves the engine's graph from scratch and lists every vertex whose
/// cached distance disagrees.
pub fn diff_against_fresh<V: Vertex>(engine: &CascadeEngine<V>) -> Result<Vec<DistanceDiff<V>>> {
    let source = engine.source().cloned().ok_or(CascadeError::NotSolved)?;
    let mut fresh = SsspState::new();
    fresh.solve(engine.graph(), source, &mut CycleStats::new())?;

    let cached = engine.state();
    Ok(engine
        .graph()
        .vertices()
        .filter_map(|v| {
            let (have, want) = (cached.distance(v), fresh.distance(v));
            (!relative_eq!(have, want, max_relative = TOLERANCE)).then(|| DistanceDiff {
                vertex: v.clone(),
                cached: have,
                expected: want,
            })
        })
        .collect())
}
