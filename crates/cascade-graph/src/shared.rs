use cascade_core::{CycleStats, Edit, Result, Vertex};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::CascadeEngine;

/// Single-writer handle to a `CascadeEngine` that can be shared across
/// threads.
///
/// A whole edit cycle (apply, classify, cascade) runs under one write lock,
/// so readers only ever see the tree before or after a cycle.
#[derive(Debug)]
pub struct SharedEngine<V: Vertex> {
    inner: Arc<RwLock<CascadeEngine<V>>>,
}

impl<V: Vertex> Clone for SharedEngine<V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<V: Vertex> SharedEngine<V> {
    pub fn new(engine: CascadeEngine<V>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(engine)),
        }
    }

    pub fn solve(&self, source: V) -> Result<()> {
        self.inner.write().solve(source)
    }

    pub fn run_cycle(&self, edits: &[Edit<V>]) -> Result<Vec<bool>> {
        self.run_cycle_with(edits, &mut CycleStats::new())
    }

    /// Applies `edits` and cascades to completion without releasing the lock.
    pub fn run_cycle_with(&self, edits: &[Edit<V>], stats: &mut CycleStats) -> Result<Vec<bool>> {
        let mut engine = self.inner.write();
        let applied = engine.apply_batch_with(edits, stats)?;
        engine.cascade_with(stats);
        Ok(applied)
    }

    /// Runs `f` against a consistent view of the engine.
    pub fn read<R>(&self, f: impl FnOnce(&CascadeEngine<V>) -> R) -> R {
        f(&self.inner.read())
    }

    pub fn distance(&self, v: &V) -> f64 {
        self.inner.read().distance(v)
    }

    pub fn distances(&self) -> BTreeMap<V, f64> {
        self.inner.read().distances()
    }
}
