//! Observational counters for engine calls.
//!
//! A `CycleStats` is handed explicitly to each public engine call and only
//! ever incremented; nothing in the engine reads it back, so instrumentation
//! cannot change outcomes.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};
use std::time::{Duration, Instant};

/// Counters for a single engine call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CycleStats {
    /// Neighbour relaxation checks.
    pub comparisons: u64,
    /// Distance or parent updates.
    pub changes: u64,
    /// Queue pops that were processed (not discarded as stale).
    pub accesses: u64,
    pub elapsed: Duration,
}

impl CycleStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn compare(&mut self) {
        self.comparisons += 1;
    }

    pub fn change(&mut self) {
        self.changes += 1;
    }

    pub fn access(&mut self) {
        self.accesses += 1;
    }

    pub fn merge(&mut self, other: &CycleStats) {
        self.comparisons += other.comparisons;
        self.changes += other.changes;
        self.accesses += other.accesses;
        self.elapsed += other.elapsed;
    }

    /// Runs `f` and adds its wall time to `elapsed`.
    pub fn timed<T>(&mut self, f: impl FnOnce(&mut Self) -> T) -> T {
        let start = Instant::now();
        let out = f(self);
        self.elapsed += start.elapsed();
        out
    }
}

/// Moving average over the most recent `window_size` samples.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovingAverage {
    window_size: usize,
    values: VecDeque<f64>,
    sum: f64,
}

impl MovingAverage {
    pub fn new(window_size: usize) -> Self {
        Self {
            window_size: window_size.max(1),
            values: VecDeque::with_capacity(window_size),
            sum: 0.0,
        }
    }

    pub fn add_value(&mut self, value: f64) {
        if self.values.len() >= self.window_size {
            if let Some(old_value) = self.values.pop_front() {
                self.sum -= old_value;
            }
        }

        self.values.push_back(value);
        self.sum += value;
    }

    pub fn average(&self) -> f64 {
        if self.values.is_empty() {
            0.0
        } else {
            self.sum / self.values.len() as f64
        }
    }

    pub fn count(&self) -> usize {
        self.values.len()
    }
}

impl Default for MovingAverage {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OperationHistory {
    pub elapsed_ns: MovingAverage,
    pub comparisons: MovingAverage,
    pub changes: MovingAverage,
    pub accesses: MovingAverage,
    pub calls: u64,
}

impl OperationHistory {
    fn record(&mut self, stats: &CycleStats) {
        self.elapsed_ns.add_value(stats.elapsed.as_nanos() as f64);
        self.comparisons.add_value(stats.comparisons as f64);
        self.changes.add_value(stats.changes as f64);
        self.accesses.add_value(stats.accesses as f64);
        self.calls += 1;
    }
}

/// Summary row produced by `StatsRecorder::summary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperationSummary {
    pub operation: String,
    pub calls: u64,
    pub avg_time_ns: f64,
    pub avg_comparisons: f64,
    pub avg_changes: f64,
    pub avg_accesses: f64,
}

/// Per-operation history of `CycleStats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StatsRecorder {
    operations: BTreeMap<String, OperationHistory>,
}

impl StatsRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, operation: &str, stats: &CycleStats) {
        self.operations
            .entry(operation.to_string())
            .or_default()
            .record(stats);
    }

    pub fn clear(&mut self) {
        self.operations.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn history(&self, operation: &str) -> Option<&OperationHistory> {
        self.operations.get(operation)
    }

    pub fn summary(&self) -> Vec<OperationSummary> {
        self.operations
            .iter()
            .map(|(operation, history)| OperationSummary {
                operation: operation.clone(),
                calls: history.calls,
                avg_time_ns: history.elapsed_ns.average(),
                avg_comparisons: history.comparisons.average(),
                avg_changes: history.changes.average(),
                avg_accesses: history.accesses.average(),
            })
            .collect()
    }
}
