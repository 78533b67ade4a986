use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Upper bound on the work done by one bounded cascade call.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StepBudget {
    /// Maximum units of work (queue pops and orphan reattachments).
    pub max_steps: Option<u64>,
    /// Wall-clock instant after which the call yields.
    pub deadline: Option<Instant>,
}

impl StepBudget {
    pub fn unlimited() -> Self {
        Self::default()
    }

    pub fn steps(max_steps: u64) -> Self {
        Self {
            max_steps: Some(max_steps),
            deadline: None,
        }
    }

    pub fn time(limit: Duration) -> Self {
        Self {
            max_steps: None,
            deadline: Some(Instant::now() + limit),
        }
    }
}

/// Outcome of a bounded cascade call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CascadeProgress {
    /// Both queues drained; the tree is consistent with the graph.
    Complete { steps: u64 },
    /// The budget ran out; call again to resume.
    Suspended { steps: u64 },
}

impl CascadeProgress {
    pub fn is_complete(&self) -> bool {
        matches!(self, CascadeProgress::Complete { .. })
    }

    pub fn steps(&self) -> u64 {
        match self {
            CascadeProgress::Complete { steps } | CascadeProgress::Suspended { steps } => *steps,
        }
    }
}

/// Counts steps against a `StepBudget`.
#[derive(Debug)]
pub(crate) struct BudgetMeter {
    budget: StepBudget,
    steps: u64,
}

impl BudgetMeter {
    pub(crate) fn new(budget: StepBudget) -> Self {
        Self { budget, steps: 0 }
    }

    /// Claims one unit of work; `false` once the budget is spent.
    pub(crate) fn try_step(&mut self) -> bool {
        if self.budget.max_steps.is_some_and(|max| self.steps >= max) {
            return false;
        }
        if self.budget.deadline.is_some_and(|deadline| Instant::now() >= deadline) {
            return false;
        }
        self.steps += 1;
        true
    }

    pub(crate) fn steps(&self) -> u64 {
        self.steps
    }
}
