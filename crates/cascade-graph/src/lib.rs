pub mod budget;
pub mod classify;
pub mod edge;
pub mod engine;
pub mod generator;
pub mod graph;
pub mod propagate;
pub mod queue;
pub mod repair;
pub mod shared;
pub mod snapshot;
pub mod state;
pub mod verify;

pub use budget::{CascadeProgress, StepBudget};
pub use classify::*;
pub use edge::*;
pub use engine::*;
pub use generator::*;
pub use graph::*;
pub use propagate::*;
pub use queue::*;
pub use repair::*;
pub use shared::*;
pub use snapshot::*;
pub use state::*;
pub use verify::{check_tree, diff_against_fresh, DistanceDiff, InvariantViolation};
