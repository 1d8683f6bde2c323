// src/dag/mod.rs

//! Dependency graph and scheduling.
//!
//! - [`graph`] builds the deduplicated, acyclic graph of task instances
//!   reachable from a root task.
//! - [`scheduler`] contains the per-run state machine that decides
//!   which tasks are ready to run, and when dependents can be scheduled.
//! - [`task_info`] provides per-task run state and scheduled task types.
//! - [`scheduler_step`] defines the result type for scheduler steps.
//! - [`state_manager`] manages per-run state transitions.

pub mod graph;
pub mod scheduler;
pub mod scheduler_step;
pub mod state_manager;
pub mod task_info;

pub use graph::{GraphBuilder, NodeId, TaskGraph};
pub use scheduler::Scheduler;
pub use scheduler_step::SchedulerStep;
pub use task_info::{FailureCause, ScheduledTask, TaskStatus};
