// src/dag/scheduler_step.rs

//! Step-by-step execution result types for the scheduler.

use crate::dag::graph::NodeId;

/// Structured result of a single scheduler "step".
///
/// Useful for tests that step the DAG by hand and assert on what changed.
#[derive(Debug, Clone, Default)]
pub struct SchedulerStep {
    /// Tasks whose dependencies became complete in this step. They are now
    /// in the ready queue.
    pub newly_ready: Vec<NodeId>,
    /// Tasks newly marked as failed in this step (the task that failed plus
    /// every dependent blocked by it).
    pub newly_failed: Vec<NodeId>,
    /// Whether every task is now terminal.
    pub run_just_finished: bool,
}
