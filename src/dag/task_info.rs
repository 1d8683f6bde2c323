// src/dag/task_info.rs

//! Execution records: per-task state for one run.

use crate::dag::graph::NodeId;
use crate::target::Target;
use crate::task::{TaskId, TaskRef};

/// Per-run state of a task (internal).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// Waiting on dependencies.
    Pending,
    /// Dependencies satisfied; sitting in the ready queue until a worker
    /// slot frees up.
    Queued,
    /// Body dispatched to a worker.
    Running,
    Done,
    Failed,
    /// Target already existed; body never ran.
    Skipped,
}

/// Public, read-only view of a task's status.
///
/// Queued tasks report as `Pending`: they have not started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskStatus {
    Pending,
    Running,
    Done,
    Failed,
    Skipped,
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Failed | TaskStatus::Skipped)
    }

    /// Whether dependents may proceed.
    pub fn is_complete(self) -> bool {
        matches!(self, TaskStatus::Done | TaskStatus::Skipped)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Done => "done",
            TaskStatus::Failed => "failed",
            TaskStatus::Skipped => "skipped",
        }
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.pad(self.as_str())
    }
}

impl From<RunState> for TaskStatus {
    fn from(state: RunState) -> Self {
        match state {
            RunState::Pending | RunState::Queued => TaskStatus::Pending,
            RunState::Running => TaskStatus::Running,
            RunState::Done => TaskStatus::Done,
            RunState::Failed => TaskStatus::Failed,
            RunState::Skipped => TaskStatus::Skipped,
        }
    }
}

/// Why a task ended `Failed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureCause {
    /// The task's own body failed.
    Execution(String),
    /// A dependency failed, so the body was never run.
    Upstream(TaskId),
}

/// Execution record for one node of the graph.
#[derive(Debug, Clone)]
pub struct TaskInfo {
    pub node: NodeId,
    pub id: TaskId,
    /// Direct dependencies, in declaration order.
    pub deps: Vec<NodeId>,
    pub run_state: RunState,
    pub failure: Option<FailureCause>,
}

impl TaskInfo {
    pub fn new(node: NodeId, id: TaskId, deps: Vec<NodeId>) -> Self {
        Self {
            node,
            id,
            deps,
            run_state: RunState::Pending,
            failure: None,
        }
    }

    pub fn status(&self) -> TaskStatus {
        self.run_state.into()
    }
}

/// A task the scheduler wants a worker to run now.
#[derive(Debug, Clone)]
pub struct ScheduledTask {
    pub node: NodeId,
    pub id: TaskId,
    pub task: TaskRef,
    /// Output targets of the dependencies, in declaration order.
    pub inputs: Vec<Target>,
}
