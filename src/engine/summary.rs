//! Result of one pipeline run.

use std::fmt;

use crate::dag::TaskStatus;
use crate::errors::{PipedagError, Result};
use crate::task::TaskId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskRecord {
    pub task: TaskId,
    pub status: TaskStatus,
    /// For tasks failed by a dependency: the task whose body failed.
    pub upstream: Option<TaskId>,
}

/// A task whose own body failed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskFailure {
    pub task: TaskId,
    pub message: String,
}

#[derive(Debug, Clone)]
pub struct RunSummary {
    pub root: TaskId,
    /// The root task ended `Done` or `Skipped`.
    pub success: bool,
    pub cancelled: bool,
    /// Every task in the graph, in topological order.
    pub records: Vec<TaskRecord>,
    pub failures: Vec<TaskFailure>,
}

impl RunSummary {
    pub fn status_of(&self, task: &TaskId) -> Option<TaskStatus> {
        self.records
            .iter()
            .find(|r| &r.task == task)
            .map(|r| r.status)
    }

    /// Status of the first task of the given kind.
    pub fn status_of_kind(&self, kind: &str) -> Option<TaskStatus> {
        self.records
            .iter()
            .find(|r| r.task.kind() == kind)
            .map(|r| r.status)
    }

    pub fn with_status(&self, status: TaskStatus) -> Vec<&TaskId> {
        self.records
            .iter()
            .filter(|r| r.status == status)
            .map(|r| &r.task)
            .collect()
    }

    pub fn count(&self, status: TaskStatus) -> usize {
        self.records.iter().filter(|r| r.status == status).count()
    }

    /// `Ok(self)` for a successful run. Otherwise the first task failure as
    /// `Execution`, or `Cancelled` if the run was stopped before the root
    /// could finish.
    pub fn into_result(self) -> Result<Self> {
        if self.success {
            return Ok(self);
        }
        if let Some(failure) = self.failures.into_iter().next() {
            return Err(PipedagError::Execution {
                task: failure.task,
                message: failure.message,
            });
        }
        Err(PipedagError::Cancelled)
    }
}

/// Human-readable run report, one task per line then the failures.
impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for record in &self.records {
            write!(f, "{:<8} {}", record.status, record.task)?;
            if let Some(upstream) = &record.upstream {
                write!(f, "  (upstream {upstream} failed)")?;
            }
            writeln!(f)?;
        }

        for failure in &self.failures {
            writeln!(f, "error: {}: {}", failure.task, failure.message)?;
        }

        let outcome = if self.success {
            "succeeded"
        } else if self.cancelled {
            "cancelled"
        } else {
            "failed"
        };
        write!(
            f,
            "run {outcome}: {} done, {} skipped, {} failed, {} pending",
            self.count(TaskStatus::Done),
            self.count(TaskStatus::Skipped),
            self.count(TaskStatus::Failed),
            self.count(TaskStatus::Pending),
        )
    }
}
