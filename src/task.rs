// src/task.rs

//! Units of work.
//!
//! A task is identified by its kind plus its parameters ([`TaskId`]). Its
//! dependencies and its output target must be pure functions of those
//! parameters, so two tasks with equal ids always describe the same work
//! and publish to the same place.

use std::fmt;
use std::sync::Arc;

use crate::errors::Result;
use crate::target::Target;
use crate::types::Params;

/// Shared handle to a task, as held by the dependency graph.
pub type TaskRef = Arc<dyn Task>;

/// Identity of a task: `(kind, parameters)`.
///
/// Dependency structure is intentionally not part of the identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId {
    kind: String,
    params: Params,
}

impl TaskId {
    pub fn new(kind: impl Into<String>, params: Params) -> Self {
        Self {
            kind: kind.into(),
            params,
        }
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn params(&self) -> &Params {
        &self.params
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.params)
    }
}

/// A parameterised unit of work with one output target.
///
/// Implementations are plain values; the engine never mutates them. Only
/// [`execute`](Task::execute) may touch the outside world.
pub trait Task: Send + Sync + fmt::Debug {
    fn kind(&self) -> &str;

    fn params(&self) -> &Params;

    fn id(&self) -> TaskId {
        TaskId::new(self.kind(), self.params().clone())
    }

    /// Tasks that must be complete before this one runs, in input order.
    ///
    /// Must be deterministic and side-effect free; the graph builder calls it
    /// purely to discover structure. An error here is structural and aborts
    /// the run before anything executes.
    fn dependencies(&self) -> Result<Vec<TaskRef>> {
        Ok(Vec::new())
    }

    /// Where this task publishes its result.
    fn output(&self) -> Target;

    /// Run the step body.
    ///
    /// `inputs` holds the output target of each dependency, in the order
    /// returned by [`dependencies`](Task::dependencies); all of them exist.
    /// The body must publish through `self.output().open_write()` and
    /// `commit()`; returning an error (or leaving the target absent) fails
    /// the task.
    fn execute(&self, inputs: &[Target]) -> anyhow::Result<()>;
}
