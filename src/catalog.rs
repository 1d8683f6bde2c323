//! Resolving a task kind plus parameters into a task.

use crate::errors::Result;
use crate::task::TaskRef;
use crate::types::Params;

/// Source of task instances, used by the invocation surface and the CLI to
/// turn `(kind, params)` into a root task.
///
/// Implemented by [`Pipeline`](crate::pipeline::Pipeline) for config-defined
/// tasks; embedders with hand-written [`Task`](crate::task::Task) types can
/// implement it over their own closed set of kinds, or skip it and call
/// [`run_task`](crate::engine::run_task) directly.
pub trait TaskCatalog: Send + Sync {
    /// Instantiate `kind` with `params`.
    ///
    /// Fails with `UnknownTaskKind` or `InvalidParams`.
    fn task(&self, kind: &str, params: &Params) -> Result<TaskRef>;

    /// Known kinds, sorted.
    fn kinds(&self) -> Vec<String>;
}
