// src/engine/mod.rs

//! Orchestration engine.
//!
//! This module ties together:
//! - the dependency graph builder ([`crate::dag::graph`])
//! - the per-run scheduler ([`crate::dag::Scheduler`])
//! - the async worker-pool shell ([`runtime`]) that checks targets, runs
//!   task bodies and feeds outcomes back into the scheduler
//!
//! [`run_task`] and [`run_pipeline`] are the invocation surface.

use tracing::info;

use crate::catalog::TaskCatalog;
use crate::dag::{Scheduler, TaskGraph};
use crate::errors::Result;
use crate::task::TaskRef;
use crate::types::Params;

pub mod context;
pub mod runtime;
pub mod summary;

pub use context::RunContext;
pub use runtime::Runtime;
pub use summary::{RunSummary, TaskFailure, TaskRecord};

/// Outcome of a task body for the scheduler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskOutcome {
    Success,
    Failed(String),
}

/// Build the graph for `root` and run it to completion.
///
/// Structural errors (cycles, unresolvable dependencies) are returned as
/// `Err` before any task executes. Task failures are not errors: they are
/// reported in the returned [`RunSummary`].
pub async fn run_task(root: TaskRef, ctx: RunContext) -> Result<RunSummary> {
    let graph = TaskGraph::build(root)?;
    info!(tasks = graph.len(), workers = ctx.workers(), "pipeline graph ready");

    let scheduler = Scheduler::new(graph);
    Runtime::new(scheduler, ctx).run().await
}

/// Resolve `kind` with `params` through `catalog` and run it.
pub async fn run_pipeline(
    catalog: &dyn TaskCatalog,
    kind: &str,
    params: &Params,
    ctx: RunContext,
) -> Result<RunSummary> {
    let root = catalog.task(kind, params)?;
    run_task(root, ctx).await
}
