// src/engine/runtime.rs

use std::fmt;

use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::dag::graph::NodeId;
use crate::dag::Scheduler;
use crate::errors::{PipedagError, Result};
use crate::exec::task_runner::run_task;

use super::context::RunContext;
use super::summary::RunSummary;
use super::TaskOutcome;

/// Drives the [`Scheduler`] with a bounded pool of workers.
///
/// All status transitions happen on this loop; workers only run task bodies
/// and hand back a [`TaskOutcome`]. With `workers == 1` tasks run strictly one
/// after another in the scheduler's deterministic order.
pub struct Runtime {
    scheduler: Scheduler,
    ctx: RunContext,
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("scheduler", &self.scheduler)
            .field("workers", &self.ctx.workers())
            .finish_non_exhaustive()
    }
}

impl Runtime {
    pub fn new(scheduler: Scheduler, ctx: RunContext) -> Self {
        Self { scheduler, ctx }
    }

    /// Main loop.
    ///
    /// - Fills free worker slots from the ready queue, skipping tasks whose
    ///   target already exists.
    /// - Waits for the next worker to finish and feeds its outcome back.
    /// - On cancellation stops dispatching and drains in-flight tasks.
    pub async fn run(mut self) -> Result<RunSummary> {
        info!(workers = self.ctx.workers(), "pipeline runtime started");

        let cancel = self.ctx.cancellation().clone();
        let mut in_flight: JoinSet<(NodeId, TaskOutcome)> = JoinSet::new();
        let mut cancelled = false;

        self.scheduler.start();

        loop {
            if !cancelled && cancel.is_cancelled() {
                cancelled = true;
            }

            if cancelled {
                if !in_flight.is_empty() {
                    debug!(in_flight = in_flight.len(), "cancelled; awaiting in-flight tasks");
                }
            } else {
                self.dispatch_ready(&mut in_flight).await?;
            }

            if in_flight.is_empty() {
                if !cancelled && !self.scheduler.is_finished() {
                    // Nothing running and nothing ready, yet tasks remain.
                    error!("scheduler stalled with non-terminal tasks");
                }
                break;
            }

            let joined = tokio::select! {
                joined = in_flight.join_next() => joined,
                _ = cancel.cancelled(), if !cancelled => {
                    warn!("cancellation requested; no new tasks will be dispatched");
                    cancelled = true;
                    continue;
                }
            };

            match joined {
                Some(Ok((node, outcome))) => {
                    self.scheduler.handle_completion(node, outcome);
                }
                Some(Err(join_err)) => {
                    // Task bodies run behind their own join handle and cannot
                    // panic through here.
                    return Err(PipedagError::Other(anyhow::anyhow!(
                        "worker task aborted: {join_err}"
                    )));
                }
                None => break,
            }
        }

        let summary = self.scheduler.summary(cancelled);
        info!(
            root = %summary.root,
            success = summary.success,
            cancelled = summary.cancelled,
            failures = summary.failures.len(),
            "pipeline runtime finished"
        );
        Ok(summary)
    }

    /// Take tasks off the ready queue until every worker slot is busy.
    ///
    /// A task whose target already exists is marked `Skipped` right here,
    /// which may make further tasks ready within the same call. The existence
    /// check runs on the blocking pool since backends may stat files or make
    /// network calls.
    async fn dispatch_ready(
        &mut self,
        in_flight: &mut JoinSet<(NodeId, TaskOutcome)>,
    ) -> Result<()> {
        while in_flight.len() < self.ctx.workers() {
            let Some(scheduled) = self.scheduler.next_ready() else {
                break;
            };

            let output = scheduled.task.output();
            let target = output.clone();
            let present = tokio::task::spawn_blocking(move || target.exists())
                .await
                .map_err(|err| {
                    PipedagError::Other(anyhow::anyhow!(
                        "existence check for {output} aborted: {err}"
                    ))
                })?;
            if present {
                debug!(task = %scheduled.id, target = %output, "target already present");
                self.scheduler.mark_skipped(scheduled.node);
                continue;
            }

            self.scheduler.mark_running(scheduled.node);
            debug!(task = %scheduled.id, in_flight = in_flight.len() + 1, "dispatching task");
            in_flight.spawn(run_task(scheduled));
        }
        Ok(())
    }
}
