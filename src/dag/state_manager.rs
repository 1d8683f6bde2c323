// src/dag/state_manager.rs

//! Per-run state transitions for tasks in the scheduler.

use tracing::debug;

use crate::dag::graph::{NodeId, TaskGraph};
use crate::dag::task_info::{FailureCause, RunState, TaskInfo};

/// Manages per-run state transitions over the execution record table.
///
/// `tasks` is indexed by `NodeId::index()`.
pub struct StateManager<'a> {
    graph: &'a TaskGraph,
    tasks: &'a mut [TaskInfo],
}

impl<'a> StateManager<'a> {
    pub fn new(graph: &'a TaskGraph, tasks: &'a mut [TaskInfo]) -> Self {
        Self { graph, tasks }
    }

    /// Mark every not-yet-started dependent (transitively) of a failed task as
    /// `Failed` with an upstream cause.
    ///
    /// Returns the newly failed nodes, excluding `failed` itself.
    pub fn mark_dependents_failed(&mut self, failed: NodeId) -> Vec<NodeId> {
        let cause = self.tasks[failed.index()].id.clone();
        let mut stack: Vec<NodeId> = self.graph.dependents_of(failed);
        let mut newly_failed = Vec::new();

        while let Some(node) = stack.pop() {
            let info = &mut self.tasks[node.index()];
            match info.run_state {
                RunState::Pending | RunState::Queued => {
                    info.run_state = RunState::Failed;
                    info.failure = Some(FailureCause::Upstream(cause.clone()));
                    debug!(
                        task = %info.id,
                        upstream = %cause,
                        "marking dependent as Failed due to upstream failure"
                    );
                    newly_failed.push(node);
                    stack.extend(self.graph.dependents_of(node));
                }
                RunState::Running | RunState::Done | RunState::Failed | RunState::Skipped => {
                    // A dependent cannot have started before this dependency
                    // finished; anything terminal stays as it is.
                }
            }
        }

        newly_failed
    }

    /// Move `Pending` tasks whose dependencies are all complete to `Queued`
    /// and return them in topological order.
    pub fn collect_new_ready_tasks(&mut self) -> Vec<NodeId> {
        let candidates: Vec<NodeId> = self
            .graph
            .topological_order()
            .iter()
            .copied()
            .filter(|node| {
                let info = &self.tasks[node.index()];
                info.run_state == RunState::Pending
                    && ReadOnlyStateManager::new(&*self.tasks).deps_satisfied_for_info(info)
            })
            .collect();

        for node in &candidates {
            let info = &mut self.tasks[node.index()];
            debug!(task = %info.id, "dependencies satisfied; queued");
            info.run_state = RunState::Queued;
        }

        candidates
    }

    pub fn all_tasks_terminal(&self) -> bool {
        ReadOnlyStateManager::new(&*self.tasks).all_tasks_terminal()
    }
}

/// A read-only view for dependency checks when only shared access is
/// available (e.g. `Scheduler::deps_satisfied`).
pub struct ReadOnlyStateManager<'a> {
    tasks: &'a [TaskInfo],
}

impl<'a> ReadOnlyStateManager<'a> {
    pub fn new(tasks: &'a [TaskInfo]) -> Self {
        Self { tasks }
    }

    /// All dependencies are `Done` or `Skipped`.
    pub fn deps_satisfied_for_info(&self, info: &TaskInfo) -> bool {
        info.deps.iter().all(|dep| {
            matches!(
                self.tasks[dep.index()].run_state,
                RunState::Done | RunState::Skipped
            )
        })
    }

    pub fn all_tasks_terminal(&self) -> bool {
        !self.tasks.iter().any(|info| {
            matches!(
                info.run_state,
                RunState::Pending | RunState::Queued | RunState::Running
            )
        })
    }
}
