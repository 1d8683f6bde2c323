use std::collections::VecDeque;

use tracing::{debug, info, warn};

use crate::dag::graph::{NodeId, TaskGraph};
use crate::dag::scheduler_step::SchedulerStep;
use crate::dag::state_manager::{ReadOnlyStateManager, StateManager};
use crate::dag::task_info::{FailureCause, RunState, ScheduledTask, TaskInfo, TaskStatus};
use crate::engine::summary::{RunSummary, TaskFailure, TaskRecord};
use crate::engine::TaskOutcome;
use crate::task::TaskId;

/// Scheduler holds the immutable task graph plus the execution record table
/// for one run.
///
/// It is responsible for:
/// - deciding when a task is ready (all dependencies `Done` or `Skipped`)
/// - keeping the ready queue in a deterministic order
/// - recording skips, starts and completions
/// - failing dependents transitively when a task fails
///
/// It performs no IO. The caller decides skip vs. run by checking the
/// task's target, and reports back through [`mark_skipped`],
/// [`mark_running`] and [`handle_completion`].
///
/// [`mark_skipped`]: Scheduler::mark_skipped
/// [`mark_running`]: Scheduler::mark_running
/// [`handle_completion`]: Scheduler::handle_completion
#[derive(Debug)]
pub struct Scheduler {
    graph: TaskGraph,
    tasks: Vec<TaskInfo>,
    ready: VecDeque<NodeId>,
    started: bool,
}

impl Scheduler {
    pub fn new(graph: TaskGraph) -> Self {
        let mut tasks: Vec<TaskInfo> = Vec::with_capacity(graph.len());
        for index in 0..graph.len() {
            let node = NodeId::new(index);
            let deps = graph.dependencies_of(node).to_vec();
            tasks.push(TaskInfo::new(node, graph.id_of(node), deps));
        }

        Self {
            graph,
            tasks,
            ready: VecDeque::new(),
            started: false,
        }
    }

    pub fn graph(&self) -> &TaskGraph {
        &self.graph
    }

    pub fn status_of(&self, node: NodeId) -> TaskStatus {
        self.tasks[node.index()].status()
    }

    pub fn status_of_id(&self, id: &TaskId) -> Option<TaskStatus> {
        self.graph.node_of(id).map(|node| self.status_of(node))
    }

    pub fn failure_of(&self, node: NodeId) -> Option<&FailureCause> {
        self.tasks[node.index()].failure.as_ref()
    }

    /// Whether every dependency of `node` is `Done` or `Skipped`.
    pub fn deps_satisfied(&self, node: NodeId) -> bool {
        let mgr = ReadOnlyStateManager::new(&self.tasks);
        mgr.deps_satisfied_for_info(&self.tasks[node.index()])
    }

    pub fn root_status(&self) -> TaskStatus {
        self.status_of(self.graph.root())
    }

    /// Every task is terminal.
    pub fn is_finished(&self) -> bool {
        ReadOnlyStateManager::new(&self.tasks).all_tasks_terminal()
    }

    pub fn has_ready(&self) -> bool {
        self.ready
            .iter()
            .any(|node| self.tasks[node.index()].run_state == RunState::Queued)
    }

    /// Seed the ready queue with tasks that have no dependencies.
    ///
    /// Calling it again is a no-op.
    pub fn start(&mut self) -> SchedulerStep {
        if self.started {
            return SchedulerStep::default();
        }
        self.started = true;

        info!(
            tasks = self.tasks.len(),
            root = %self.graph.id_of(self.graph.root()),
            "scheduler: starting run"
        );

        let newly_ready = self.collect_ready();
        SchedulerStep {
            newly_ready,
            newly_failed: Vec::new(),
            run_just_finished: self.is_finished(),
        }
    }

    /// Pop the next queued task, in queue order.
    ///
    /// The task stays `Queued` until the caller reports either
    /// [`mark_skipped`](Scheduler::mark_skipped) or
    /// [`mark_running`](Scheduler::mark_running).
    pub fn next_ready(&mut self) -> Option<ScheduledTask> {
        while let Some(node) = self.ready.pop_front() {
            let info = &self.tasks[node.index()];
            if info.run_state != RunState::Queued {
                // Failed by an upstream task while waiting in the queue.
                continue;
            }

            let inputs = self
                .graph
                .declared_dependencies_of(node)
                .iter()
                .map(|dep| self.graph.task(*dep).output())
                .collect();

            return Some(ScheduledTask {
                node,
                id: info.id.clone(),
                task: self.graph.task(node).clone(),
                inputs,
            });
        }
        None
    }

    /// The task's target already exists; its body will not run.
    pub fn mark_skipped(&mut self, node: NodeId) -> SchedulerStep {
        let info = &mut self.tasks[node.index()];
        if info.run_state != RunState::Queued {
            warn!(task = %info.id, state = ?info.run_state, "skip for task that is not queued; ignoring");
            return SchedulerStep::default();
        }

        info.run_state = RunState::Skipped;
        info!(task = %info.id, "target exists; skipping");

        let newly_ready = self.collect_ready();
        SchedulerStep {
            newly_ready,
            newly_failed: Vec::new(),
            run_just_finished: self.is_finished(),
        }
    }

    /// The task's body has been dispatched to a worker.
    pub fn mark_running(&mut self, node: NodeId) {
        let info = &mut self.tasks[node.index()];
        if info.run_state != RunState::Queued {
            warn!(task = %info.id, state = ?info.run_state, "start for task that is not queued; ignoring");
            return;
        }
        info.run_state = RunState::Running;
        debug!(task = %info.id, "marked Running");
    }

    /// Record the outcome of a running task.
    pub fn handle_completion(&mut self, node: NodeId, outcome: TaskOutcome) -> SchedulerStep {
        let info = &mut self.tasks[node.index()];
        if info.run_state != RunState::Running {
            warn!(task = %info.id, state = ?info.run_state, "completion for task that is not running; ignoring");
            return SchedulerStep::default();
        }

        let mut step = SchedulerStep::default();

        match outcome {
            TaskOutcome::Success => {
                info.run_state = RunState::Done;
                debug!(task = %info.id, "task completed successfully");
                step.newly_ready = self.collect_ready();
            }
            TaskOutcome::Failed(message) => {
                info.run_state = RunState::Failed;
                warn!(task = %info.id, error = %message, "task failed; failing dependents");
                info.failure = Some(FailureCause::Execution(message));
                step.newly_failed.push(node);

                let mut manager = StateManager::new(&self.graph, &mut self.tasks);
                step.newly_failed.extend(manager.mark_dependents_failed(node));
            }
        }

        step.run_just_finished = self.is_finished();
        if step.run_just_finished {
            info!(root_status = %self.root_status(), "scheduler: all tasks terminal");
        }
        step
    }

    /// Snapshot of the run for reporting.
    ///
    /// `failures` lists only tasks whose own body failed; tasks blocked by an
    /// upstream failure appear in `records` with their cause.
    pub fn summary(&self, cancelled: bool) -> RunSummary {
        let mut records = Vec::with_capacity(self.tasks.len());
        let mut failures = Vec::new();

        for node in self.graph.topological_order() {
            let info = &self.tasks[node.index()];
            let upstream = match &info.failure {
                Some(FailureCause::Execution(message)) => {
                    failures.push(TaskFailure {
                        task: info.id.clone(),
                        message: message.clone(),
                    });
                    None
                }
                Some(FailureCause::Upstream(cause)) => Some(cause.clone()),
                None => None,
            };
            records.push(TaskRecord {
                task: info.id.clone(),
                status: info.status(),
                upstream,
            });
        }

        RunSummary {
            root: self.graph.id_of(self.graph.root()),
            success: self.root_status().is_complete(),
            cancelled,
            records,
            failures,
        }
    }

    fn collect_ready(&mut self) -> Vec<NodeId> {
        let mut manager = StateManager::new(&self.graph, &mut self.tasks);
        let newly_ready = manager.collect_new_ready_tasks();
        self.ready.extend(newly_ready.iter().copied());
        newly_ready
    }
}
