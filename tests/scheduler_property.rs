use std::collections::HashSet;

use proptest::prelude::*;
use pipedag::dag::{NodeId, Scheduler, TaskGraph, TaskStatus};
use pipedag::engine::TaskOutcome;
use pipedag::storage::MemoryStorage;
use pipedag::task::TaskRef;
use pipedag_test_utils::fake_task::{ExecutionLog, FakeTask};

/// A random DAG of `Step(n=i)` tasks under a single `Root`.
///
/// Acyclicity: task i may only depend on tasks 0..i.
#[derive(Debug, Clone)]
struct DagCase {
    deps: Vec<Vec<usize>>,
    failing: HashSet<usize>,
    present: HashSet<usize>,
}

fn dag_case_strategy(max_tasks: usize) -> impl Strategy<Value = DagCase> {
    (1..=max_tasks).prop_flat_map(|num_tasks| {
        (
            proptest::collection::vec(
                proptest::collection::vec(any::<usize>(), 0..num_tasks),
                num_tasks,
            ),
            proptest::collection::hash_set(0..num_tasks, 0..3),
            proptest::collection::hash_set(0..num_tasks, 0..3),
        )
            .prop_map(|(raw_deps, failing, present)| {
                let deps = raw_deps
                    .into_iter()
                    .enumerate()
                    .map(|(i, potential)| {
                        let mut valid: Vec<usize> = potential
                            .into_iter()
                            .filter(|_| i > 0)
                            .map(|d| d % i.max(1))
                            .collect();
                        valid.sort();
                        valid.dedup();
                        valid
                    })
                    .collect();
                DagCase {
                    deps,
                    failing,
                    present,
                }
            })
    })
}

fn build_root(case: &DagCase) -> TaskRef {
    let storage = MemoryStorage::new();
    let log = ExecutionLog::new();

    let mut tasks: Vec<TaskRef> = Vec::with_capacity(case.deps.len());
    for deps in case.deps.iter() {
        let mut builder = FakeTask::builder("Step", &storage, &log).param("n", tasks.len() as i64);
        for &d in deps {
            builder = builder.dep(tasks[d].clone());
        }
        tasks.push(builder.build());
    }

    let mut root = FakeTask::builder("Root", &storage, &log);
    for task in tasks {
        root = root.dep(task);
    }
    root.build()
}

fn index_of(graph: &TaskGraph, node: NodeId) -> Option<usize> {
    let id = graph.id_of(node);
    match id.params().get("n") {
        Some(pipedag::types::ParamValue::Int(n)) => Some(*n as usize),
        _ => None,
    }
}

proptest! {
    #[test]
    fn test_scheduler_respects_dependencies_and_propagates_failure(
        case in dag_case_strategy(10),
    ) {
        let graph = TaskGraph::build(build_root(&case)).unwrap();
        prop_assert_eq!(graph.len(), case.deps.len() + 1);

        let mut scheduler = Scheduler::new(graph);
        scheduler.start();

        let mut ran: HashSet<NodeId> = HashSet::new();
        let mut steps = 0;

        loop {
            steps += 1;
            prop_assert!(steps < 1000, "scheduler did not terminate");

            // Drain the ready queue like a pool with unlimited workers.
            let mut running = Vec::new();
            while let Some(task) = scheduler.next_ready() {
                for dep in scheduler.graph().dependencies_of(task.node) {
                    prop_assert!(scheduler.status_of(*dep).is_complete());
                }
                let present = index_of(scheduler.graph(), task.node)
                    .is_some_and(|i| case.present.contains(&i));
                if present {
                    scheduler.mark_skipped(task.node);
                } else {
                    prop_assert!(ran.insert(task.node), "task ran twice");
                    scheduler.mark_running(task.node);
                    running.push(task.node);
                }
            }

            if running.is_empty() {
                break;
            }

            // Complete in reverse dispatch order.
            for node in running.into_iter().rev() {
                let fails = index_of(scheduler.graph(), node)
                    .is_some_and(|i| case.failing.contains(&i));
                let outcome = if fails {
                    TaskOutcome::Failed(format!("step {node:?} failed"))
                } else {
                    TaskOutcome::Success
                };
                scheduler.handle_completion(node, outcome);
            }
        }

        prop_assert!(scheduler.is_finished());

        let graph = scheduler.graph();
        for &node in graph.topological_order() {
            let status = scheduler.status_of(node);
            prop_assert!(status.is_terminal());

            let dep_failed = graph
                .dependencies_of(node)
                .iter()
                .any(|d| scheduler.status_of(*d) == TaskStatus::Failed);
            if dep_failed {
                prop_assert_eq!(status, TaskStatus::Failed);
                prop_assert!(!ran.contains(&node), "task with failed dependency ran");
            }
        }

        let summary = scheduler.summary(false);
        prop_assert_eq!(summary.success, scheduler.root_status().is_complete());
        for failure in summary.failures.iter() {
            let node = graph.node_of(&failure.task).unwrap();
            prop_assert!(ran.contains(&node));
        }
    }
}
