// src/exec/task_runner.rs

//! Individual task body runner.

use std::any::Any;
use std::time::Instant;

use anyhow::bail;
use tracing::{error, info};

use crate::dag::graph::NodeId;
use crate::dag::ScheduledTask;
use crate::engine::TaskOutcome;
use crate::target::Target;
use crate::task::Task;

/// Run a single task body and report its outcome.
///
/// The body runs on Tokio's blocking pool: step bodies are free to block on
/// external IO. A panic inside the body is turned into a failure rather
/// than tearing down the run.
pub async fn run_task(scheduled: ScheduledTask) -> (NodeId, TaskOutcome) {
    let ScheduledTask {
        node,
        id,
        task,
        inputs,
    } = scheduled;

    info!(task = %id, inputs = inputs.len(), "starting task");
    let started = Instant::now();

    let joined = tokio::task::spawn_blocking(move || execute_and_verify(task.as_ref(), &inputs)).await;

    let outcome = match joined {
        Ok(Ok(())) => TaskOutcome::Success,
        Ok(Err(err)) => TaskOutcome::Failed(format!("{err:#}")),
        Err(join_err) if join_err.is_panic() => {
            let payload = join_err.into_panic();
            TaskOutcome::Failed(format!("task body panicked: {}", panic_message(&*payload)))
        }
        Err(join_err) => TaskOutcome::Failed(format!("task body did not complete: {join_err}")),
    };

    let elapsed_ms = started.elapsed().as_millis() as u64;
    match &outcome {
        TaskOutcome::Success => info!(task = %id, elapsed_ms, "task finished"),
        TaskOutcome::Failed(message) => {
            error!(task = %id, elapsed_ms, error = %message, "task failed")
        }
    }

    (node, outcome)
}

/// Run the body, then insist that it actually published its target.
fn execute_and_verify(task: &dyn Task, inputs: &[Target]) -> anyhow::Result<()> {
    task.execute(inputs)?;

    let output = task.output();
    if !output.exists() {
        bail!(
            "task finished without publishing its target '{}'",
            output.location()
        );
    }
    Ok(())
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
