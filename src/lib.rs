// src/lib.rs

pub mod catalog;
pub mod cli;
pub mod config;
pub mod dag;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod logging;
pub mod pipeline;
pub mod storage;
pub mod target;
pub mod task;
pub mod types;

pub use catalog::TaskCatalog;
pub use engine::{RunContext, RunSummary, run_pipeline, run_task};
pub use errors::PipedagError;
pub use pipeline::Pipeline;
pub use target::Target;
pub use task::{Task, TaskId, TaskRef};
pub use types::{ParamValue, Params};

use std::num::NonZeroUsize;
use std::path::PathBuf;

use anyhow::{Result, anyhow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cli::CliArgs;
use crate::dag::TaskGraph;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading into a [`Pipeline`]
/// - graph building and the worker-pool runtime
/// - Ctrl-C handling
///
/// Returns whether the root task ended `Done` or `Skipped`. The run report
/// goes to stdout.
pub async fn run(args: CliArgs) -> Result<bool> {
    let config_path = PathBuf::from(&args.config);
    let pipeline = Pipeline::from_config_path(&config_path)?;

    if args.list {
        print_kinds(&pipeline);
        return Ok(true);
    }

    let kind = args
        .task
        .as_deref()
        .ok_or_else(|| anyhow!("no root task given (use --list to see the available kinds)"))?;
    let params: Params = args.params.iter().cloned().collect();
    let workers = args
        .workers
        .map_or(pipeline.config().config().workers, NonZeroUsize::get);

    if args.dry_run {
        let root = pipeline.task(kind, &params)?;
        let graph = TaskGraph::build(root)?;
        print_dry_run(&graph, workers);
        return Ok(true);
    }

    // Ctrl-C → stop dispatching, let running tasks finish.
    let cancel = CancellationToken::new();
    {
        let token = cancel.clone();
        tokio::spawn(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                eprintln!("failed to listen for Ctrl+C: {e}");
                return;
            }
            warn!("Ctrl+C received; waiting for running tasks");
            token.cancel();
        });
    }

    info!(task = kind, params = %params, workers, "starting run");
    let ctx = RunContext::new(workers).with_cancellation(cancel);
    let summary = run_pipeline(&pipeline, kind, &params, ctx).await?;

    println!("{summary}");
    Ok(summary.success)
}

fn print_kinds(pipeline: &Pipeline) {
    println!("tasks ({}):", pipeline.config().tasks().len());
    for (kind, def) in pipeline.config().tasks() {
        if def.params.is_empty() {
            println!("  - {kind}");
        } else {
            println!("  - {kind}({})", def.params.join(", "));
        }
        if let Some(description) = def.description.as_deref() {
            println!("      {description}");
        }
        for req in def.requires.iter() {
            println!("      requires: {}", req.kind);
        }
    }
}

/// Print the execution plan: tasks in the order they would be considered,
/// with their targets and whether each would run or be skipped.
fn print_dry_run(graph: &TaskGraph, workers: usize) {
    println!("pipedag dry-run");
    println!("  workers = {workers}");
    println!();

    println!("plan ({} tasks):", graph.len());
    for &node in graph.topological_order() {
        let task = graph.task(node);
        let output = task.output();
        let action = if output.exists() { "skip" } else { "run" };
        println!("  {action:<4} {}", graph.id_of(node));
        println!("       target: {}", output.location());

        let deps: Vec<String> = graph
            .dependencies_of(node)
            .iter()
            .map(|dep| graph.id_of(*dep).to_string())
            .collect();
        if !deps.is_empty() {
            println!("       after: {}", deps.join(", "));
        }
    }

    debug!("dry-run complete (no execution)");
}
