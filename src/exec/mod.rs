// src/exec/mod.rs

//! Task body execution.
//!
//! - [`task_runner`] runs one task body off the async runtime and turns
//!   its result (or panic) into a [`TaskOutcome`](crate::engine::TaskOutcome).
//! - [`command`] provides [`CommandTask`], the task type behind
//!   config-defined pipelines, which runs a shell command per task.

pub mod command;
pub mod task_runner;

pub use command::CommandTask;
pub use task_runner::run_task;
