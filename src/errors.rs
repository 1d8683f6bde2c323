// src/errors.rs

//! Crate-wide error type and result alias.

use thiserror::Error;

use crate::task::TaskId;

#[derive(Error, Debug)]
pub enum PipedagError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error("Unknown task kind: {0}")]
    UnknownTaskKind(String),

    #[error("Invalid parameters for task '{kind}': {message}")]
    InvalidParams { kind: String, message: String },

    /// Structural error: a task transitively depends on itself.
    ///
    /// `cycle` starts and ends with the same task.
    #[error("Cyclic dependency: {}", format_cycle(.cycle))]
    CyclicDependency { cycle: Vec<TaskId> },

    /// A target was opened for reading before it was published.
    #[error("Target not found: {0}")]
    TargetNotFound(String),

    /// A writer failed before its artifact could be published. The target is
    /// left absent.
    #[error("Partial write to target '{location}': {message}")]
    PartialWrite { location: String, message: String },

    #[error("Task {task} failed: {message}")]
    Execution { task: TaskId, message: String },

    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

fn format_cycle(cycle: &[TaskId]) -> String {
    cycle
        .iter()
        .map(|id| id.to_string())
        .collect::<Vec<_>>()
        .join(" -> ")
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, PipedagError>;
