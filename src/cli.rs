// src/cli.rs

//! CLI argument parsing using `clap`.

use std::num::NonZeroUsize;

use clap::{Parser, ValueEnum};

use crate::types::{ParamValue, parse_param};

/// Command-line arguments for `pipedag`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "pipedag",
    version,
    about = "Run parameterised tasks in dependency order, skipping work whose output already exists.",
    long_about = None
)]
pub struct CliArgs {
    /// Root task kind to run (a `[task.<Kind>]` section of the config).
    #[arg(value_name = "TASK", required_unless_present = "list")]
    pub task: Option<String>,

    /// Path to the config file (TOML).
    ///
    /// Default: `Pipedag.toml` in the current working directory.
    #[arg(long, value_name = "PATH", default_value = "Pipedag.toml")]
    pub config: String,

    /// Parameter of the root task; may be repeated.
    #[arg(
        short = 'p',
        long = "param",
        value_name = "KEY=VALUE",
        value_parser = parse_param
    )]
    pub params: Vec<(String, ParamValue)>,

    /// Worker pool size (at least 1). Overrides `[config].workers`.
    #[arg(short = 'w', long, value_name = "N")]
    pub workers: Option<NonZeroUsize>,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `PIPEDAG_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Build the dependency graph and print the plan, but don't execute
    /// anything.
    #[arg(long)]
    pub dry_run: bool,

    /// List the task kinds defined in the config and exit.
    #[arg(long)]
    pub list: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
