// src/config/model.rs

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::types::Params;

/// Configuration as read from a TOML file, before validation.
///
/// ```toml
/// [config]
/// workers = 2
/// target_root = "build/targets"
///
/// [task.Preprocess]
/// cmd = "tr a-z A-Z < \"$PIPEDAG_INPUT_0\" > \"$PIPEDAG_OUTPUT\""
/// params = ["data"]
/// output = "preprocess/{data}.txt"
/// requires = [{ kind = "Ingest", pass = ["data"] }]
///
/// [task.Ingest]
/// cmd = "echo {data} > \"$PIPEDAG_OUTPUT\""
/// params = ["data"]
/// ```
///
/// All sections except `[task.<Kind>]` are optional.
#[derive(Debug, Clone, Deserialize)]
pub struct RawConfigFile {
    /// Global settings from `[config]`.
    #[serde(default)]
    pub config: ConfigSection,

    /// Task definitions from `[task.<Kind>]`, keyed by kind.
    #[serde(default)]
    pub task: BTreeMap<String, TaskConfig>,
}

/// Validated configuration.
///
/// Only obtainable through `ConfigFile::try_from(RawConfigFile)`, which runs
/// [`validate`](crate::config::validate).
#[derive(Debug, Clone)]
pub struct ConfigFile {
    config: ConfigSection,
    task: BTreeMap<String, TaskConfig>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(config: ConfigSection, task: BTreeMap<String, TaskConfig>) -> Self {
        Self { config, task }
    }

    pub fn config(&self) -> &ConfigSection {
        &self.config
    }

    pub fn tasks(&self) -> &BTreeMap<String, TaskConfig> {
        &self.task
    }

    pub fn task(&self, kind: &str) -> Option<&TaskConfig> {
        self.task.get(kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.task.keys().map(|k| k.as_str())
    }
}

/// `[config]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigSection {
    /// Size of the worker pool. 1 means fully sequential.
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Directory holding published targets, relative to the config file.
    #[serde(default = "default_target_root")]
    pub target_root: String,
}

fn default_workers() -> usize {
    1
}

fn default_target_root() -> String {
    ".pipedag/targets".to_string()
}

impl Default for ConfigSection {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            target_root: default_target_root(),
        }
    }
}

/// `[task.<Kind>]` section.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskConfig {
    /// Shell command; `{name}` is replaced by the parameter's value.
    pub cmd: String,

    /// Free-form description shown by `--list`.
    #[serde(default)]
    pub description: Option<String>,

    /// Declared parameter names. A task instance must have exactly these.
    #[serde(default)]
    pub params: Vec<String>,

    /// Defaults for declared parameters (`[task.<Kind>.defaults]`).
    #[serde(default)]
    pub defaults: Params,

    /// Output location template, relative to `target_root`.
    ///
    /// If `None`, the location is `<Kind>/<Kind>-<digest>` where the digest
    /// is derived from the parameters.
    #[serde(default)]
    pub output: Option<String>,

    /// Upstream tasks, in input order.
    #[serde(default)]
    pub requires: Vec<Requirement>,
}

/// One entry of `requires = [...]`.
///
/// The dependency's parameters are built explicitly: the names in `pass` are
/// copied from the requiring task, then `params` adds fixed values. Anything
/// left unset falls back to the dependency's own defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Requirement {
    pub kind: String,

    #[serde(default)]
    pub pass: Vec<String>,

    #[serde(default)]
    pub params: Params,
}
