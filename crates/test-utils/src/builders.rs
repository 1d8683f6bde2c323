#![allow(dead_code)]

use std::collections::BTreeMap;

use pipedag::config::{ConfigFile, ConfigSection, RawConfigFile, Requirement, TaskConfig};
use pipedag::errors::Result;
use pipedag::types::{ParamValue, Params};

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile {
                config: ConfigSection::default(),
                task: BTreeMap::new(),
            },
        }
    }

    pub fn with_task(mut self, kind: &str, task: TaskConfig) -> Self {
        self.config.task.insert(kind.to_string(), task);
        self
    }

    pub fn workers(mut self, workers: usize) -> Self {
        self.config.config.workers = workers;
        self
    }

    pub fn target_root(mut self, root: &str) -> Self {
        self.config.config.target_root = root.to_string();
        self
    }

    pub fn raw(self) -> RawConfigFile {
        self.config
    }

    pub fn try_build(self) -> Result<ConfigFile> {
        ConfigFile::try_from(self.config)
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Builder for `TaskConfig`.
pub struct TaskConfigBuilder {
    task: TaskConfig,
}

impl TaskConfigBuilder {
    pub fn new(cmd: &str) -> Self {
        Self {
            task: TaskConfig {
                cmd: cmd.to_string(),
                description: None,
                params: vec![],
                defaults: Params::new(),
                output: None,
                requires: vec![],
            },
        }
    }

    pub fn param(mut self, name: &str) -> Self {
        self.task.params.push(name.to_string());
        self
    }

    pub fn default_value(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.task.defaults.insert(name, value);
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.task.description = Some(text.to_string());
        self
    }

    pub fn output(mut self, template: &str) -> Self {
        self.task.output = Some(template.to_string());
        self
    }

    /// Depend on `kind`, forwarding the named parameters.
    pub fn requires(self, kind: &str, pass: &[&str]) -> Self {
        self.requires_with(kind, pass, Params::new())
    }

    /// Depend on `kind`, forwarding `pass` and fixing `params`.
    pub fn requires_with(mut self, kind: &str, pass: &[&str], params: Params) -> Self {
        self.task.requires.push(Requirement {
            kind: kind.to_string(),
            pass: pass.iter().map(|s| s.to_string()).collect(),
            params,
        });
        self
    }

    pub fn build(self) -> TaskConfig {
        self.task
    }
}
