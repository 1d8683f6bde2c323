// src/config/validate.rs

use std::collections::HashSet;

use petgraph::algo::toposort;
use petgraph::graphmap::DiGraphMap;
use tracing::warn;

use crate::config::model::{ConfigFile, RawConfigFile, TaskConfig};
use crate::config::template::placeholders;
use crate::errors::{PipedagError, Result};

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = crate::errors::PipedagError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.config, raw.task))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    ensure_has_tasks(cfg)?;
    validate_global_config(cfg)?;
    for (kind, task) in cfg.task.iter() {
        validate_task_params(kind, task)?;
        validate_templates(kind, task)?;
        validate_requirements(cfg, kind, task)?;
    }
    warn_on_kind_cycles(cfg);
    Ok(())
}

fn config_error(message: String) -> PipedagError {
    PipedagError::ConfigError(message)
}

fn ensure_has_tasks(cfg: &RawConfigFile) -> Result<()> {
    if cfg.task.is_empty() {
        return Err(config_error(
            "config must contain at least one [task.<Kind>] section".to_string(),
        ));
    }
    Ok(())
}

fn validate_global_config(cfg: &RawConfigFile) -> Result<()> {
    if cfg.config.workers == 0 {
        return Err(config_error(
            "[config].workers must be >= 1 (got 0)".to_string(),
        ));
    }
    if cfg.config.target_root.trim().is_empty() {
        return Err(config_error(
            "[config].target_root must not be empty".to_string(),
        ));
    }
    Ok(())
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn validate_task_params(kind: &str, task: &TaskConfig) -> Result<()> {
    let mut seen = HashSet::new();
    for name in task.params.iter() {
        if !is_identifier(name) {
            return Err(config_error(format!(
                "task '{kind}' declares invalid parameter name '{name}'"
            )));
        }
        if !seen.insert(name.as_str()) {
            return Err(config_error(format!(
                "task '{kind}' declares parameter '{name}' more than once"
            )));
        }
    }

    for name in task.defaults.names() {
        if !seen.contains(name) {
            return Err(config_error(format!(
                "task '{kind}' has a default for undeclared parameter '{name}'"
            )));
        }
    }
    Ok(())
}

fn validate_templates(kind: &str, task: &TaskConfig) -> Result<()> {
    let mut templates = vec![("cmd", task.cmd.as_str())];
    if let Some(output) = task.output.as_deref() {
        if output.trim().is_empty() {
            return Err(config_error(format!("task '{kind}' has an empty `output`")));
        }
        templates.push(("output", output));
    }

    for (field, template) in templates {
        for name in placeholders(template) {
            if !task.params.contains(&name) {
                return Err(config_error(format!(
                    "task '{kind}' uses undeclared parameter '{{{name}}}' in `{field}`"
                )));
            }
        }
    }
    Ok(())
}

fn validate_requirements(cfg: &RawConfigFile, kind: &str, task: &TaskConfig) -> Result<()> {
    for req in task.requires.iter() {
        let Some(upstream) = cfg.task.get(&req.kind) else {
            return Err(config_error(format!(
                "task '{kind}' has unknown requirement '{}' in `requires`",
                req.kind
            )));
        };

        for name in req.pass.iter() {
            if !task.params.contains(name) {
                return Err(config_error(format!(
                    "task '{kind}' passes undeclared parameter '{name}' to '{}'",
                    req.kind
                )));
            }
            if !upstream.params.contains(name) {
                return Err(config_error(format!(
                    "task '{kind}' passes '{name}' to '{}', which does not declare it",
                    req.kind
                )));
            }
        }

        for name in req.params.names() {
            if !upstream.params.iter().any(|p| p == name) {
                return Err(config_error(format!(
                    "task '{kind}' sets parameter '{name}' on '{}', which does not declare it",
                    req.kind
                )));
            }
        }

        for name in upstream.params.iter() {
            let provided = req.pass.contains(name)
                || req.params.contains(name)
                || upstream.defaults.contains(name);
            if !provided {
                return Err(config_error(format!(
                    "task '{kind}' requires '{}' without providing its parameter '{name}'",
                    req.kind
                )));
            }
        }
    }
    Ok(())
}

/// Kind-level cycles are not necessarily instance cycles (fixed parameters
/// can break them), so they are only reported. Instance cycles are rejected
/// when the graph is built.
fn warn_on_kind_cycles(cfg: &RawConfigFile) {
    // Edge direction: upstream -> dependent.
    let mut graph: DiGraphMap<&str, ()> = DiGraphMap::new();

    for kind in cfg.task.keys() {
        graph.add_node(kind.as_str());
    }
    for (kind, task) in cfg.task.iter() {
        for req in task.requires.iter() {
            graph.add_edge(req.kind.as_str(), kind.as_str(), ());
        }
    }

    if let Err(cycle) = toposort(&graph, None) {
        warn!(
            kind = cycle.node_id(),
            "task kinds form a cycle through `requires`; instances must break it with parameters"
        );
    }
}
