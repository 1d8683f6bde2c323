// src/exec/command.rs

//! Config-defined task bodies: one shell command per task.

use std::fmt;
use std::fs;
use std::io::Write;
use std::process::{Command, Stdio};

use anyhow::{Context, bail};
use tracing::{debug, info, warn};

use crate::catalog::TaskCatalog;
use crate::config::template;
use crate::errors::{PipedagError, Result};
use crate::pipeline::Pipeline;
use crate::target::Target;
use crate::task::{Task, TaskRef};
use crate::types::Params;

/// Number of trailing stderr lines carried into a failure message.
const STDERR_TAIL_LINES: usize = 20;

/// A `[task.<Kind>]` instance.
///
/// The command writes its result to the scratch file named by
/// `$PIPEDAG_OUTPUT`; it is published to the task's target only if the
/// command exits with status 0.
#[derive(Clone)]
pub struct CommandTask {
    kind: String,
    params: Params,
    output: Target,
    pipeline: Pipeline,
}

impl CommandTask {
    /// `params` must already be resolved (see [`Pipeline::resolve_params`]).
    pub fn new(pipeline: Pipeline, kind: impl Into<String>, params: Params) -> Result<Self> {
        let kind = kind.into();
        let output = pipeline.target_for(&kind, &params)?;
        Ok(Self {
            kind,
            params,
            output,
            pipeline,
        })
    }

    /// Command line with placeholders substituted.
    pub fn command_line(&self) -> Result<String> {
        let def = self.pipeline.definition(&self.kind)?;
        template::render(&def.cmd, &self.params).map_err(|name| PipedagError::InvalidParams {
            kind: self.kind.clone(),
            message: format!("command references missing parameter '{name}'"),
        })
    }

    fn shell(cmdline: &str) -> Command {
        if cfg!(windows) {
            let mut c = Command::new("cmd");
            c.arg("/C").arg(cmdline);
            c
        } else {
            let mut c = Command::new("sh");
            c.arg("-c").arg(cmdline);
            c
        }
    }
}

impl Task for CommandTask {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn dependencies(&self) -> Result<Vec<TaskRef>> {
        let def = self.pipeline.definition(&self.kind)?;
        def.requires
            .iter()
            .map(|req| {
                let child = self.pipeline.requirement_params(req, &self.params)?;
                self.pipeline.task(&req.kind, &child)
            })
            .collect()
    }

    fn output(&self) -> Target {
        self.output.clone()
    }

    fn execute(&self, inputs: &[Target]) -> anyhow::Result<()> {
        let cmdline = self.command_line()?;

        let scratch = tempfile::Builder::new()
            .prefix("pipedag-out-")
            .tempfile()
            .context("creating scratch output file")?;

        let mut cmd = Self::shell(&cmdline);
        cmd.current_dir(self.pipeline.base_dir())
            .stdin(Stdio::null())
            .env("PIPEDAG_TASK", &self.kind)
            .env("PIPEDAG_OUTPUT", scratch.path());

        for (name, value) in self.params.iter() {
            cmd.env(format!("PIPEDAG_PARAM_{}", name.to_ascii_uppercase()), value.to_string());
        }

        // Copies of non-local inputs; removed when the command is done.
        let mut copies = Vec::new();
        let mut input_paths = Vec::with_capacity(inputs.len());
        for (i, input) in inputs.iter().enumerate() {
            let path = match input.local_path() {
                Some(path) => path,
                None => {
                    let mut copy = tempfile::Builder::new()
                        .prefix("pipedag-in-")
                        .tempfile()
                        .context("creating scratch input file")?;
                    copy.write_all(&input.read_bytes()?)?;
                    copy.flush()?;
                    let path = copy.path().to_path_buf();
                    copies.push(copy);
                    path
                }
            };
            cmd.env(format!("PIPEDAG_INPUT_{i}"), &path);
            input_paths.push(path.display().to_string());
        }
        cmd.env("PIPEDAG_INPUTS", input_paths.join("\n"));

        info!(task = %self.kind, cmd = %cmdline, "running command");
        let output = cmd
            .output()
            .with_context(|| format!("spawning command for task '{}'", self.kind))?;
        drop(copies);

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            debug!(task = %self.kind, "stdout: {}", line);
        }
        let stderr = String::from_utf8_lossy(&output.stderr);
        for line in stderr.lines() {
            debug!(task = %self.kind, "stderr: {}", line);
        }

        if !output.status.success() {
            let code = output.status.code().unwrap_or(-1);
            let lines: Vec<&str> = stderr.lines().collect();
            let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n");
            if tail.is_empty() {
                bail!("command exited with status {code}");
            }
            bail!("command exited with status {code}: {tail}");
        }

        let content = fs::read(scratch.path()).context("reading scratch output file")?;
        if content.is_empty() {
            warn!(task = %self.kind, "command produced an empty output");
        }

        let mut writer = self.output.open_write()?;
        writer.write_all(&content)?;
        writer.commit()?;
        Ok(())
    }
}

impl fmt::Debug for CommandTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CommandTask")
            .field("kind", &self.kind)
            .field("params", &self.params)
            .field("output", &self.output.location())
            .finish()
    }
}
