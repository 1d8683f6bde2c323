#![allow(dead_code)]

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::bail;
use pipedag::errors::Result;
use pipedag::storage::MemoryStorage;
use pipedag::target::Target;
use pipedag::task::{Task, TaskId, TaskRef};
use pipedag::types::{ParamValue, Params};

/// What a [`FakeTask`] does when executed.
#[derive(Debug, Clone)]
pub enum Behaviour {
    /// Publish `"<id>"` followed by the contents of every input.
    Succeed,
    /// Return an error with this message without publishing.
    Fail(String),
    /// Write some bytes, then fail before committing.
    PartialWrite,
    /// Panic inside the body.
    Panic,
    /// Return `Ok(())` without publishing anything.
    ForgetToPublish,
}

/// Shared record of task executions across one or more runs.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog {
    executed: Arc<Mutex<Vec<TaskId>>>,
    active: Arc<AtomicUsize>,
    max_active: Arc<AtomicUsize>,
}

impl ExecutionLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Task ids in the order their bodies started.
    pub fn executed(&self) -> Vec<TaskId> {
        self.executed.lock().unwrap().clone()
    }

    /// Kinds in the order their bodies started.
    pub fn kinds(&self) -> Vec<String> {
        self.executed()
            .iter()
            .map(|id| id.kind().to_string())
            .collect()
    }

    pub fn count_of_kind(&self, kind: &str) -> usize {
        self.executed().iter().filter(|id| id.kind() == kind).count()
    }

    pub fn len(&self) -> usize {
        self.executed.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Highest number of bodies observed running at the same time.
    pub fn max_concurrency(&self) -> usize {
        self.max_active.load(Ordering::SeqCst)
    }

    pub fn clear(&self) {
        self.executed.lock().unwrap().clear();
    }

    fn enter(&self, id: TaskId) {
        self.executed.lock().unwrap().push(id);
        let now = self.active.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_active.fetch_max(now, Ordering::SeqCst);
    }

    fn exit(&self) {
        self.active.fetch_sub(1, Ordering::SeqCst);
    }
}

/// In-memory task with scripted behaviour, for driving the engine in tests.
#[derive(Debug)]
pub struct FakeTask {
    kind: String,
    params: Params,
    deps: Vec<TaskRef>,
    storage: MemoryStorage,
    behaviour: Behaviour,
    log: ExecutionLog,
    delay: Option<Duration>,
    gate: Option<Arc<Barrier>>,
}

impl FakeTask {
    pub fn builder(kind: &str, storage: &MemoryStorage, log: &ExecutionLog) -> FakeTaskBuilder {
        FakeTaskBuilder {
            task: FakeTask {
                kind: kind.to_string(),
                params: Params::new(),
                deps: Vec::new(),
                storage: storage.clone(),
                behaviour: Behaviour::Succeed,
                log: log.clone(),
                delay: None,
                gate: None,
            },
        }
    }

    /// Location a fake task with this id publishes to.
    pub fn location_of(id: &TaskId) -> String {
        id.to_string()
    }
}

pub struct FakeTaskBuilder {
    task: FakeTask,
}

impl FakeTaskBuilder {
    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.task.params.insert(name, value);
        self
    }

    pub fn dep(mut self, dep: TaskRef) -> Self {
        self.task.deps.push(dep);
        self
    }

    pub fn behaviour(mut self, behaviour: Behaviour) -> Self {
        self.task.behaviour = behaviour;
        self
    }

    pub fn fail(self, message: &str) -> Self {
        self.behaviour(Behaviour::Fail(message.to_string()))
    }

    /// Sleep this long inside the body.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.task.delay = Some(delay);
        self
    }

    /// Wait on `barrier` inside the body.
    pub fn gate(mut self, barrier: Arc<Barrier>) -> Self {
        self.task.gate = Some(barrier);
        self
    }

    pub fn build(self) -> TaskRef {
        Arc::new(self.task)
    }
}

impl Task for FakeTask {
    fn kind(&self) -> &str {
        &self.kind
    }

    fn params(&self) -> &Params {
        &self.params
    }

    fn dependencies(&self) -> Result<Vec<TaskRef>> {
        Ok(self.deps.clone())
    }

    fn output(&self) -> Target {
        Target::new(
            FakeTask::location_of(&self.id()),
            Arc::new(self.storage.clone()),
        )
    }

    fn execute(&self, inputs: &[Target]) -> anyhow::Result<()> {
        self.log.enter(self.id());
        let result = self.run_body(inputs);
        self.log.exit();
        result
    }
}

impl FakeTask {
    fn run_body(&self, inputs: &[Target]) -> anyhow::Result<()> {
        if let Some(gate) = &self.gate {
            gate.wait();
        }
        if let Some(delay) = self.delay {
            thread::sleep(delay);
        }

        match &self.behaviour {
            Behaviour::Succeed => {
                let mut writer = self.output().open_write()?;
                write!(writer, "{}", self.id())?;
                for input in inputs {
                    writer.write_all(b"\n")?;
                    writer.write_all(&input.read_bytes()?)?;
                }
                writer.commit()?;
                Ok(())
            }
            Behaviour::Fail(message) => bail!("{message}"),
            Behaviour::PartialWrite => {
                let mut writer = self.output().open_write()?;
                writer.write_all(b"half of the artifact")?;
                bail!("writer interrupted before commit")
            }
            Behaviour::Panic => panic!("fake task {} panicked", self.id()),
            Behaviour::ForgetToPublish => Ok(()),
        }
    }
}
