use tokio_util::sync::CancellationToken;

/// Run-scoped settings and signals, passed explicitly into the engine.
///
/// There is no process-wide scheduler state; everything one run needs lives
/// here or in the [`Scheduler`](crate::dag::Scheduler) it drives.
#[derive(Debug, Clone)]
pub struct RunContext {
    workers: usize,
    cancel: CancellationToken,
}

impl RunContext {
    /// `workers` is clamped to at least 1 (fully sequential).
    pub fn new(workers: usize) -> Self {
        Self {
            workers: workers.max(1),
            cancel: CancellationToken::new(),
        }
    }

    /// Use an externally owned cancellation token (e.g. wired to Ctrl-C).
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Stop dispatching new tasks. In-flight tasks are awaited.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(1)
    }
}
