//! Execution boundary for completion work.
//!
//! Completion callbacks arrive on the transport's event loop. Decoding the
//! body and trailers is moved onto an [`Executor`] so a slow decode never
//! stalls other calls sharing the connection.

use tokio::runtime::{Handle, TryCurrentError};
use tracing::trace;

/// A unit of completion work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Worker pool on which completion work is scheduled.
pub trait Executor: Send + Sync {
    /// Schedule `task` to run on a worker. Must not run it inline.
    fn execute(&self, task: Task);
}

/// Executor backed by the blocking pool of a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    /// Use the runtime behind `handle`
    #[must_use]
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Use the runtime the caller is running on
    ///
    /// # Errors
    /// Returns error when called outside a tokio runtime
    pub fn current() -> Result<Self, TryCurrentError> {
        Handle::try_current().map(Self::new)
    }
}

impl Executor for TokioExecutor {
    fn execute(&self, task: Task) {
        trace!("scheduling completion task");
        drop(self.handle.spawn_blocking(task));
    }
}
