//! Tokio-backed scheduler.
//!
//! Each scheduled fire is a Tokio task that sleeps for the delay and then
//! runs the limiter's timer callback. Cancelling aborts the task.

use crate::application::ports::{Scheduler, Task, TimerHandle};
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::AbortHandle;

/// Scheduler spawning timer tasks on a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
}

impl TokioScheduler {
    /// Create a scheduler on the given runtime.
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Create a scheduler on the runtime the caller is running in.
    ///
    /// Returns `None` outside of a Tokio runtime.
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl Scheduler for TokioScheduler {
    fn schedule_after(&self, delay: Duration, task: Task) -> Box<dyn TimerHandle> {
        let join = self.handle.spawn(async move {
            tokio::time::sleep(delay).await;
            task();
        });

        Box::new(TokioTimerHandle {
            abort: join.abort_handle(),
        })
    }
}

#[derive(Debug)]
struct TokioTimerHandle {
    abort: AbortHandle,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.abort.abort();
    }
}
