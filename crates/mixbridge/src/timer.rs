//! Cancellable one-shot timers

use std::time::Duration;
use tokio::task::AbortHandle;

/// Handle to a scheduled callback.
///
/// Dropping the handle leaves the timer running; only `cancel` stops it.
#[derive(Debug)]
pub struct TimerHandle {
    abort: AbortHandle,
}

impl TimerHandle {
    /// Run `callback` once after `delay`. Must be called inside a tokio runtime.
    pub fn schedule<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Self {
            abort: task.abort_handle(),
        }
    }

    pub fn cancel(&self) {
        self.abort.abort();
    }

    pub fn is_finished(&self) -> bool {
        self.abort.is_finished()
    }
}
