//! Cancelable one-shot delayed tasks.

use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, DropGuard};

/// A callback that runs once after a delay unless canceled first.
///
/// Dropping the handle cancels the task, so whoever owns it bounds its
/// lifetime. Must be created inside a tokio runtime.
#[derive(Debug)]
pub struct ScheduledTask {
    handle: JoinHandle<()>,
    cancel: DropGuard,
}

impl ScheduledTask {
    pub fn after<F>(delay: Duration, callback: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let cancel = CancellationToken::new();
        let token = cancel.clone();

        let handle = tokio::spawn(async move {
            let fired = tokio::select! {
                biased;
                () = token.cancelled() => false,
                () = tokio::time::sleep(delay) => true,
            };
            if fired {
                callback();
            }
        });

        Self {
            handle,
            cancel: cancel.drop_guard(),
        }
    }

    /// True once the callback ran or the task was canceled.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Cancels the task. Equivalent to dropping it.
    pub fn cancel(self) {
        drop(self);
    }

    /// Waits for the callback to run (or be canceled elsewhere).
    pub async fn wait(self) {
        let Self { handle, cancel } = self;
        if let Err(err) = handle.await {
            tracing::debug!(error = %err, "scheduled task ended abnormally");
        }
        drop(cancel);
    }
}
