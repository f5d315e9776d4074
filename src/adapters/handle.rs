//! # Adapter task handle: one token, one task, one join.
//!
//! [`AdapterHandle`] pairs a background task with the [`CancellationToken`]
//! it owns. Stopping cancels the token and waits for the task to return —
//! the join is mandatory, so no task outlives its owner. A second stop call
//! finds the handle already taken and is a no-op: no deadlock, no
//! double-join.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Owns one background task and its cancellation token.
pub struct AdapterHandle {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl AdapterHandle {
    /// Spawns the task, handing it a fresh token.
    ///
    /// The factory receives the token the handle will later cancel; the task
    /// is expected to observe it at its suspension points and exit promptly.
    pub fn spawn<F, Fut>(factory: F) -> Self
    where
        F: FnOnce(CancellationToken) -> Fut,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(factory(token.clone()));
        Self {
            token,
            task: Some(task),
        }
    }

    /// Cancels the token and joins the task.
    ///
    /// Blocks the caller until the task observes cancellation and returns.
    /// Idempotent: a second call on an already-stopped handle does nothing.
    pub async fn stop(&mut self) {
        self.token.cancel();
        self.join().await;
    }

    /// Joins the task without cancelling it.
    ///
    /// Used when the task is expected to finish on its own (e.g. a consumer
    /// draining a closed bus). Idempotent like [`stop`](Self::stop).
    pub async fn join(&mut self) {
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                // A panic inside the task; the process is shutting down
                // anyway, so record it and move on.
                warn!(error = %e, "adapter task join failed");
            }
        }
    }

    /// True once the task has returned (joined or finished on its own).
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}
