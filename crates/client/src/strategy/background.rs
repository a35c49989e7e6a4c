//! Detached cache writes.
//!
//! Writes spawned here run on the runtime independently of the response that
//! triggered them. The set is owned by the worker, not by any one request, so
//! a caller returning early never cancels a pending write.

use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::task::JoinSet;

/// Tracked set of fire-and-forget tasks.
#[derive(Clone, Default)]
pub struct BackgroundWrites {
    tasks: Arc<Mutex<JoinSet<()>>>,
}

impl BackgroundWrites {
    pub fn new() -> Self {
        Self::default()
    }

    /// Spawn `task` without waiting for it.
    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut tasks = self.tasks.lock().unwrap_or_else(PoisonError::into_inner);
        while tasks.try_join_next().is_some() {}
        tasks.spawn(task);
    }

    /// Number of tasks spawned and not yet reaped.
    pub fn pending(&self) -> usize {
        self.tasks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Wait until every task spawned so far, and any task they spawn, has finished.
    pub async fn settle(&self) {
        loop {
            let mut batch = std::mem::take(&mut *self.tasks.lock().unwrap_or_else(PoisonError::into_inner));
            if batch.is_empty() {
                return;
            }
            while let Some(result) = batch.join_next().await {
                if let Err(e) = result {
                    tracing::warn!(error = %e, "background cache write panicked or was cancelled");
                }
            }
        }
    }
}

impl std::fmt::Debug for BackgroundWrites {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWrites").field("pending", &self.pending()).finish()
    }
}
