//! Publish/subscribe of 5-minute close events (spec.md §4.6). Each listener
//! runs in its own task so a slow or panicking listener cannot block, or
//! take down, the others.

use async_trait::async_trait;
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiveMinCloseEvent {
    pub start: i64,
    pub end: i64,
}

#[async_trait]
pub trait FiveMinCloseListener: Send + Sync {
    async fn on_five_min_close(&self, event: FiveMinCloseEvent);
}

#[derive(Default)]
pub struct EventBus {
    listeners: Vec<Arc<dyn FiveMinCloseListener>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_listener(&mut self, listener: Arc<dyn FiveMinCloseListener>) {
        self.listeners.push(listener);
    }

    /// Invokes every listener concurrently. Listener panics and the futures
    /// themselves never propagate back to the caller; both are logged.
    pub async fn fire(&self, event: FiveMinCloseEvent) {
        let mut tasks = JoinSet::new();
        for listener in &self.listeners {
            let listener = Arc::clone(listener);
            tasks.spawn(async move { listener.on_five_min_close(event).await });
        }

        while let Some(result) = tasks.join_next().await {
            if let Err(join_err) = result {
                error!(error = %join_err, ?event, "FiveMinClose listener panicked");
            }
        }
    }
}
