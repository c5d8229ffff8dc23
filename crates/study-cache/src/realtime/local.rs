//! In-process change feed

use async_trait::async_trait;
use study_core::events::ChangeEvent;
use study_core::traits::{ChangePublisher, RepoResult};
use tokio::sync::broadcast;

/// Broadcast feed for running without Redis (single process, tests)
#[derive(Debug, Clone)]
pub struct LocalFeed {
    tx: broadcast::Sender<ChangeEvent>,
}

impl LocalFeed {
    #[must_use]
    pub fn new(buffer: usize) -> Self {
        let (tx, _) = broadcast::channel(buffer.max(1));
        Self { tx }
    }

    /// Receive every event published after this call
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }
}

impl Default for LocalFeed {
    fn default() -> Self {
        Self::new(256)
    }
}

#[async_trait]
impl ChangePublisher for LocalFeed {
    async fn publish(&self, event: ChangeEvent) -> RepoResult<()> {
        // No receivers is not an error
        let receivers = self.tx.send(event).unwrap_or(0);
        tracing::trace!(receivers, "Published change event locally");
        Ok(())
    }
}
