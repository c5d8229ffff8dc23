//! Outbound side of the realtime change feed

use async_trait::async_trait;

use crate::events::ChangeEvent;
use crate::traits::RepoResult;

/// Publishes committed row changes to subscribers
#[async_trait]
pub trait ChangePublisher: Send + Sync {
    async fn publish(&self, event: ChangeEvent) -> RepoResult<()>;
}
