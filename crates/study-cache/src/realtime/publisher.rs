//! Redis Pub/Sub publisher for row change events.

use async_trait::async_trait;
use redis::AsyncCommands;
use study_core::events::ChangeEvent;
use study_core::traits::{ChangePublisher, RepoResult};

use crate::pool::{RedisPool, RedisResult};
use crate::realtime::RealtimeChannel;

/// Publishes change events to the table's Redis channel
#[derive(Clone)]
pub struct RedisChangePublisher {
    pool: RedisPool,
}

impl RedisChangePublisher {
    /// Create a new publisher
    #[must_use]
    pub fn new(pool: RedisPool) -> Self {
        Self { pool }
    }

    /// Publish an event, returning the number of receivers
    pub async fn publish_event(&self, event: &ChangeEvent) -> RedisResult<u32> {
        let mut conn = self.pool.get().await?;
        let channel_name = RealtimeChannel::table(event.table.clone()).name();
        let payload = serde_json::to_string(event)?;

        let receivers: u32 = conn.publish(&channel_name, &payload).await?;

        tracing::debug!(
            channel = %channel_name,
            event_type = %event.event_type(),
            receivers = receivers,
            "Published change event"
        );

        Ok(receivers)
    }
}

#[async_trait]
impl ChangePublisher for RedisChangePublisher {
    async fn publish(&self, event: ChangeEvent) -> RepoResult<()> {
        self.publish_event(&event).await?;
        Ok(())
    }
}
