//! Redis Pub/Sub change feed.
//!
//! Listens on the table channels and rebroadcasts decoded change events to
//! in-process receivers (the realtime bridge).

use std::time::Duration;

use futures_util::StreamExt;
use redis::aio::PubSub;
use redis::Client;
use study_common::RedisConfig;
use study_core::events::ChangeEvent;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::realtime::RealtimeChannel;

/// Error type for subscriber operations
#[derive(Debug, thiserror::Error)]
pub enum SubscriberError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),
}

/// Result type for subscriber operations
pub type SubscriberResult<T> = Result<T, SubscriberError>;

/// One message taken off a table channel
#[derive(Debug, Clone)]
pub struct ReceivedChange {
    pub channel: RealtimeChannel,
    /// `None` when the payload is not a change event
    pub event: Option<ChangeEvent>,
    pub payload: String,
}

impl ReceivedChange {
    fn from_redis(channel_name: &str, payload: String) -> Self {
        let event = serde_json::from_str::<ChangeEvent>(&payload)
            .map_err(|e| {
                tracing::warn!(channel = %channel_name, error = %e, "Dropping undecodable change event");
            })
            .ok();

        Self {
            channel: RealtimeChannel::parse(channel_name),
            event,
            payload,
        }
    }
}

/// Anything a change feed can deliver
pub trait ChangeSource: Clone + Send + 'static {
    fn into_change(self) -> Option<ChangeEvent>;
}

impl ChangeSource for ChangeEvent {
    fn into_change(self) -> Option<ChangeEvent> {
        Some(self)
    }
}

impl ChangeSource for ReceivedChange {
    fn into_change(self) -> Option<ChangeEvent> {
        self.event
    }
}

/// Where to listen and how to recover
#[derive(Debug, Clone)]
pub struct SubscriberConfig {
    pub redis_url: String,
    pub channels: Vec<RealtimeChannel>,
    pub broadcast_buffer: usize,
    pub reconnect_delay: Duration,
}

impl SubscriberConfig {
    /// Every table the invite flow depends on
    pub fn invite_tables(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            channels: RealtimeChannel::invite_tables(),
            broadcast_buffer: 1024,
            reconnect_delay: Duration::from_secs(1),
        }
    }
}

impl From<&RedisConfig> for SubscriberConfig {
    fn from(config: &RedisConfig) -> Self {
        Self::invite_tables(config.url.clone())
    }
}

/// Background Redis listener. Dropping it stops the listener.
#[derive(Debug)]
pub struct Subscriber {
    tx: broadcast::Sender<ReceivedChange>,
    task: JoinHandle<()>,
}

impl Subscriber {
    /// Subscribe to the configured channels, then keep listening in the
    /// background, reconnecting after `reconnect_delay` when the stream ends.
    ///
    /// The first connection is made before returning, so an unreachable
    /// server is reported here and nothing published afterwards is missed.
    pub async fn connect(config: SubscriberConfig) -> SubscriberResult<Self> {
        let client = Client::open(config.redis_url.as_str())?;
        let pubsub = open(&client, &config.channels).await?;

        let (tx, _) = broadcast::channel(config.broadcast_buffer.max(1));
        let task = tokio::spawn(listen(client, pubsub, config, tx.clone()));
        Ok(Self { tx, task })
    }

    /// Receive every change delivered after this call
    #[must_use]
    pub fn receiver(&self) -> broadcast::Receiver<ReceivedChange> {
        self.tx.subscribe()
    }
}

impl Drop for Subscriber {
    fn drop(&mut self) {
        self.task.abort();
    }
}

async fn open(client: &Client, channels: &[RealtimeChannel]) -> SubscriberResult<PubSub> {
    let mut pubsub = client.get_async_pubsub().await?;
    for channel in channels {
        pubsub.subscribe(channel.name()).await?;
    }
    tracing::info!(channels = channels.len(), "Subscribed to change channels");
    Ok(pubsub)
}

async fn listen(
    client: Client,
    mut pubsub: PubSub,
    config: SubscriberConfig,
    tx: broadcast::Sender<ReceivedChange>,
) {
    loop {
        let mut messages = pubsub.into_on_message();
        while let Some(msg) = messages.next().await {
            let channel = msg.get_channel_name().to_string();
            match msg.get_payload::<String>() {
                Ok(payload) => {
                    // No receivers is fine
                    let _ = tx.send(ReceivedChange::from_redis(&channel, payload));
                    tracing::trace!(channel = %channel, "Received change event");
                }
                Err(e) => tracing::warn!(channel = %channel, error = %e, "Non-text payload"),
            }
        }

        tracing::warn!("Pub/Sub stream ended, reconnecting");
        pubsub = loop {
            tokio::time::sleep(config.reconnect_delay).await;
            match open(&client, &config.channels).await {
                Ok(pubsub) => break pubsub,
                Err(e) => tracing::error!(error = %e, "Redis reconnect failed"),
            }
        };
    }
}
