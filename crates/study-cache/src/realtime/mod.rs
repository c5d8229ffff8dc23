//! Realtime change feed.
//!
//! Row changes travel either through Redis Pub/Sub (one channel per table)
//! or through an in-process broadcast feed.

mod channels;
mod local;
mod publisher;
mod subscriber;

pub use channels::{RealtimeChannel, CHANNEL_PREFIX, TABLE_CHANNEL_PREFIX};
pub use local::LocalFeed;
pub use publisher::RedisChangePublisher;
pub use subscriber::{
    ChangeSource, ReceivedChange, Subscriber, SubscriberConfig, SubscriberError, SubscriberResult,
};
