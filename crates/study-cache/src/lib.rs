//! # study-cache
//!
//! Client-side cache layer for the invite lifecycle.
//!
//! ## Features
//!
//! - **Query Cache**: Per-partition server data with stale tracking and
//!   bounded background refetch
//! - **Optimistic Updates**: Snapshot, predict, then commit or roll back
//! - **Realtime Feed**: Row change events over Redis Pub/Sub or an
//!   in-process broadcast channel
//! - **Realtime Bridge**: Maps change events to the partitions they invalidate
//!
//! ## Example
//!
//! ```ignore
//! use study_cache::{LocalFeed, QueryCache, QueryKey, RealtimeBridge};
//!
//! let cache = QueryCache::default();
//! let feed = LocalFeed::default();
//! RealtimeBridge::new(cache.clone()).spawn(feed.subscribe());
//!
//! let _watch = cache.observe(QueryKey::GroupInvites(group_id));
//! ```

pub mod bridge;
pub mod pool;
pub mod query;
pub mod realtime;

// Re-export pool types
pub use pool::{RedisPool, RedisPoolError, RedisResult};

// Re-export query cache types
pub use query::{
    CacheEntry, Observation, OptimisticUpdate, QueryCache, QueryCacheSettings, QueryFetcher,
    QueryKey, QueryKeyParseError,
};

// Re-export realtime types
pub use realtime::{
    ChangeSource, LocalFeed, RealtimeChannel, ReceivedChange, RedisChangePublisher, Subscriber,
    SubscriberConfig, SubscriberError, SubscriberResult, CHANNEL_PREFIX, TABLE_CHANNEL_PREFIX,
};

pub use bridge::{AffectedKeys, RealtimeBridge};
