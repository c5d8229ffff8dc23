//! Client-side query cache.
//!
//! Server data is cached per partition (`QueryKey`), invalidated on
//! mutations and realtime events, and refetched in the background while a
//! view observes it.

mod cache;
mod key;
mod optimistic;

pub use cache::{CacheEntry, Observation, QueryCache, QueryCacheSettings, QueryFetcher};
pub use key::{
    QueryKey, QueryKeyParseError, GROUP_INVITES_PREFIX, GROUP_MEMBERS_PREFIX, MY_INVITES_PREFIX,
    NON_MEMBERS_PREFIX, USER_GROUPS_PREFIX,
};
pub use optimistic::OptimisticUpdate;
