//! Concurrent query cache with stale tracking and background refetch

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use study_core::error::DomainError;
use tokio::sync::broadcast;

use super::key::QueryKey;

/// Loads the current server value for a partition
#[async_trait]
pub trait QueryFetcher: Send + Sync {
    async fn fetch(&self, key: &QueryKey) -> Result<Value, DomainError>;
}

/// Cached server data for one partition
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry {
    pub data: Value,
    pub updated_at: DateTime<Utc>,
    pub stale: bool,
}

/// Timing knobs
#[derive(Debug, Clone, Copy)]
pub struct QueryCacheSettings {
    /// Age after which an entry counts as stale
    pub stale_time: Duration,
    /// Delay between an invalidation and the background refetch
    pub refetch_delay: Duration,
}

impl Default for QueryCacheSettings {
    fn default() -> Self {
        Self {
            stale_time: Duration::from_secs(30),
            refetch_delay: Duration::from_millis(250),
        }
    }
}

impl From<&study_common::QueryCacheConfig> for QueryCacheSettings {
    fn from(config: &study_common::QueryCacheConfig) -> Self {
        Self {
            stale_time: config.stale_time(),
            refetch_delay: config.refetch_delay(),
        }
    }
}

struct Inner {
    settings: QueryCacheSettings,
    entries: DashMap<QueryKey, CacheEntry>,
    /// Active observer count per key
    observers: DashMap<QueryKey, usize>,
    /// Keys with a scheduled refetch; `true` once invalidated again meanwhile
    refetching: DashMap<QueryKey, bool>,
    fetcher: RwLock<Option<Arc<dyn QueryFetcher>>>,
    updates: broadcast::Sender<QueryKey>,
}

/// Shared handle to the cache
#[derive(Clone)]
pub struct QueryCache {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for QueryCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QueryCache")
            .field("entries", &self.inner.entries.len())
            .field("observed", &self.inner.observers.len())
            .finish_non_exhaustive()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(QueryCacheSettings::default())
    }
}

impl QueryCache {
    #[must_use]
    pub fn new(settings: QueryCacheSettings) -> Self {
        let (updates, _) = broadcast::channel(256);
        Self {
            inner: Arc::new(Inner {
                settings,
                entries: DashMap::new(),
                observers: DashMap::new(),
                refetching: DashMap::new(),
                fetcher: RwLock::new(None),
                updates,
            }),
        }
    }

    #[must_use]
    pub fn settings(&self) -> QueryCacheSettings {
        self.inner.settings
    }

    /// Register the loader used for background refetches
    pub fn set_fetcher(&self, fetcher: Arc<dyn QueryFetcher>) {
        *self.inner.fetcher.write() = Some(fetcher);
    }

    /// Keys whose data was written, in write order
    #[must_use]
    pub fn subscribe_updates(&self) -> broadcast::Receiver<QueryKey> {
        self.inner.updates.subscribe()
    }

    // ------------------------------------------------------------------
    // Reads
    // ------------------------------------------------------------------

    #[must_use]
    pub fn entry(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.entries.get(key).map(|e| e.value().clone())
    }

    /// Typed read of the cached data
    pub fn get<T: DeserializeOwned>(&self, key: &QueryKey) -> Option<T> {
        let data = self.inner.entries.get(key)?.data.clone();
        match serde_json::from_value(data) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Cached data has unexpected shape");
                None
            }
        }
    }

    /// Present, not invalidated, and younger than the stale time
    #[must_use]
    pub fn is_fresh(&self, key: &QueryKey) -> bool {
        self.inner.entries.get(key).is_some_and(|entry| {
            let age = Utc::now().signed_duration_since(entry.updated_at);
            !entry.stale && age.to_std().map_or(true, |age| age < self.inner.settings.stale_time)
        })
    }

    #[must_use]
    pub fn keys(&self) -> Vec<QueryKey> {
        self.inner.entries.iter().map(|e| *e.key()).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.entries.is_empty()
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Store fresh server data
    pub fn set<T: Serialize + ?Sized>(
        &self,
        key: QueryKey,
        value: &T,
    ) -> Result<(), serde_json::Error> {
        self.set_value(key, serde_json::to_value(value)?);
        Ok(())
    }

    pub fn set_value(&self, key: QueryKey, data: Value) {
        self.inner.entries.insert(
            key,
            CacheEntry {
                data,
                updated_at: Utc::now(),
                stale: false,
            },
        );
        let _ = self.inner.updates.send(key);
    }

    /// Edit cached data in place, keeping its freshness metadata.
    ///
    /// Returns `Ok(false)` when nothing is cached for the key.
    pub fn modify<T, F>(&self, key: &QueryKey, f: F) -> Result<bool, serde_json::Error>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        {
            let Some(mut entry) = self.inner.entries.get_mut(key) else {
                return Ok(false);
            };
            let mut value: T = serde_json::from_value(entry.data.clone())?;
            f(&mut value);
            entry.data = serde_json::to_value(&value)?;
        }
        let _ = self.inner.updates.send(*key);
        Ok(true)
    }

    /// Put back a previously captured entry (or remove the key)
    pub fn restore(&self, key: QueryKey, entry: Option<CacheEntry>) {
        match entry {
            Some(entry) => {
                self.inner.entries.insert(key, entry);
            }
            None => {
                self.inner.entries.remove(&key);
            }
        }
        let _ = self.inner.updates.send(key);
    }

    pub fn remove(&self, key: &QueryKey) -> Option<CacheEntry> {
        self.inner.entries.remove(key).map(|(_, entry)| entry)
    }

    pub fn clear(&self) {
        self.inner.entries.clear();
    }

    // ------------------------------------------------------------------
    // Observation and invalidation
    // ------------------------------------------------------------------

    /// Mark a key as displayed; dropping the guard stops observing
    #[must_use]
    pub fn observe(&self, key: QueryKey) -> Observation {
        *self.inner.observers.entry(key).or_insert(0) += 1;
        Observation {
            cache: self.clone(),
            key,
        }
    }

    #[must_use]
    pub fn is_observed(&self, key: &QueryKey) -> bool {
        self.inner.observers.contains_key(key)
    }

    /// Mark a key stale; observed keys are refetched in the background
    pub fn invalidate(&self, key: &QueryKey) {
        if let Some(mut entry) = self.inner.entries.get_mut(key) {
            entry.stale = true;
        }
        tracing::debug!(key = %key, "Query invalidated");

        if self.is_observed(key) {
            self.schedule_refetch(*key);
        }
    }

    /// Invalidate every cached or observed key whose name starts with `prefix`
    pub fn invalidate_prefix(&self, prefix: &str) -> Vec<QueryKey> {
        let mut keys: Vec<QueryKey> = self
            .inner
            .entries
            .iter()
            .map(|e| *e.key())
            .chain(self.inner.observers.iter().map(|e| *e.key()))
            .filter(|key| key.prefix() == prefix || key.name().starts_with(prefix))
            .collect();
        keys.sort_unstable();
        keys.dedup();

        for key in &keys {
            self.invalidate(key);
        }
        keys
    }

    fn schedule_refetch(&self, key: QueryKey) {
        self.spawn_refetch(key, 1);
    }

    /// Refetch `key` after a delay that grows with `attempt`. A failed fetch
    /// is retried for as long as the key is observed.
    fn spawn_refetch(&self, key: QueryKey, attempt: u32) {
        let Some(fetcher) = self.inner.fetcher.read().clone() else {
            return;
        };

        // Coalesce with a refetch that is already scheduled
        if let Some(mut again) = self.inner.refetching.get_mut(&key) {
            *again = true;
            return;
        }

        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            tracing::debug!(key = %key, "No runtime, refetch deferred to next read");
            return;
        };

        self.inner.refetching.insert(key, false);
        let cache = self.clone();
        let delay = refetch_backoff(self.inner.settings.refetch_delay, attempt);

        handle.spawn(async move {
            tokio::time::sleep(delay).await;
            cache.inner.refetching.insert(key, false);

            let failed = match fetcher.fetch(&key).await {
                Ok(data) => {
                    cache.set_value(key, data);
                    tracing::debug!(key = %key, attempt, "Query refetched");
                    false
                }
                Err(e) => {
                    tracing::error!(key = %key, attempt, error = %e, "Background refetch failed");
                    true
                }
            };

            let again = cache
                .inner
                .refetching
                .remove(&key)
                .is_some_and(|(_, again)| again);
            if !cache.is_observed(&key) {
                return;
            }
            if again {
                cache.spawn_refetch(key, 1);
            } else if failed {
                cache.spawn_refetch(key, attempt.saturating_add(1));
            }
        });
    }
}

/// Upper bound on the wait before a retried background refetch
const MAX_REFETCH_BACKOFF: Duration = Duration::from_secs(30);

/// `base` times `attempt`, capped at [`MAX_REFETCH_BACKOFF`]
fn refetch_backoff(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt.max(1)).min(MAX_REFETCH_BACKOFF)
}

/// Observer guard returned by [`QueryCache::observe`]
#[derive(Debug)]
pub struct Observation {
    cache: QueryCache,
    key: QueryKey,
}

impl Observation {
    #[must_use]
    pub fn key(&self) -> QueryKey {
        self.key
    }
}

impl Drop for Observation {
    fn drop(&mut self) {
        let observers = &self.cache.inner.observers;
        let now_unobserved = match observers.get_mut(&self.key) {
            Some(mut count) => {
                *count = count.saturating_sub(1);
                *count == 0
            }
            None => false,
        };
        if now_unobserved {
            observers.remove_if(&self.key, |_, count| *count == 0);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use study_core::value_objects::RecordId;

    struct CountingFetcher {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryFetcher for CountingFetcher {
        async fn fetch(&self, _key: &QueryKey) -> Result<Value, DomainError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(serde_json::json!([n]))
        }
    }

    /// Fails its first `failures` calls
    struct FlakyFetcher {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl QueryFetcher for FlakyFetcher {
        async fn fetch(&self, _key: &QueryKey) -> Result<Value, DomainError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst);
            if n < self.failures {
                return Err(DomainError::TransientNetwork("connection reset".into()));
            }
            Ok(serde_json::json!(["new"]))
        }
    }

    fn fast_cache() -> QueryCache {
        QueryCache::new(QueryCacheSettings {
            stale_time: Duration::from_secs(30),
            refetch_delay: Duration::from_millis(5),
        })
    }

    #[test]
    fn test_set_and_get() {
        let cache = QueryCache::default();
        let key = QueryKey::GroupMembers(RecordId::new_v4());

        cache.set(key, &vec!["a", "b"]).unwrap();

        assert_eq!(cache.get::<Vec<String>>(&key), Some(vec!["a".into(), "b".into()]));
        assert!(cache.is_fresh(&key));
        assert!(cache.get::<u32>(&key).is_none());
    }

    #[test]
    fn test_invalidate_marks_stale() {
        let cache = QueryCache::default();
        let key = QueryKey::UserGroups(RecordId::new_v4());
        cache.set(key, &Vec::<u32>::new()).unwrap();

        cache.invalidate(&key);

        assert!(!cache.is_fresh(&key));
        assert!(cache.entry(&key).unwrap().stale);
    }

    #[test]
    fn test_modify_keeps_metadata() {
        let cache = QueryCache::default();
        let key = QueryKey::MyInvites(RecordId::new_v4());
        cache.set(key, &vec![1, 2, 3]).unwrap();
        let before = cache.entry(&key).unwrap();

        let changed = cache
            .modify::<Vec<i32>, _>(&key, |v| v.retain(|n| *n != 2))
            .unwrap();

        assert!(changed);
        let after = cache.entry(&key).unwrap();
        assert_eq!(after.data, serde_json::json!([1, 3]));
        assert_eq!(after.updated_at, before.updated_at);

        let missing = QueryKey::MyInvites(RecordId::new_v4());
        assert!(!cache.modify::<Vec<i32>, _>(&missing, |v| v.clear()).unwrap());
    }

    #[test]
    fn test_observation_guard() {
        let cache = QueryCache::default();
        let key = QueryKey::NonMembers(RecordId::new_v4());

        let first = cache.observe(key);
        let second = cache.observe(key);
        drop(first);
        assert!(cache.is_observed(&key));
        drop(second);
        assert!(!cache.is_observed(&key));
    }

    #[test]
    fn test_invalidate_prefix() {
        let cache = QueryCache::default();
        let a = QueryKey::UserGroups(RecordId::new_v4());
        let b = QueryKey::UserGroups(RecordId::new_v4());
        let other = QueryKey::GroupMembers(RecordId::new_v4());
        for key in [a, b, other] {
            cache.set(key, &0).unwrap();
        }

        let touched = cache.invalidate_prefix(crate::query::USER_GROUPS_PREFIX);

        assert_eq!(touched.len(), 2);
        assert!(!cache.is_fresh(&a));
        assert!(!cache.is_fresh(&b));
        assert!(cache.is_fresh(&other));
    }

    #[tokio::test]
    async fn test_observed_key_refetches_after_invalidate() {
        let cache = fast_cache();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
        });
        cache.set_fetcher(fetcher.clone());

        let key = QueryKey::GroupInvites(RecordId::new_v4());
        cache.set(key, &serde_json::json!([0])).unwrap();
        let _watch = cache.observe(key);
        let mut updates = cache.subscribe_updates();

        cache.invalidate(&key);

        let updated = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated, key);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_unobserved_key_is_not_refetched() {
        let cache = fast_cache();
        let fetcher = Arc::new(CountingFetcher {
            calls: AtomicUsize::new(0),
        });
        cache.set_fetcher(fetcher.clone());

        let key = QueryKey::GroupInvites(RecordId::new_v4());
        cache.set(key, &0).unwrap();
        cache.invalidate(&key);

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
        assert!(!cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_failed_refetch_is_retried_while_observed() {
        let cache = fast_cache();
        let fetcher = Arc::new(FlakyFetcher {
            failures: 1,
            calls: AtomicUsize::new(0),
        });
        cache.set_fetcher(fetcher.clone());

        let key = QueryKey::GroupMembers(RecordId::new_v4());
        cache.set(key, &vec!["old"]).unwrap();
        let _watch = cache.observe(key);
        let mut updates = cache.subscribe_updates();

        cache.invalidate(&key);

        let updated = tokio::time::timeout(Duration::from_secs(2), updates.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated, key);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
        assert_eq!(cache.get::<Vec<String>>(&key), Some(vec!["new".to_string()]));
        assert!(cache.is_fresh(&key));
    }

    #[tokio::test]
    async fn test_failed_refetch_stops_once_unobserved() {
        let cache = fast_cache();
        let fetcher = Arc::new(FlakyFetcher {
            failures: usize::MAX,
            calls: AtomicUsize::new(0),
        });
        cache.set_fetcher(fetcher.clone());

        let key = QueryKey::GroupMembers(RecordId::new_v4());
        cache.set(key, &vec!["old"]).unwrap();
        let watch = cache.observe(key);
        cache.invalidate(&key);

        tokio::time::sleep(Duration::from_millis(30)).await;
        drop(watch);
        tokio::time::sleep(Duration::from_millis(100)).await;
        let settled = fetcher.calls.load(Ordering::SeqCst);
        assert!(settled >= 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), settled);
        assert!(!cache.is_fresh(&key));
    }

    #[test]
    fn test_refetch_backoff_is_capped() {
        let base = Duration::from_millis(250);
        assert_eq!(refetch_backoff(base, 1), base);
        assert_eq!(refetch_backoff(base, 3), Duration::from_millis(750));
        assert_eq!(refetch_backoff(base, u32::MAX), MAX_REFETCH_BACKOFF);
    }
}
