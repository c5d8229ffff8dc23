//! Snapshot-and-rollback wrapper for optimistic cache edits

use serde::de::DeserializeOwned;
use serde::Serialize;

use super::cache::{CacheEntry, QueryCache};
use super::key::QueryKey;

/// An in-progress optimistic edit over a set of partitions.
///
/// The affected entries are captured on [`begin`](Self::begin). Calling
/// [`rollback`](Self::rollback), or dropping the update without
/// [`commit`](Self::commit), restores them exactly.
#[derive(Debug)]
pub struct OptimisticUpdate {
    cache: QueryCache,
    snapshot: Vec<(QueryKey, Option<CacheEntry>)>,
    settled: bool,
}

impl OptimisticUpdate {
    pub fn begin(cache: &QueryCache, keys: impl IntoIterator<Item = QueryKey>) -> Self {
        let mut snapshot: Vec<(QueryKey, Option<CacheEntry>)> = Vec::new();
        for key in keys {
            if snapshot.iter().any(|(k, _)| *k == key) {
                continue;
            }
            snapshot.push((key, cache.entry(&key)));
        }

        Self {
            cache: cache.clone(),
            snapshot,
            settled: false,
        }
    }

    /// Apply an edit to one of the captured keys.
    ///
    /// Returns false when the key holds no data or was not captured.
    pub fn apply<T, F>(&self, key: &QueryKey, f: F) -> bool
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce(&mut T),
    {
        if !self.snapshot.iter().any(|(k, _)| k == key) {
            tracing::warn!(key = %key, "Optimistic edit on a key outside the snapshot");
            return false;
        }

        match self.cache.modify(key, f) {
            Ok(applied) => applied,
            Err(e) => {
                tracing::warn!(key = %key, error = %e, "Optimistic edit skipped");
                false
            }
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &QueryKey> {
        self.snapshot.iter().map(|(k, _)| k)
    }

    /// Keep the optimistic state; server data replaces it on the next refetch
    pub fn commit(mut self) {
        self.settled = true;
    }

    /// Restore every captured key, returning the keys touched
    pub fn rollback(mut self) -> Vec<QueryKey> {
        self.restore()
    }

    fn restore(&mut self) -> Vec<QueryKey> {
        self.settled = true;
        std::mem::take(&mut self.snapshot)
            .into_iter()
            .map(|(key, entry)| {
                self.cache.restore(key, entry);
                key
            })
            .collect()
    }
}

impl Drop for OptimisticUpdate {
    fn drop(&mut self) {
        if !self.settled {
            self.restore();
        }
    }
}
