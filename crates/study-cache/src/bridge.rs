//! Realtime bridge: turns row change events into cache invalidations

use study_core::events::{ChangeEvent, GROUPS_TABLE, INVITES_TABLE, MEMBERS_TABLE};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;

use crate::query::{QueryCache, QueryKey, MY_INVITES_PREFIX, USER_GROUPS_PREFIX};
use crate::realtime::ChangeSource;

/// Partitions touched by a change event
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AffectedKeys {
    pub keys: Vec<QueryKey>,
    pub prefixes: Vec<&'static str>,
}

impl AffectedKeys {
    fn push(&mut self, key: QueryKey) {
        if !self.keys.contains(&key) {
            self.keys.push(key);
        }
    }

    fn push_prefix(&mut self, prefix: &'static str) {
        if !self.prefixes.contains(&prefix) {
            self.prefixes.push(prefix);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.prefixes.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct RealtimeBridge {
    cache: QueryCache,
}

impl RealtimeBridge {
    #[must_use]
    pub fn new(cache: QueryCache) -> Self {
        Self { cache }
    }

    /// Map an event to the partitions it affects
    #[must_use]
    pub fn affected_keys(event: &ChangeEvent) -> AffectedKeys {
        let mut affected = AffectedKeys::default();

        match event.table.as_str() {
            INVITES_TABLE => {
                if let Some(group_id) = event.group_id() {
                    affected.push(QueryKey::GroupInvites(group_id));
                    affected.push(QueryKey::NonMembers(group_id));
                }
                if let Some(invitee_id) = event.invitee_id() {
                    affected.push(QueryKey::MyInvites(invitee_id));
                }
                // Email invites may belong to any cached viewer
                if event.email().is_some() {
                    affected.push_prefix(MY_INVITES_PREFIX);
                }
            }
            MEMBERS_TABLE => {
                if let Some(group_id) = event.group_id() {
                    affected.push(QueryKey::GroupMembers(group_id));
                    affected.push(QueryKey::NonMembers(group_id));
                }
                if let Some(user_id) = event.user_id() {
                    affected.push(QueryKey::UserGroups(user_id));
                }
            }
            GROUPS_TABLE => affected.push_prefix(USER_GROUPS_PREFIX),
            other => {
                tracing::debug!(table = %other, "Ignoring change on untracked table");
            }
        }

        affected
    }

    /// Invalidate everything the event affects, returning the number of keys touched
    pub fn apply(&self, event: &ChangeEvent) -> usize {
        let affected = Self::affected_keys(event);
        let mut touched = affected.keys.len();

        for key in &affected.keys {
            self.cache.invalidate(key);
        }
        for prefix in &affected.prefixes {
            touched += self.cache.invalidate_prefix(prefix).len();
        }

        tracing::debug!(
            event_type = %event.event_type(),
            touched,
            "Applied realtime change"
        );
        touched
    }

    /// Drive the bridge from a broadcast feed until it closes
    pub fn spawn<T: ChangeSource>(self, mut rx: broadcast::Receiver<T>) -> JoinHandle<()> {
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(message) => {
                        if let Some(event) = message.into_change() {
                            self.apply(&event);
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Missed events: everything cached may be behind
                        tracing::warn!(skipped, "Realtime bridge lagged, invalidating all");
                        for key in self.cache.keys() {
                            self.cache.invalidate(&key);
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => {
                        tracing::info!("Realtime feed closed, bridge stopping");
                        break;
                    }
                }
            }
        })
    }
}
