//! World builder and polling helpers

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use study_cache::{LocalFeed, QueryCache, QueryCacheSettings};
use study_core::entities::{Group, GroupMember};
use study_core::{Clock, GroupRole, ManualClock};
use study_db::InMemoryStore;
use study_service::{InviteLifecycleController, RetryPolicy, ServiceContext};

use crate::fixtures::TestUser;

/// Cache timings short enough for tests
pub fn test_cache_settings() -> QueryCacheSettings {
    QueryCacheSettings {
        stale_time: Duration::from_secs(60),
        refetch_delay: Duration::from_millis(10),
    }
}

/// Retries without noticeable delay
pub fn test_retry_policy() -> RetryPolicy {
    RetryPolicy {
        max_attempts: 3,
        base_delay: Duration::from_millis(1),
        max_delay: Duration::from_millis(5),
        multiplier: 2.0,
    }
}

/// One group with an admin, on an in-memory store
pub struct TestWorld {
    pub store: InMemoryStore,
    pub clock: ManualClock,
    pub feed: LocalFeed,
    pub ctx: ServiceContext,
    pub admin: TestUser,
    pub group: Group,
}

impl TestWorld {
    pub fn new() -> Self {
        Self::with_retry_policy(test_retry_policy())
    }

    /// World whose mutations retry with `policy`
    pub fn with_retry_policy(policy: RetryPolicy) -> Self {
        let _ = study_common::try_init_tracing();

        let store = InMemoryStore::new();
        let clock = ManualClock::new(Utc::now());
        let feed = LocalFeed::default();

        let admin = TestUser::unique("Admin");
        let group = Group::new("Study Group", admin.id()).with_subject("Mathematics");
        store.insert_profile(admin.profile.clone());
        store.insert_group(group.clone());
        store.insert_member(GroupMember::new(group.id, admin.id(), GroupRole::Admin, clock.now()));

        let ctx = ServiceContext::builder()
            .in_memory(&store)
            .clock(Arc::new(clock.clone()))
            .publisher(Arc::new(feed.clone()))
            .retry_policy(policy)
            .build()
            .unwrap_or_else(|e| panic!("failed to build context: {e}"));

        Self {
            store,
            clock,
            feed,
            ctx,
            admin,
            group,
        }
    }

    /// Current instant on the world clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Register a user who is not a member
    pub fn add_user(&self, name: &str) -> TestUser {
        let user = TestUser::unique(name);
        self.store.insert_profile(user.profile.clone());
        user
    }

    /// Register a user and add them to the group
    pub fn add_member(&self, name: &str, role: GroupRole) -> TestUser {
        let user = self.add_user(name);
        self.store
            .insert_member(GroupMember::new(self.group.id, user.id(), role, self.clock.now()));
        user
    }

    /// A controller with its own cache, following the change feed
    pub fn controller_for(&self, user: &TestUser) -> InviteLifecycleController {
        let cache = QueryCache::new(test_cache_settings());
        let controller = InviteLifecycleController::new(self.ctx.clone(), user.caller.clone(), cache);
        controller.follow(self.feed.subscribe());
        controller
    }
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

/// Poll `condition` until it holds or two seconds pass
pub async fn eventually<F>(mut condition: F) -> bool
where
    F: FnMut() -> bool,
{
    for _ in 0..200 {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    condition()
}

/// Let spawned bridge and refetch tasks drain pending work
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(30)).await;
}
