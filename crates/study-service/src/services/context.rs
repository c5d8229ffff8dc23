//! Service context - dependency container for services
//!
//! Holds the repository ports, the change publisher, the notifier, the clock,
//! and the invite/retry settings every service reads.

use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use study_cache::{LocalFeed, RedisChangePublisher, RedisPool};
use study_common::{AppConfig, InviteConfig};
use study_core::events::ChangeEvent;
use study_core::traits::{
    ChangePublisher, Clock, GroupRepository, InviteNotifier, InviteRepository, MemberRepository,
    NoopNotifier, ProfileRepository, SystemClock,
};
use study_core::value_objects::DEFAULT_TOKEN_LENGTH;
use study_db::{
    InMemoryStore, PgGroupRepository, PgInviteRepository, PgMemberRepository, PgPool,
    PgProfileRepository,
};

use super::error::{ServiceError, ServiceResult};
use super::retry::RetryPolicy;

/// Invite creation defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InviteSettings {
    /// Lifetime of an invite when the caller gives no expiry
    pub ttl: Duration,
    pub token_length: usize,
}

impl Default for InviteSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::days(7),
            token_length: DEFAULT_TOKEN_LENGTH,
        }
    }
}

impl From<&InviteConfig> for InviteSettings {
    fn from(config: &InviteConfig) -> Self {
        Self {
            ttl: config.default_ttl(),
            token_length: config.token_length,
        }
    }
}

/// Service context containing all dependencies
///
/// Cheap to clone; every dependency sits behind an `Arc`.
#[derive(Clone)]
pub struct ServiceContext {
    // Repositories
    invite_repo: Arc<dyn InviteRepository>,
    member_repo: Arc<dyn MemberRepository>,
    group_repo: Arc<dyn GroupRepository>,
    profile_repo: Arc<dyn ProfileRepository>,

    // Realtime
    publisher: Arc<dyn ChangePublisher>,

    // Collaborators
    notifier: Arc<dyn InviteNotifier>,
    clock: Arc<dyn Clock>,

    // Settings
    invites: InviteSettings,
    retry: RetryPolicy,
}

impl ServiceContext {
    pub fn builder() -> ServiceContextBuilder {
        ServiceContextBuilder::new()
    }

    // === Repositories ===

    pub fn invite_repo(&self) -> &dyn InviteRepository {
        self.invite_repo.as_ref()
    }

    pub fn member_repo(&self) -> &dyn MemberRepository {
        self.member_repo.as_ref()
    }

    pub fn group_repo(&self) -> &dyn GroupRepository {
        self.group_repo.as_ref()
    }

    pub fn profile_repo(&self) -> &dyn ProfileRepository {
        self.profile_repo.as_ref()
    }

    // === Realtime ===

    pub fn publisher(&self) -> &dyn ChangePublisher {
        self.publisher.as_ref()
    }

    /// Publish a change event; failures are logged and swallowed
    pub async fn publish(&self, event: ChangeEvent) {
        let event_type = event.event_type();
        if let Err(e) = self.publisher.publish(event).await {
            tracing::warn!(event_type = %event_type, error = %e, "Failed to publish change event");
        }
    }

    // === Collaborators ===

    pub fn notifier(&self) -> &dyn InviteNotifier {
        self.notifier.as_ref()
    }

    pub fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    /// Current time from the injected clock
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // === Settings ===

    pub fn invite_settings(&self) -> InviteSettings {
        self.invites
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        self.retry
    }
}

impl std::fmt::Debug for ServiceContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceContext")
            .field("repositories", &"...")
            .field("invites", &self.invites)
            .field("retry", &self.retry)
            .finish()
    }
}

/// Builder for creating ServiceContext with custom configuration
#[derive(Default)]
pub struct ServiceContextBuilder {
    invite_repo: Option<Arc<dyn InviteRepository>>,
    member_repo: Option<Arc<dyn MemberRepository>>,
    group_repo: Option<Arc<dyn GroupRepository>>,
    profile_repo: Option<Arc<dyn ProfileRepository>>,
    publisher: Option<Arc<dyn ChangePublisher>>,
    notifier: Option<Arc<dyn InviteNotifier>>,
    clock: Option<Arc<dyn Clock>>,
    invites: InviteSettings,
    retry: RetryPolicy,
}

impl ServiceContextBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the PostgreSQL repositories for every port
    pub fn postgres(self, pool: PgPool) -> Self {
        self.invite_repo(Arc::new(PgInviteRepository::new(pool.clone())))
            .member_repo(Arc::new(PgMemberRepository::new(pool.clone())))
            .group_repo(Arc::new(PgGroupRepository::new(pool.clone())))
            .profile_repo(Arc::new(PgProfileRepository::new(pool)))
    }

    /// Use one in-memory store for every port
    pub fn in_memory(self, store: &InMemoryStore) -> Self {
        self.invite_repo(Arc::new(store.clone()))
            .member_repo(Arc::new(store.clone()))
            .group_repo(Arc::new(store.clone()))
            .profile_repo(Arc::new(store.clone()))
    }

    /// Publish change events to Redis so other processes can follow them
    pub fn redis(self, pool: RedisPool) -> Self {
        self.publisher(Arc::new(RedisChangePublisher::new(pool)))
    }

    /// Take invite and retry settings from the application config
    pub fn config(mut self, config: &AppConfig) -> Self {
        self.invites = InviteSettings::from(&config.invites);
        self.retry = RetryPolicy::from(&config.retry);
        self
    }

    pub fn invite_repo(mut self, repo: Arc<dyn InviteRepository>) -> Self {
        self.invite_repo = Some(repo);
        self
    }

    pub fn member_repo(mut self, repo: Arc<dyn MemberRepository>) -> Self {
        self.member_repo = Some(repo);
        self
    }

    pub fn group_repo(mut self, repo: Arc<dyn GroupRepository>) -> Self {
        self.group_repo = Some(repo);
        self
    }

    pub fn profile_repo(mut self, repo: Arc<dyn ProfileRepository>) -> Self {
        self.profile_repo = Some(repo);
        self
    }

    pub fn publisher(mut self, publisher: Arc<dyn ChangePublisher>) -> Self {
        self.publisher = Some(publisher);
        self
    }

    pub fn notifier(mut self, notifier: Arc<dyn InviteNotifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn invite_settings(mut self, settings: InviteSettings) -> Self {
        self.invites = settings;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = policy;
        self
    }

    /// Build the ServiceContext
    ///
    /// Without an explicit publisher, events go to an in-process feed nobody
    /// listens to. The notifier defaults to a no-op and the clock to the
    /// system clock.
    ///
    /// # Errors
    /// Returns `ServiceError::Validation` if a repository is missing
    pub fn build(self) -> ServiceResult<ServiceContext> {
        Ok(ServiceContext {
            invite_repo: self
                .invite_repo
                .ok_or_else(|| ServiceError::validation("invite_repo is required"))?,
            member_repo: self
                .member_repo
                .ok_or_else(|| ServiceError::validation("member_repo is required"))?,
            group_repo: self
                .group_repo
                .ok_or_else(|| ServiceError::validation("group_repo is required"))?,
            profile_repo: self
                .profile_repo
                .ok_or_else(|| ServiceError::validation("profile_repo is required"))?,
            publisher: self
                .publisher
                .unwrap_or_else(|| Arc::new(LocalFeed::default())),
            notifier: self.notifier.unwrap_or_else(|| Arc::new(NoopNotifier)),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
            invites: self.invites,
            retry: self.retry,
        })
    }
}
