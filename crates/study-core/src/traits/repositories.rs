//! Repository traits (ports) - define the interface for data access
//!
//! The domain layer defines what it needs, and the infrastructure layer
//! provides the implementation (Postgres in production, in-memory in tests).

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::entities::{Group, GroupInvite, GroupMember, GroupSummary, Profile};
use crate::error::DomainError;
use crate::value_objects::{InviteStatus, InviteToken, RecordId};

/// Result type for repository operations
pub type RepoResult<T> = Result<T, DomainError>;

// ============================================================================
// Invite Repository
// ============================================================================

#[async_trait]
pub trait InviteRepository: Send + Sync {
    /// Find a non-deleted invite by its token
    async fn find_by_token(&self, token: &InviteToken) -> RepoResult<Option<GroupInvite>>;

    /// Find a non-deleted invite by ID
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<GroupInvite>>;

    /// List non-deleted invites of a group, newest first
    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupInvite>>;

    /// List non-deleted invites addressed to a user id or (verified) email
    async fn find_for_user(
        &self,
        user_id: RecordId,
        email: Option<&str>,
    ) -> RepoResult<Vec<GroupInvite>>;

    /// Insert the invite unless an active invite (pending, not expired, not
    /// deleted) exists for the same group and recipient.
    ///
    /// Returns `DomainError::DuplicateInvite` when one does.
    async fn create_if_no_active(&self, invite: &GroupInvite, now: DateTime<Utc>)
        -> RepoResult<()>;

    /// Compare-and-set a pending invite to `to`.
    ///
    /// Returns the updated invite, or `None` when the invite was no longer
    /// pending at write time.
    async fn transition(
        &self,
        token: &InviteToken,
        to: InviteStatus,
    ) -> RepoResult<Option<GroupInvite>>;

    /// Compare-and-set a pending invite to accepted and add `member`, as one
    /// unit.
    ///
    /// Returns the updated invite and whether a membership row was inserted
    /// (`false` when the user already belonged to the group), or `None` when
    /// the invite was no longer pending. Nothing is written in that case.
    async fn accept(
        &self,
        token: &InviteToken,
        member: &GroupMember,
    ) -> RepoResult<Option<(GroupInvite, bool)>>;

    /// Soft delete an invite
    async fn soft_delete(&self, token: &InviteToken, now: DateTime<Utc>) -> RepoResult<()>;
}

// ============================================================================
// Member Repository
// ============================================================================

#[async_trait]
pub trait MemberRepository: Send + Sync {
    /// Find a membership
    async fn find(&self, group_id: RecordId, user_id: RecordId)
        -> RepoResult<Option<GroupMember>>;

    /// List members of a group
    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupMember>>;

    /// Check membership
    async fn is_member(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<bool>;

    /// Add a member. Returns `false` when the membership already existed.
    async fn create(&self, member: &GroupMember) -> RepoResult<bool>;

    /// Remove a member
    async fn delete(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<()>;
}

// ============================================================================
// Group Repository
// ============================================================================

#[async_trait]
pub trait GroupRepository: Send + Sync {
    /// Find group by ID
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Group>>;

    /// List all groups a user is a member of
    async fn find_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Group>>;

    /// List the user's groups with member counts, in one round trip
    async fn find_summaries_by_user(&self, user_id: RecordId) -> RepoResult<Vec<GroupSummary>>;

    /// Create a group
    async fn create(&self, group: &Group) -> RepoResult<()>;

    /// Get member count for a group
    async fn member_count(&self, group_id: RecordId) -> RepoResult<i64>;
}

// ============================================================================
// Profile Repository
// ============================================================================

#[async_trait]
pub trait ProfileRepository: Send + Sync {
    /// Find profile by user ID
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Profile>>;

    /// List all profiles
    async fn find_all(&self) -> RepoResult<Vec<Profile>>;

    /// Create or update a profile
    async fn upsert(&self, profile: &Profile) -> RepoResult<()>;
}
