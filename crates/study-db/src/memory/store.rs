//! In-memory implementation of every repository port
//!
//! One lock guards all tables, so each port call is atomic with respect to
//! the others: the duplicate check in `create_if_no_active` and the
//! compare-and-set in `transition` behave like their SQL counterparts.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;

use study_core::entities::{Group, GroupInvite, GroupMember, GroupSummary, Profile};
use study_core::error::DomainError;
use study_core::traits::{
    GroupRepository, InviteRepository, MemberRepository, ProfileRepository, RepoResult,
};
use study_core::value_objects::{InviteStatus, InviteToken, RecordId};

#[derive(Debug, Default)]
struct Tables {
    profiles: HashMap<RecordId, Profile>,
    groups: HashMap<RecordId, Group>,
    members: HashMap<(RecordId, RecordId), GroupMember>,
    /// Keyed by token
    invites: HashMap<String, GroupInvite>,
}

impl Tables {
    fn member_count(&self, group_id: RecordId) -> i64 {
        self.members.keys().filter(|(g, _)| *g == group_id).count() as i64
    }

    fn live_invite(&self, token: &InviteToken) -> Option<&GroupInvite> {
        self.invites
            .get(token.as_str())
            .filter(|invite| !invite.is_deleted())
    }
}

/// Shared in-memory data store
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    tables: Arc<RwLock<Tables>>,
    /// Number of upcoming port calls that fail with a transient error
    failures: Arc<AtomicU32>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `count` port calls fail with `TransientNetwork`
    pub fn fail_next(&self, count: u32) {
        self.failures.store(count, Ordering::SeqCst);
    }

    fn check_failure(&self) -> RepoResult<()> {
        let injected = self
            .failures
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if injected {
            return Err(DomainError::TransientNetwork(
                "connection reset by peer".to_string(),
            ));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Seeding and inspection helpers
    // ------------------------------------------------------------------

    pub fn insert_profile(&self, profile: Profile) {
        self.tables.write().profiles.insert(profile.id, profile);
    }

    pub fn insert_group(&self, group: Group) {
        self.tables.write().groups.insert(group.id, group);
    }

    pub fn insert_member(&self, member: GroupMember) {
        self.tables
            .write()
            .members
            .insert((member.group_id, member.user_id), member);
    }

    /// Store an invite as-is, bypassing the duplicate check
    pub fn insert_invite(&self, invite: GroupInvite) {
        self.tables
            .write()
            .invites
            .insert(invite.token.as_str().to_string(), invite);
    }

    /// Raw invite row including soft-deleted ones
    pub fn invite_row(&self, token: &InviteToken) -> Option<GroupInvite> {
        self.tables.read().invites.get(token.as_str()).cloned()
    }

    /// Number of membership rows for a user in a group (0 or 1)
    pub fn membership_rows(&self, group_id: RecordId, user_id: RecordId) -> usize {
        usize::from(self.tables.read().members.contains_key(&(group_id, user_id)))
    }
}

// ============================================================================
// Invites
// ============================================================================

#[async_trait]
impl InviteRepository for InMemoryStore {
    async fn find_by_token(&self, token: &InviteToken) -> RepoResult<Option<GroupInvite>> {
        self.check_failure()?;
        Ok(self.tables.read().live_invite(token).cloned())
    }

    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<GroupInvite>> {
        self.check_failure()?;
        Ok(self
            .tables
            .read()
            .invites
            .values()
            .find(|invite| invite.id == id && !invite.is_deleted())
            .cloned())
    }

    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupInvite>> {
        self.check_failure()?;
        let mut invites: Vec<GroupInvite> = self
            .tables
            .read()
            .invites
            .values()
            .filter(|invite| invite.group_id == group_id && !invite.is_deleted())
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    async fn find_for_user(
        &self,
        user_id: RecordId,
        email: Option<&str>,
    ) -> RepoResult<Vec<GroupInvite>> {
        self.check_failure()?;
        let mut invites: Vec<GroupInvite> = self
            .tables
            .read()
            .invites
            .values()
            .filter(|invite| !invite.is_deleted())
            .filter(|invite| {
                invite.invitee_id() == Some(user_id)
                    || matches!(
                        (invite.email(), email),
                        (Some(target), Some(mine)) if target.eq_ignore_ascii_case(mine)
                    )
            })
            .cloned()
            .collect();
        invites.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(invites)
    }

    async fn create_if_no_active(
        &self,
        invite: &GroupInvite,
        now: DateTime<Utc>,
    ) -> RepoResult<()> {
        self.check_failure()?;
        let mut tables = self.tables.write();

        let duplicate = tables.invites.values().any(|existing| {
            existing.group_id == invite.group_id
                && existing.is_active(now)
                && existing.target.same_recipient(&invite.target)
        });
        if duplicate || tables.invites.contains_key(invite.token.as_str()) {
            return Err(DomainError::DuplicateInvite);
        }

        tables
            .invites
            .insert(invite.token.as_str().to_string(), invite.clone());
        Ok(())
    }

    async fn transition(
        &self,
        token: &InviteToken,
        to: InviteStatus,
    ) -> RepoResult<Option<GroupInvite>> {
        self.check_failure()?;
        let mut tables = self.tables.write();

        let Some(invite) = tables
            .invites
            .get_mut(token.as_str())
            .filter(|invite| !invite.is_deleted())
        else {
            return Err(DomainError::InviteNotFound(token.to_string()));
        };

        if invite.status != InviteStatus::Pending {
            return Ok(None);
        }
        invite.status = to;
        Ok(Some(invite.clone()))
    }

    async fn accept(
        &self,
        token: &InviteToken,
        member: &GroupMember,
    ) -> RepoResult<Option<(GroupInvite, bool)>> {
        self.check_failure()?;
        let mut tables = self.tables.write();

        let Some(invite) = tables
            .invites
            .get_mut(token.as_str())
            .filter(|invite| !invite.is_deleted())
        else {
            return Err(DomainError::InviteNotFound(token.to_string()));
        };

        if invite.status != InviteStatus::Pending {
            return Ok(None);
        }
        invite.status = InviteStatus::Accepted;
        let accepted = invite.clone();

        let key = (member.group_id, member.user_id);
        let joined = !tables.members.contains_key(&key);
        if joined {
            tables.members.insert(key, member.clone());
        }
        Ok(Some((accepted, joined)))
    }

    async fn soft_delete(&self, token: &InviteToken, now: DateTime<Utc>) -> RepoResult<()> {
        self.check_failure()?;
        let mut tables = self.tables.write();

        match tables
            .invites
            .get_mut(token.as_str())
            .filter(|invite| !invite.is_deleted())
        {
            Some(invite) => {
                invite.deleted_at = Some(now);
                Ok(())
            }
            None => Err(DomainError::InviteNotFound(token.to_string())),
        }
    }
}

// ============================================================================
// Members
// ============================================================================

#[async_trait]
impl MemberRepository for InMemoryStore {
    async fn find(
        &self,
        group_id: RecordId,
        user_id: RecordId,
    ) -> RepoResult<Option<GroupMember>> {
        self.check_failure()?;
        Ok(self.tables.read().members.get(&(group_id, user_id)).cloned())
    }

    async fn find_by_group(&self, group_id: RecordId) -> RepoResult<Vec<GroupMember>> {
        self.check_failure()?;
        let mut members: Vec<GroupMember> = self
            .tables
            .read()
            .members
            .values()
            .filter(|m| m.group_id == group_id)
            .cloned()
            .collect();
        members.sort_by_key(|m| m.joined_at);
        Ok(members)
    }

    async fn is_member(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<bool> {
        self.check_failure()?;
        Ok(self.tables.read().members.contains_key(&(group_id, user_id)))
    }

    async fn create(&self, member: &GroupMember) -> RepoResult<bool> {
        self.check_failure()?;
        let mut tables = self.tables.write();
        let key = (member.group_id, member.user_id);
        if tables.members.contains_key(&key) {
            return Ok(false);
        }
        tables.members.insert(key, member.clone());
        Ok(true)
    }

    async fn delete(&self, group_id: RecordId, user_id: RecordId) -> RepoResult<()> {
        self.check_failure()?;
        self.tables
            .write()
            .members
            .remove(&(group_id, user_id))
            .map(|_| ())
            .ok_or(DomainError::MemberNotFound)
    }
}

// ============================================================================
// Groups
// ============================================================================

#[async_trait]
impl GroupRepository for InMemoryStore {
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Group>> {
        self.check_failure()?;
        Ok(self.tables.read().groups.get(&id).cloned())
    }

    async fn find_by_user(&self, user_id: RecordId) -> RepoResult<Vec<Group>> {
        self.check_failure()?;
        let tables = self.tables.read();
        let mut groups: Vec<Group> = tables
            .members
            .keys()
            .filter(|(_, u)| *u == user_id)
            .filter_map(|(g, _)| tables.groups.get(g).cloned())
            .collect();
        groups.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(groups)
    }

    async fn find_summaries_by_user(&self, user_id: RecordId) -> RepoResult<Vec<GroupSummary>> {
        let groups = self.find_by_user(user_id).await?;
        let tables = self.tables.read();
        Ok(groups
            .iter()
            .map(|g| g.summary(tables.member_count(g.id)))
            .collect())
    }

    async fn create(&self, group: &Group) -> RepoResult<()> {
        self.check_failure()?;
        self.tables.write().groups.insert(group.id, group.clone());
        Ok(())
    }

    async fn member_count(&self, group_id: RecordId) -> RepoResult<i64> {
        self.check_failure()?;
        Ok(self.tables.read().member_count(group_id))
    }
}

// ============================================================================
// Profiles
// ============================================================================

#[async_trait]
impl ProfileRepository for InMemoryStore {
    async fn find_by_id(&self, id: RecordId) -> RepoResult<Option<Profile>> {
        self.check_failure()?;
        Ok(self.tables.read().profiles.get(&id).cloned())
    }

    async fn find_all(&self) -> RepoResult<Vec<Profile>> {
        self.check_failure()?;
        let mut profiles: Vec<Profile> = self.tables.read().profiles.values().cloned().collect();
        profiles.sort_by(|a, b| a.display_name.cmp(&b.display_name));
        Ok(profiles)
    }

    async fn upsert(&self, profile: &Profile) -> RepoResult<()> {
        self.check_failure()?;
        self.tables
            .write()
            .profiles
            .insert(profile.id, profile.clone());
        Ok(())
    }
}
