//! Invite service
//!
//! Creates invites and drives them through their one terminal transition:
//! accept, decline or revoke. Soft delete is allowed afterwards.

use std::collections::HashSet;

use study_core::entities::{GroupInvite, GroupMember, InviteTarget, Profile};
use study_core::events::{ChangeEvent, ChangeKind};
use study_core::{
    Caller, DomainError, GroupPermissions, GroupRole, InviteStatus, InviteToken, RecordId,
};
use tracing::{info, instrument, warn};
use validator::Validate;

use crate::dto::{
    CreateInviteRequest, CreatedInvite, InviteOutcome, InvitePreview, InviteView, InviteWithGroup,
};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Invite service
pub struct InviteService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> InviteService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    // ========================================================================
    // Creation
    // ========================================================================

    /// Create an invite for an existing user or an email address
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.user_id, group_id = %request.group_id))]
    pub async fn create_invite(
        &self,
        caller: &Caller,
        request: CreateInviteRequest,
    ) -> ServiceResult<CreatedInvite> {
        request.validate()?;
        let target = InviteTarget::from_parts(request.invitee_id, request.email.as_deref())?;
        let group_id = request.group_id;

        PermissionService::new(self.ctx)
            .require_permission(group_id, caller.user_id, GroupPermissions::INVITE_MEMBERS)
            .await?;

        if let InviteTarget::User(invitee_id) = target {
            if self.ctx.member_repo().is_member(group_id, invitee_id).await? {
                return Err(DomainError::AlreadyMember.into());
            }
        }

        let now = self.ctx.now();
        let settings = self.ctx.invite_settings();
        let expires_at = request.expires_at.unwrap_or(now + settings.ttl);
        if expires_at <= now {
            return Err(ServiceError::validation("expires_at must be in the future"));
        }

        let invite = GroupInvite::new(
            group_id,
            caller.user_id,
            target,
            InviteToken::generate(settings.token_length),
            now,
            expires_at,
        );

        self.ctx.invite_repo().create_if_no_active(&invite, now).await?;

        info!(
            token = %invite.token,
            group_id = %group_id,
            inviter_id = %caller.user_id,
            "Invite created"
        );

        self.ctx
            .publish(ChangeEvent::invite(ChangeKind::Insert, &invite))
            .await;

        let warning = self
            .notify(&invite, request.group_name, request.inviter_name)
            .await;

        Ok(CreatedInvite { invite, warning })
    }

    /// Deliver the invite notification; a failure becomes a warning
    async fn notify(
        &self,
        invite: &GroupInvite,
        group_name: Option<String>,
        inviter_name: Option<String>,
    ) -> Option<String> {
        let group_name = match group_name {
            Some(name) => name,
            None => match self.ctx.group_repo().find_by_id(invite.group_id).await {
                Ok(Some(group)) => group.name,
                _ => "your study group".to_string(),
            },
        };
        let inviter_name = match inviter_name {
            Some(name) => name,
            None => match self.ctx.profile_repo().find_by_id(invite.invited_by).await {
                Ok(Some(profile)) => profile.display_name,
                _ => "A group member".to_string(),
            },
        };

        match self
            .ctx
            .notifier()
            .invite_created(invite, &group_name, &inviter_name)
            .await
        {
            Ok(()) => None,
            Err(e) => {
                warn!(token = %invite.token, error = %e, "Invite notification failed");
                Some(format!(
                    "Invite created, but the notification could not be delivered: {e}"
                ))
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Every invite of a group, admin only
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_group_invites(
        &self,
        caller: &Caller,
        group_id: RecordId,
    ) -> ServiceResult<Vec<InviteView>> {
        PermissionService::new(self.ctx)
            .require_permission(group_id, caller.user_id, GroupPermissions::MANAGE_INVITES)
            .await?;

        let invites = self.ctx.invite_repo().find_by_group(group_id).await?;
        Ok(InviteView::annotate(invites, self.ctx.now()))
    }

    /// Invites addressed to the caller by id or verified email
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_my_invites(&self, caller: &Caller) -> ServiceResult<Vec<InviteView>> {
        let invites = self
            .ctx
            .invite_repo()
            .find_for_user(caller.user_id, caller.verified_email())
            .await?;
        Ok(InviteView::annotate(invites, self.ctx.now()))
    }

    /// Registered users who could be invited to the group.
    ///
    /// Excludes current members and anyone with an active invite.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_non_members(
        &self,
        caller: &Caller,
        group_id: RecordId,
    ) -> ServiceResult<Vec<Profile>> {
        PermissionService::new(self.ctx)
            .require_permission(group_id, caller.user_id, GroupPermissions::INVITE_MEMBERS)
            .await?;

        let now = self.ctx.now();
        let members: HashSet<RecordId> = self
            .ctx
            .member_repo()
            .find_by_group(group_id)
            .await?
            .into_iter()
            .map(|m| m.user_id)
            .collect();

        let active: Vec<InviteTarget> = self
            .ctx
            .invite_repo()
            .find_by_group(group_id)
            .await?
            .into_iter()
            .filter(|invite| invite.is_active(now))
            .map(|invite| invite.target)
            .collect();

        let profiles = self.ctx.profile_repo().find_all().await?;
        Ok(profiles
            .into_iter()
            .filter(|p| !members.contains(&p.id))
            .filter(|p| !active.iter().any(|target| p.is_target_of(target)))
            .collect())
    }

    /// Public preview of an invite link
    #[instrument(skip(self))]
    pub async fn validate_invite(&self, token: &InviteToken) -> ServiceResult<InvitePreview> {
        let invite = self.find(token).await?;
        let now = self.ctx.now();

        if invite.status == InviteStatus::Revoked {
            return Err(DomainError::InviteNotFound(token.to_string()).into());
        }
        if invite.status == InviteStatus::Pending && invite.is_past_expiry(now) {
            return Err(DomainError::InviteExpired.into());
        }

        let group = self
            .ctx
            .group_repo()
            .find_by_id(invite.group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(invite.group_id))?;
        let member_count = self.ctx.group_repo().member_count(group.id).await?;

        Ok(InvitePreview::from(InviteWithGroup {
            invite,
            group: group.summary(member_count),
            now,
        }))
    }

    // ========================================================================
    // Transitions
    // ========================================================================

    /// Accept an invite addressed to the caller and join the group.
    ///
    /// The status change and the membership row are written together, so
    /// only the call that moves the invite out of `pending` adds a member.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn accept_invite(
        &self,
        caller: &Caller,
        token: &InviteToken,
    ) -> ServiceResult<InviteOutcome> {
        let invite = self.find_addressed_to(caller, token).await?;
        let member = GroupMember::new(invite.group_id, caller.user_id, GroupRole::Member, self.ctx.now());
        let outcome = self
            .transition(invite, InviteStatus::Accepted, true, Some(member))
            .await?;

        if outcome.applied {
            info!(token = %token, group_id = %outcome.invite.group_id, user_id = %caller.user_id, "Invite accepted");
        }
        Ok(outcome)
    }

    /// Decline an invite addressed to the caller
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn decline_invite(
        &self,
        caller: &Caller,
        token: &InviteToken,
    ) -> ServiceResult<InviteOutcome> {
        let invite = self.find_addressed_to(caller, token).await?;
        let outcome = self
            .transition(invite, InviteStatus::Declined, true, None)
            .await?;

        if outcome.applied {
            info!(token = %token, user_id = %caller.user_id, "Invite declined");
        }
        Ok(outcome)
    }

    /// Revoke an invite, admin only. Expired pending invites may be revoked.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn revoke_invite(
        &self,
        caller: &Caller,
        token: &InviteToken,
    ) -> ServiceResult<InviteOutcome> {
        let invite = self.find(token).await?;
        PermissionService::new(self.ctx)
            .require_permission(invite.group_id, caller.user_id, GroupPermissions::MANAGE_INVITES)
            .await?;

        let outcome = self
            .transition(invite, InviteStatus::Revoked, false, None)
            .await?;

        if outcome.applied {
            info!(token = %token, group_id = %outcome.invite.group_id, revoked_by = %caller.user_id, "Invite revoked");
        }
        Ok(outcome)
    }

    /// Soft delete a terminal or expired invite.
    ///
    /// Allowed for the recipient, the inviter, and group admins. Returns
    /// `false` when the invite is already gone.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn delete_invite(&self, caller: &Caller, token: &InviteToken) -> ServiceResult<bool> {
        let Some(invite) = self.ctx.invite_repo().find_by_token(token).await? else {
            return Ok(false);
        };

        let allowed = caller.matches_target(&invite.target)
            || invite.invited_by == caller.user_id
            || PermissionService::new(self.ctx)
                .check_permission(invite.group_id, caller.user_id, GroupPermissions::MANAGE_INVITES)
                .await?;
        if !allowed {
            return Err(DomainError::NotAuthorized(
                "only the recipient, the inviter or a group admin may delete an invite".to_string(),
            )
            .into());
        }

        let now = self.ctx.now();
        if invite.effective_status(now).is_actionable() {
            return Err(DomainError::InviteStillPending.into());
        }

        self.ctx.invite_repo().soft_delete(token, now).await?;
        info!(token = %token, deleted_by = %caller.user_id, "Invite deleted");

        let mut deleted = invite;
        deleted.deleted_at = Some(now);
        self.ctx
            .publish(ChangeEvent::invite(ChangeKind::Delete, &deleted))
            .await;

        Ok(true)
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    async fn find(&self, token: &InviteToken) -> ServiceResult<GroupInvite> {
        self.ctx
            .invite_repo()
            .find_by_token(token)
            .await?
            .ok_or_else(|| DomainError::InviteNotFound(token.to_string()).into())
    }

    async fn find_addressed_to(
        &self,
        caller: &Caller,
        token: &InviteToken,
    ) -> ServiceResult<GroupInvite> {
        let invite = self.find(token).await?;
        if !caller.matches_target(&invite.target) {
            return Err(DomainError::IdentityMismatch.into());
        }
        Ok(invite)
    }

    /// Move a pending invite to `to`, once.
    ///
    /// Terminal invites resolve without writing: the same outcome is returned
    /// unchanged, a different one fails with `AlreadyProcessed`. The store's
    /// compare-and-set picks a single winner among concurrent callers. An
    /// accept carries the `member` to insert alongside the status change.
    async fn transition(
        &self,
        invite: GroupInvite,
        to: InviteStatus,
        reject_expired: bool,
        member: Option<GroupMember>,
    ) -> ServiceResult<InviteOutcome> {
        if let Some(outcome) = settled(invite.clone(), to)? {
            return Ok(outcome);
        }
        if reject_expired && invite.is_past_expiry(self.ctx.now()) {
            return Err(DomainError::InviteExpired.into());
        }

        let repo = self.ctx.invite_repo();
        let written = match &member {
            Some(member) => repo.accept(&invite.token, member).await?,
            None => repo
                .transition(&invite.token, to)
                .await?
                .map(|updated| (updated, false)),
        };

        match written {
            Some((updated, joined)) => {
                self.ctx
                    .publish(ChangeEvent::invite(ChangeKind::Update, &updated))
                    .await;
                if let Some(member) = member.filter(|_| joined) {
                    info!(group_id = %member.group_id, user_id = %member.user_id, "Member joined via invite");
                    self.ctx
                        .publish(ChangeEvent::member(ChangeKind::Insert, &member))
                        .await;
                }
                Ok(InviteOutcome::applied(updated))
            }
            None => {
                // Lost the race; report whatever won
                let current = self.find(&invite.token).await?;
                settled(current, to)?.ok_or_else(|| {
                    ServiceError::internal("invite still pending after a failed transition")
                })
            }
        }
    }
}

/// Resolve an invite that already left `pending`
fn settled(invite: GroupInvite, to: InviteStatus) -> ServiceResult<Option<InviteOutcome>> {
    if !invite.status.is_terminal() {
        return Ok(None);
    }
    if invite.status == to {
        return Ok(Some(InviteOutcome::unchanged(invite)));
    }
    Err(DomainError::AlreadyProcessed {
        status: invite.status,
    }
    .into())
}
