//! Member service
//!
//! Membership reads plus leave/remove. Joining happens through invites.

use study_core::events::{ChangeEvent, ChangeKind};
use study_core::{Caller, DomainError, GroupPermissions, RecordId};
use tracing::{info, instrument};

use crate::dto::{MemberView, MemberWithProfile};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};
use super::permission::PermissionService;

/// Member service
pub struct MemberService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> MemberService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Members of a group with their profiles
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_group_members(
        &self,
        caller: &Caller,
        group_id: RecordId,
    ) -> ServiceResult<Vec<MemberView>> {
        PermissionService::new(self.ctx)
            .require_permission(group_id, caller.user_id, GroupPermissions::VIEW_GROUP)
            .await?;

        let members = self.ctx.member_repo().find_by_group(group_id).await?;
        let mut views = Vec::with_capacity(members.len());
        for member in members {
            let profile = self.ctx.profile_repo().find_by_id(member.user_id).await?;
            views.push(MemberView::from(MemberWithProfile { member, profile }));
        }
        Ok(views)
    }

    /// Leave a group. The owner cannot leave.
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn leave_group(&self, caller: &Caller, group_id: RecordId) -> ServiceResult<()> {
        let group = self
            .ctx
            .group_repo()
            .find_by_id(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;
        if group.owner_id == caller.user_id {
            return Err(ServiceError::validation("the group owner cannot leave the group"));
        }
        self.remove(group_id, caller.user_id).await
    }

    /// Remove another member, requires MANAGE_MEMBERS
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn remove_member(
        &self,
        caller: &Caller,
        group_id: RecordId,
        user_id: RecordId,
    ) -> ServiceResult<()> {
        PermissionService::new(self.ctx)
            .require_permission(group_id, caller.user_id, GroupPermissions::MANAGE_MEMBERS)
            .await?;

        let group = self
            .ctx
            .group_repo()
            .find_by_id(group_id)
            .await?
            .ok_or(DomainError::GroupNotFound(group_id))?;
        if group.owner_id == user_id {
            return Err(DomainError::NotAuthorized("the group owner cannot be removed".into()).into());
        }
        self.remove(group_id, user_id).await
    }

    async fn remove(&self, group_id: RecordId, user_id: RecordId) -> ServiceResult<()> {
        let member = self
            .ctx
            .member_repo()
            .find(group_id, user_id)
            .await?
            .ok_or(DomainError::MemberNotFound)?;

        self.ctx.member_repo().delete(group_id, user_id).await?;
        info!(group_id = %group_id, user_id = %user_id, "Member removed");

        self.ctx
            .publish(ChangeEvent::member(ChangeKind::Delete, &member))
            .await;
        Ok(())
    }
}
