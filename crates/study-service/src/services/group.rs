//! Group service
//!
//! Group creation and the "groups for user" listing.

use study_core::entities::{Group, GroupMember, GroupSummary};
use study_core::events::{ChangeEvent, ChangeKind};
use study_core::{Caller, GroupRole};
use tracing::{info, instrument};
use validator::Validate;

use crate::dto::CreateGroupRequest;

use super::context::ServiceContext;
use super::error::ServiceResult;

/// Group service
pub struct GroupService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> GroupService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Create a group owned by the caller, who joins as admin
    #[instrument(skip(self, caller, request), fields(caller_id = %caller.user_id))]
    pub async fn create_group(
        &self,
        caller: &Caller,
        request: CreateGroupRequest,
    ) -> ServiceResult<Group> {
        request.validate()?;

        let mut group = Group::new(request.name.trim(), caller.user_id);
        group.subject = request.subject;
        group.description = request.description;
        group.created_at = self.ctx.now();

        self.ctx.group_repo().create(&group).await?;

        let owner = GroupMember::new(group.id, caller.user_id, GroupRole::Admin, group.created_at);
        self.ctx.member_repo().create(&owner).await?;

        info!(group_id = %group.id, owner_id = %caller.user_id, "Group created");

        self.ctx
            .publish(ChangeEvent::group(ChangeKind::Insert, &group))
            .await;
        self.ctx
            .publish(ChangeEvent::member(ChangeKind::Insert, &owner))
            .await;

        Ok(group)
    }

    /// Groups the caller belongs to, with member counts
    #[instrument(skip(self, caller), fields(caller_id = %caller.user_id))]
    pub async fn get_my_groups(&self, caller: &Caller) -> ServiceResult<Vec<GroupSummary>> {
        Ok(self
            .ctx
            .group_repo()
            .find_summaries_by_user(caller.user_id)
            .await?)
    }
}
