//! Permission service
//!
//! Role-based checks for group members. These checks are a convenience for
//! presenting errors early; row-level policy in the store remains the
//! authority.

use study_core::entities::Group;
use study_core::{DomainError, GroupPermissions, RecordId};
use tracing::{debug, instrument};

use super::context::ServiceContext;
use super::error::{ServiceError, ServiceResult};

/// Permission service for access control
pub struct PermissionService<'a> {
    ctx: &'a ServiceContext,
}

impl<'a> PermissionService<'a> {
    pub fn new(ctx: &'a ServiceContext) -> Self {
        Self { ctx }
    }

    /// Permissions of a user in a group, or `None` when not a member
    #[instrument(skip(self))]
    pub async fn member_permissions(
        &self,
        group_id: RecordId,
        user_id: RecordId,
    ) -> ServiceResult<Option<GroupPermissions>> {
        let group = self.group(group_id).await?;

        // Group owners have all permissions
        if group.owner_id == user_id {
            debug!(user_id = %user_id, group_id = %group_id, "User is group owner, granting all permissions");
            return Ok(Some(GroupPermissions::ALL));
        }

        let member = self.ctx.member_repo().find(group_id, user_id).await?;
        Ok(member.map(|m| m.permissions()))
    }

    /// Check if a user has a permission in a group
    #[instrument(skip(self))]
    pub async fn check_permission(
        &self,
        group_id: RecordId,
        user_id: RecordId,
        permission: GroupPermissions,
    ) -> ServiceResult<bool> {
        Ok(self
            .member_permissions(group_id, user_id)
            .await?
            .is_some_and(|p| p.has(permission)))
    }

    /// Check permission and return an error if denied
    ///
    /// Non-members get `NotGroupMember`; members without the flag get
    /// `PermissionDenied`.
    #[instrument(skip(self))]
    pub async fn require_permission(
        &self,
        group_id: RecordId,
        user_id: RecordId,
        permission: GroupPermissions,
    ) -> ServiceResult<()> {
        match self.member_permissions(group_id, user_id).await? {
            None => Err(DomainError::NotGroupMember.into()),
            Some(granted) if !granted.has(permission) => {
                Err(ServiceError::permission_denied(permission.list().join(", ")))
            }
            Some(_) => Ok(()),
        }
    }

    async fn group(&self, group_id: RecordId) -> ServiceResult<Group> {
        self.ctx
            .group_repo()
            .find_by_id(group_id)
            .await?
            .ok_or_else(|| DomainError::GroupNotFound(group_id).into())
    }
}
