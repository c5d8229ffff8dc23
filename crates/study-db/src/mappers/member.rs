//! GroupMember entity <-> model mapper

use study_core::entities::GroupMember;
use study_core::error::DomainError;
use study_core::value_objects::{GroupRole, RecordId};
use uuid::Uuid;

use crate::models::MemberModel;

/// Convert MemberModel to GroupMember entity
impl TryFrom<MemberModel> for GroupMember {
    type Error = DomainError;

    fn try_from(model: MemberModel) -> Result<Self, Self::Error> {
        let role =
            GroupRole::parse(&model.role).map_err(|e| DomainError::DatabaseError(e.to_string()))?;
        Ok(GroupMember {
            group_id: RecordId::from(model.group_id),
            user_id: RecordId::from(model.user_id),
            role,
            joined_at: model.joined_at,
        })
    }
}

/// Convert GroupMember entity reference to values for database insertion
pub struct MemberInsert {
    pub group_id: Uuid,
    pub user_id: Uuid,
    pub role: &'static str,
    pub joined_at: chrono::DateTime<chrono::Utc>,
}

impl MemberInsert {
    pub fn new(member: &GroupMember) -> Self {
        Self {
            group_id: member.group_id.into_inner(),
            user_id: member.user_id.into_inner(),
            role: member.role.as_str(),
            joined_at: member.joined_at,
        }
    }
}
