//! Group entity <-> model mapper

use study_core::entities::{Group, GroupSummary};
use study_core::value_objects::RecordId;

use crate::models::{GroupModel, GroupWithCountModel};

/// Convert GroupModel to Group entity
impl From<GroupModel> for Group {
    fn from(model: GroupModel) -> Self {
        Group {
            id: RecordId::from(model.id),
            name: model.name,
            subject: model.subject,
            description: model.description,
            avatar_url: model.avatar_url,
            owner_id: RecordId::from(model.owner_id),
            created_at: model.created_at,
        }
    }
}

impl From<GroupWithCountModel> for GroupSummary {
    fn from(model: GroupWithCountModel) -> Self {
        Group::from(model.group).summary(model.member_count)
    }
}
