//! GroupInvite entity <-> model mapper

use study_core::entities::{GroupInvite, InviteTarget};
use study_core::error::DomainError;
use study_core::value_objects::{InviteStatus, InviteToken, RecordId};
use uuid::Uuid;

use crate::models::InviteModel;

/// Convert InviteModel to GroupInvite entity
///
/// Fails when the row does not carry exactly one recipient or has an
/// unknown status.
impl TryFrom<InviteModel> for GroupInvite {
    type Error = DomainError;

    fn try_from(model: InviteModel) -> Result<Self, Self::Error> {
        let target = match (model.invitee_id, model.email) {
            (Some(id), None) => InviteTarget::User(RecordId::from(id)),
            (None, Some(email)) => InviteTarget::Email(email),
            _ => {
                return Err(DomainError::DatabaseError(format!(
                    "invite {} has an invalid recipient",
                    model.id
                )))
            }
        };
        let status = InviteStatus::parse(&model.status)
            .map_err(|e| DomainError::DatabaseError(e.to_string()))?;

        Ok(GroupInvite {
            id: RecordId::from(model.id),
            token: InviteToken::from(model.token),
            group_id: RecordId::from(model.group_id),
            invited_by: RecordId::from(model.invited_by),
            target,
            status,
            created_at: model.created_at,
            expires_at: model.expires_at,
            deleted_at: model.deleted_at,
        })
    }
}

/// Convert GroupInvite entity reference to values for database insertion
pub struct InviteInsert<'a> {
    pub id: Uuid,
    pub token: &'a str,
    pub group_id: Uuid,
    pub invited_by: Uuid,
    pub invitee_id: Option<Uuid>,
    pub email: Option<&'a str>,
    pub status: &'static str,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
}

impl<'a> InviteInsert<'a> {
    pub fn new(invite: &'a GroupInvite) -> Self {
        Self {
            id: invite.id.into_inner(),
            token: invite.token.as_str(),
            group_id: invite.group_id.into_inner(),
            invited_by: invite.invited_by.into_inner(),
            invitee_id: invite.invitee_id().map(RecordId::into_inner),
            email: invite.email(),
            status: invite.status.as_str(),
            created_at: invite.created_at,
            expires_at: invite.expires_at,
        }
    }
}
