//! Invite database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for group_invites table
#[derive(Debug, Clone, FromRow)]
pub struct InviteModel {
    pub id: Uuid,
    pub token: String,
    pub group_id: Uuid,
    pub invited_by: Uuid,
    pub invitee_id: Option<Uuid>,
    pub email: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl InviteModel {
    /// Check if invite is soft deleted
    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}
