//! Group database model

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Database model for groups table
#[derive(Debug, Clone, FromRow)]
pub struct GroupModel {
    pub id: Uuid,
    pub name: String,
    pub subject: Option<String>,
    pub description: Option<String>,
    pub avatar_url: Option<String>,
    pub owner_id: Uuid,
    pub created_at: DateTime<Utc>,
}

/// Group row joined with its member count
#[derive(Debug, Clone, FromRow)]
pub struct GroupWithCountModel {
    #[sqlx(flatten)]
    pub group: GroupModel,
    pub member_count: i64,
}
