//! Member entity - a user's membership in a study group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value_objects::{GroupPermissions, GroupRole, RecordId};

/// Group member entity (junction between Profile and Group)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupMember {
    pub group_id: RecordId,
    pub user_id: RecordId,
    pub role: GroupRole,
    pub joined_at: DateTime<Utc>,
}

impl GroupMember {
    /// Create a new membership
    pub fn new(
        group_id: RecordId,
        user_id: RecordId,
        role: GroupRole,
        joined_at: DateTime<Utc>,
    ) -> Self {
        Self {
            group_id,
            user_id,
            role,
            joined_at,
        }
    }

    #[inline]
    pub fn permissions(&self) -> GroupPermissions {
        self.role.permissions()
    }

    #[inline]
    pub fn is_admin(&self) -> bool {
        self.role == GroupRole::Admin
    }
}
