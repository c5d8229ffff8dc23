//! Request DTOs
//!
//! All request DTOs implement `Deserialize` and `Validate` for input validation.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use study_core::RecordId;
use validator::Validate;

// ============================================================================
// Invite Requests
// ============================================================================

/// Create invite request
///
/// Exactly one of `invitee_id` and `email` must be set.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateInviteRequest {
    pub group_id: RecordId,

    pub invitee_id: Option<RecordId>,

    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,

    /// Group name shown in the notification; defaults to the stored name
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub group_name: Option<String>,

    /// Inviter name shown in the notification; defaults to the profile name
    #[validate(length(min = 1, max = 100, message = "Inviter name must be 1-100 characters"))]
    pub inviter_name: Option<String>,

    /// Defaults to now plus the configured invite lifetime
    pub expires_at: Option<DateTime<Utc>>,
}

impl CreateInviteRequest {
    /// Invite an existing user
    pub fn user(group_id: RecordId, invitee_id: RecordId) -> Self {
        Self {
            group_id,
            invitee_id: Some(invitee_id),
            email: None,
            group_name: None,
            inviter_name: None,
            expires_at: None,
        }
    }

    /// Invite an external address
    pub fn email(group_id: RecordId, email: impl Into<String>) -> Self {
        Self {
            email: Some(email.into()),
            invitee_id: None,
            ..Self::user(group_id, RecordId::default())
        }
    }

    pub fn with_names(mut self, group_name: impl Into<String>, inviter_name: impl Into<String>) -> Self {
        self.group_name = Some(group_name.into());
        self.inviter_name = Some(inviter_name.into());
        self
    }

    pub fn expires_at(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }
}

// ============================================================================
// Group Requests
// ============================================================================

/// Create group request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateGroupRequest {
    #[validate(length(min = 1, max = 100, message = "Group name must be 1-100 characters"))]
    pub name: String,

    #[validate(length(max = 100, message = "Subject must be at most 100 characters"))]
    pub subject: Option<String>,

    #[validate(length(max = 1000, message = "Description must be at most 1000 characters"))]
    pub description: Option<String>,
}

impl CreateGroupRequest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            subject: None,
            description: None,
        }
    }
}
