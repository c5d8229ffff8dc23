//! Profile entity - a registered user

use serde::{Deserialize, Serialize};

use super::InviteTarget;
use crate::value_objects::RecordId;

/// Registered user profile
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: RecordId,
    pub display_name: String,
    pub email: Option<String>,
    pub avatar_url: Option<String>,
}

impl Profile {
    pub fn new(id: RecordId, display_name: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: None,
            avatar_url: None,
        }
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Whether an invite target names this profile, by id or by email
    /// ignoring ASCII case
    pub fn is_target_of(&self, target: &InviteTarget) -> bool {
        match target {
            InviteTarget::User(id) => *id == self.id,
            InviteTarget::Email(address) => self
                .email
                .as_deref()
                .is_some_and(|email| email.eq_ignore_ascii_case(address)),
        }
    }
}
