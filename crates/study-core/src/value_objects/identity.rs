//! Caller identity - who is performing an operation

use serde::{Deserialize, Serialize};

use crate::entities::InviteTarget;
use crate::value_objects::RecordId;

/// Authenticated identity every service call is scoped to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Caller {
    pub user_id: RecordId,
    pub email: Option<String>,
    pub email_verified: bool,
}

impl Caller {
    pub fn new(user_id: RecordId) -> Self {
        Self {
            user_id,
            email: None,
            email_verified: false,
        }
    }

    /// Attach an email address and its verification state
    pub fn with_email(mut self, email: impl Into<String>, verified: bool) -> Self {
        self.email = Some(email.into());
        self.email_verified = verified;
        self
    }

    /// Email usable for matching email-addressed invites (verified only)
    pub fn verified_email(&self) -> Option<&str> {
        if self.email_verified {
            self.email.as_deref()
        } else {
            None
        }
    }

    /// Whether this caller is the identity an invite was addressed to
    pub fn matches_target(&self, target: &InviteTarget) -> bool {
        match target {
            InviteTarget::User(id) => *id == self.user_id,
            InviteTarget::Email(address) => self
                .verified_email()
                .is_some_and(|email| email.eq_ignore_ascii_case(address)),
        }
    }
}
