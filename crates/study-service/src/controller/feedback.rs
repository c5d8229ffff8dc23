//! User-visible outcome of a mutation

use serde::Serialize;
use study_core::InviteToken;

use crate::services::{FeedbackKind, ServiceError};

/// Mutating actions on invites
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteAction {
    Create,
    Accept,
    Decline,
    Revoke,
    Delete,
}

impl InviteAction {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Accept => "accept",
            Self::Decline => "decline",
            Self::Revoke => "revoke",
            Self::Delete => "delete",
        }
    }

    const fn past_tense(self) -> &'static str {
        match self {
            Self::Create => "created",
            Self::Accept => "accepted",
            Self::Decline => "declined",
            Self::Revoke => "revoked",
            Self::Delete => "deleted",
        }
    }
}

/// Dismissible message for the viewer
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Feedback {
    pub kind: FeedbackKind,
    pub action: InviteAction,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token: Option<InviteToken>,
    pub message: String,
}

impl Feedback {
    pub fn success(action: InviteAction, token: Option<InviteToken>) -> Self {
        Self {
            kind: FeedbackKind::Success,
            action,
            token,
            message: format!("Invite {}", action.past_tense()),
        }
    }

    /// The requested outcome was already in place
    pub fn unchanged(action: InviteAction, token: Option<InviteToken>) -> Self {
        Self {
            kind: FeedbackKind::Info,
            action,
            token,
            message: format!("Invite was already {}", action.past_tense()),
        }
    }

    pub fn failure(action: InviteAction, token: Option<InviteToken>, error: &ServiceError) -> Self {
        Self {
            kind: error.feedback_kind(),
            action,
            token,
            message: error.to_string(),
        }
    }

    /// Attach a non-fatal warning to a success
    pub fn with_warning(mut self, warning: &str) -> Self {
        self.message = format!("{}. {warning}", self.message);
        self
    }
}
