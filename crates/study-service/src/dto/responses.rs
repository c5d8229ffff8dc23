//! Response DTOs
//!
//! Effective status is attached here, at read time, and never stored.

use serde::{Deserialize, Serialize};
use study_core::entities::{GroupInvite, GroupMember, GroupSummary, Profile};
use study_core::EffectiveStatus;

// ============================================================================
// Invite Responses
// ============================================================================

/// An invite annotated with its effective status at read time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteView {
    #[serde(flatten)]
    pub invite: GroupInvite,
    pub effective_status: EffectiveStatus,
}

/// Result of `createInvite`
#[derive(Debug, Clone, Serialize)]
pub struct CreatedInvite {
    pub invite: GroupInvite,
    /// Set when the row was created but the notification was not delivered
    #[serde(skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,
}

/// Result of a status transition (accept, decline, revoke)
#[derive(Debug, Clone, Serialize)]
pub struct InviteOutcome {
    pub invite: GroupInvite,
    /// False when the invite already had the requested outcome
    pub applied: bool,
}

/// Unauthenticated invite preview
#[derive(Debug, Clone, Serialize)]
pub struct InvitePreview {
    pub invite: InviteView,
    pub group: GroupSummary,
}

// ============================================================================
// Member Responses
// ============================================================================

/// Group member with profile details
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberView {
    #[serde(flatten)]
    pub member: GroupMember,
    pub profile: Option<Profile>,
}
