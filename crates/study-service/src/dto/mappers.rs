//! Entity to DTO mappers

use chrono::{DateTime, Utc};
use study_core::entities::{GroupInvite, GroupMember, GroupSummary, Profile};

use super::responses::{InviteOutcome, InvitePreview, InviteView, MemberView};

// ============================================================================
// Invite Mappers
// ============================================================================

impl InviteView {
    /// Annotate an invite with its effective status at `now`
    pub fn at(invite: GroupInvite, now: DateTime<Utc>) -> Self {
        let effective_status = invite.effective_status(now);
        Self {
            invite,
            effective_status,
        }
    }

    /// Annotate a list, preserving order
    pub fn annotate(invites: Vec<GroupInvite>, now: DateTime<Utc>) -> Vec<Self> {
        invites.into_iter().map(|i| Self::at(i, now)).collect()
    }
}

impl From<InviteView> for GroupInvite {
    fn from(view: InviteView) -> Self {
        view.invite
    }
}

impl InviteOutcome {
    pub fn applied(invite: GroupInvite) -> Self {
        Self {
            invite,
            applied: true,
        }
    }

    pub fn unchanged(invite: GroupInvite) -> Self {
        Self {
            invite,
            applied: false,
        }
    }
}

/// Helper struct for building an invite preview
pub struct InviteWithGroup {
    pub invite: GroupInvite,
    pub group: GroupSummary,
    pub now: DateTime<Utc>,
}

impl From<InviteWithGroup> for InvitePreview {
    fn from(data: InviteWithGroup) -> Self {
        Self {
            invite: InviteView::at(data.invite, data.now),
            group: data.group,
        }
    }
}

// ============================================================================
// Member Mappers
// ============================================================================

/// Helper struct for member with profile data
pub struct MemberWithProfile {
    pub member: GroupMember,
    pub profile: Option<Profile>,
}

impl From<MemberWithProfile> for MemberView {
    fn from(data: MemberWithProfile) -> Self {
        Self {
            member: data.member,
            profile: data.profile,
        }
    }
}
