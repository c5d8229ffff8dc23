//! Group invite entity - a capability granting one identity the right to join one group

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::ValidateEmail;

use crate::error::DomainError;
use crate::value_objects::{EffectiveStatus, InviteStatus, InviteToken, RecordId};

/// Who an invite is addressed to: an existing user or an external address
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InviteTarget {
    User(RecordId),
    Email(String),
}

impl InviteTarget {
    /// Build a target from the two mutually exclusive inputs
    ///
    /// Exactly one of `invitee_id` / `email` must be supplied. Emails are
    /// trimmed, lowercased, and checked for a valid format.
    pub fn from_parts(
        invitee_id: Option<RecordId>,
        email: Option<&str>,
    ) -> Result<Self, DomainError> {
        let email = email.map(str::trim).filter(|e| !e.is_empty());
        match (invitee_id, email) {
            (Some(id), None) => Ok(Self::User(id)),
            (None, Some(email)) => Self::email(email),
            (None, None) => Err(DomainError::InvalidInviteTarget(
                "either an invitee or an email is required",
            )),
            (Some(_), Some(_)) => Err(DomainError::InvalidInviteTarget(
                "an invite targets an invitee or an email, not both",
            )),
        }
    }

    /// Email target with format validation
    pub fn email(address: &str) -> Result<Self, DomainError> {
        let normalized = address.trim().to_ascii_lowercase();
        if !normalized.validate_email() {
            return Err(DomainError::InvalidEmail);
        }
        Ok(Self::Email(normalized))
    }

    pub fn invitee_id(&self) -> Option<RecordId> {
        match self {
            Self::User(id) => Some(*id),
            Self::Email(_) => None,
        }
    }

    pub fn email_address(&self) -> Option<&str> {
        match self {
            Self::User(_) => None,
            Self::Email(email) => Some(email),
        }
    }

    /// Same recipient, comparing addresses case-insensitively
    pub fn same_recipient(&self, other: &InviteTarget) -> bool {
        match (self, other) {
            (Self::User(a), Self::User(b)) => a == b,
            (Self::Email(a), Self::Email(b)) => a.eq_ignore_ascii_case(b),
            _ => false,
        }
    }
}

/// Group invite entity
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupInvite {
    pub id: RecordId,
    pub token: InviteToken,
    pub group_id: RecordId,
    pub invited_by: RecordId,
    pub target: InviteTarget,
    pub status: InviteStatus,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl GroupInvite {
    /// Create a new pending invite
    pub fn new(
        group_id: RecordId,
        invited_by: RecordId,
        target: InviteTarget,
        token: InviteToken,
        created_at: DateTime<Utc>,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: RecordId::new_v4(),
            token,
            group_id,
            invited_by,
            target,
            status: InviteStatus::Pending,
            created_at,
            expires_at,
            deleted_at: None,
        }
    }

    /// Status to display at `now`
    #[inline]
    pub fn effective_status(&self, now: DateTime<Utc>) -> EffectiveStatus {
        effective_status(self, now)
    }

    /// Past its expiry instant (strictly after `expires_at`)
    #[inline]
    pub fn is_past_expiry(&self, now: DateTime<Utc>) -> bool {
        now > self.expires_at
    }

    #[inline]
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Outstanding: not deleted, still pending and not expired
    pub fn is_active(&self, now: DateTime<Utc>) -> bool {
        !self.is_deleted() && self.effective_status(now).is_actionable()
    }

    pub fn invitee_id(&self) -> Option<RecordId> {
        self.target.invitee_id()
    }

    pub fn email(&self) -> Option<&str> {
        self.target.email_address()
    }
}

/// Derive the display status of an invite at `now`
///
/// A pending invite whose expiry lies strictly in the past is `Expired`. At
/// exactly `expires_at` it is still `Pending`.
pub fn effective_status(invite: &GroupInvite, now: DateTime<Utc>) -> EffectiveStatus {
    if invite.status == InviteStatus::Pending && now > invite.expires_at {
        EffectiveStatus::Expired
    } else {
        EffectiveStatus::from(invite.status)
    }
}

/// Invite totals bucketed by effective status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub accepted: usize,
    pub declined: usize,
    pub revoked: usize,
    pub expired: usize,
}

impl StatusCounts {
    /// Count invites by their effective status at `now`
    pub fn tally<'a, I>(invites: I, now: DateTime<Utc>) -> Self
    where
        I: IntoIterator<Item = &'a GroupInvite>,
    {
        let mut counts = Self::default();
        for invite in invites {
            match invite.effective_status(now) {
                EffectiveStatus::Pending => counts.pending += 1,
                EffectiveStatus::Accepted => counts.accepted += 1,
                EffectiveStatus::Declined => counts.declined += 1,
                EffectiveStatus::Revoked => counts.revoked += 1,
                EffectiveStatus::Expired => counts.expired += 1,
            }
        }
        counts
    }

    pub fn get(&self, status: EffectiveStatus) -> usize {
        match status {
            EffectiveStatus::Pending => self.pending,
            EffectiveStatus::Accepted => self.accepted,
            EffectiveStatus::Declined => self.declined,
            EffectiveStatus::Revoked => self.revoked,
            EffectiveStatus::Expired => self.expired,
        }
    }

    pub fn total(&self) -> usize {
        self.pending + self.accepted + self.declined + self.revoked + self.expired
    }
}
