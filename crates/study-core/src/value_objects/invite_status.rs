//! Invite status - the stored lifecycle state and its time-aware display form

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored invite status
///
/// `Pending` is the only non-terminal state. Once an invite leaves it, only
/// its soft-delete marker may still change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InviteStatus {
    #[default]
    Pending,
    Accepted,
    Declined,
    Revoked,
}

impl InviteStatus {
    /// Database / wire representation
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Revoked => "revoked",
        }
    }

    /// Whether this status can no longer transition
    #[inline]
    pub const fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending)
    }

    /// Parse from the database / wire representation
    pub fn parse(s: &str) -> Result<Self, InviteStatusParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "accepted" => Ok(Self::Accepted),
            "declined" => Ok(Self::Declined),
            "revoked" => Ok(Self::Revoked),
            other => Err(InviteStatusParseError(other.to_string())),
        }
    }
}

impl fmt::Display for InviteStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for InviteStatus {
    type Err = InviteStatusParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Error when parsing an unknown status string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown invite status: {0}")]
pub struct InviteStatusParseError(pub String);

/// Status as it should be displayed at a given instant
///
/// Never stored. Derived from [`InviteStatus`] and the expiry timestamp on
/// every read.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectiveStatus {
    Pending,
    Accepted,
    Declined,
    Revoked,
    Expired,
}

impl EffectiveStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Accepted => "accepted",
            Self::Declined => "declined",
            Self::Revoked => "revoked",
            Self::Expired => "expired",
        }
    }

    /// Only a still-pending, unexpired invite is actionable
    #[inline]
    pub const fn is_actionable(self) -> bool {
        matches!(self, Self::Pending)
    }
}

impl From<InviteStatus> for EffectiveStatus {
    fn from(status: InviteStatus) -> Self {
        match status {
            InviteStatus::Pending => Self::Pending,
            InviteStatus::Accepted => Self::Accepted,
            InviteStatus::Declined => Self::Declined,
            InviteStatus::Revoked => Self::Revoked,
        }
    }
}

impl fmt::Display for EffectiveStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
