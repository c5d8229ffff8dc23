//! Domain errors - error types for the domain layer

use thiserror::Error;

use crate::value_objects::{InviteStatus, RecordId};

/// Domain layer errors
#[derive(Debug, Error)]
pub enum DomainError {
    // =========================================================================
    // Not Found Errors
    // =========================================================================
    #[error("Invite not found: {0}")]
    InviteNotFound(String),

    #[error("Group not found: {0}")]
    GroupNotFound(RecordId),

    #[error("Profile not found: {0}")]
    ProfileNotFound(RecordId),

    #[error("Member not found in group")]
    MemberNotFound,

    // =========================================================================
    // Validation Errors
    // =========================================================================
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Invalid email format")]
    InvalidEmail,

    #[error("Invalid invite target: {0}")]
    InvalidInviteTarget(&'static str),

    #[error("Invite is still pending and cannot be deleted")]
    InviteStillPending,

    // =========================================================================
    // Authorization Errors
    // =========================================================================
    #[error("Not authorized: {0}")]
    NotAuthorized(String),

    #[error("Not a member of this group")]
    NotGroupMember,

    #[error("Invite is addressed to a different identity")]
    IdentityMismatch,

    // =========================================================================
    // Conflict Errors
    // =========================================================================
    #[error("An active invite already exists for this recipient")]
    DuplicateInvite,

    #[error("Already a member of this group")]
    AlreadyMember,

    #[error("Invite was already {status}")]
    AlreadyProcessed { status: InviteStatus },

    // =========================================================================
    // Business Rule Violations
    // =========================================================================
    #[error("Invite has expired")]
    InviteExpired,

    // =========================================================================
    // Infrastructure Errors (wrapped)
    // =========================================================================
    #[error("Network error: {0}")]
    TransientNetwork(String),

    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Cache error: {0}")]
    CacheError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl DomainError {
    /// Get an error code string for client responses
    pub fn code(&self) -> &'static str {
        match self {
            // Not Found
            Self::InviteNotFound(_) => "UNKNOWN_INVITE",
            Self::GroupNotFound(_) => "UNKNOWN_GROUP",
            Self::ProfileNotFound(_) => "UNKNOWN_PROFILE",
            Self::MemberNotFound => "UNKNOWN_MEMBER",

            // Validation
            Self::ValidationError(_) => "VALIDATION_ERROR",
            Self::InvalidEmail => "INVALID_EMAIL",
            Self::InvalidInviteTarget(_) => "INVALID_INVITE_TARGET",
            Self::InviteStillPending => "INVITE_STILL_PENDING",

            // Authorization
            Self::NotAuthorized(_) => "NOT_AUTHORIZED",
            Self::NotGroupMember => "NOT_GROUP_MEMBER",
            Self::IdentityMismatch => "IDENTITY_MISMATCH",

            // Conflict
            Self::DuplicateInvite => "DUPLICATE_INVITE",
            Self::AlreadyMember => "ALREADY_MEMBER",
            Self::AlreadyProcessed { .. } => "ALREADY_PROCESSED",

            // Business Rules
            Self::InviteExpired => "INVITE_EXPIRED",

            // Infrastructure
            Self::TransientNetwork(_) => "NETWORK_ERROR",
            Self::DatabaseError(_) => "DATABASE_ERROR",
            Self::CacheError(_) => "CACHE_ERROR",
            Self::InternalError(_) => "INTERNAL_ERROR",
        }
    }

    /// Check if this is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::InviteNotFound(_)
                | Self::GroupNotFound(_)
                | Self::ProfileNotFound(_)
                | Self::MemberNotFound
        )
    }

    /// Check if this is a validation error
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::ValidationError(_)
                | Self::InvalidEmail
                | Self::InvalidInviteTarget(_)
                | Self::InviteStillPending
        )
    }

    /// Check if this is an authorization error
    pub fn is_authorization(&self) -> bool {
        matches!(
            self,
            Self::NotAuthorized(_) | Self::NotGroupMember | Self::IdentityMismatch
        )
    }

    /// Check if this is a conflict error
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Self::DuplicateInvite | Self::AlreadyMember | Self::AlreadyProcessed { .. }
        )
    }

    /// Check if the operation may succeed when retried unchanged
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransientNetwork(_))
    }

    /// Check if this is an expired-lifetime error
    pub fn is_expired(&self) -> bool {
        matches!(self, Self::InviteExpired)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        let err = DomainError::InviteNotFound("abc".to_string());
        assert_eq!(err.code(), "UNKNOWN_INVITE");

        let err = DomainError::AlreadyProcessed {
            status: InviteStatus::Declined,
        };
        assert_eq!(err.code(), "ALREADY_PROCESSED");
    }

    #[test]
    fn test_classification() {
        assert!(DomainError::InviteNotFound("x".to_string()).is_not_found());
        assert!(DomainError::InvalidInviteTarget("x").is_validation());
        assert!(DomainError::IdentityMismatch.is_authorization());
        assert!(DomainError::DuplicateInvite.is_conflict());
        assert!(DomainError::TransientNetwork("timeout".to_string()).is_transient());
        assert!(!DomainError::DatabaseError("boom".to_string()).is_transient());
        assert!(DomainError::InviteExpired.is_expired());
    }

    #[test]
    fn test_error_display() {
        let err = DomainError::AlreadyProcessed {
            status: InviteStatus::Accepted,
        };
        assert_eq!(err.to_string(), "Invite was already accepted");

        let err = DomainError::InviteNotFound("tok".to_string());
        assert_eq!(err.to_string(), "Invite not found: tok");
    }
}
