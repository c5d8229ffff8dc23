//! Service layer error types
//!
//! Provides a unified error type for all service operations.

use std::fmt;

use serde::{Deserialize, Serialize};
use study_common::AppError;
use study_core::{DomainError, InviteToken};

/// Service layer error type
#[derive(Debug)]
pub enum ServiceError {
    /// Domain rule violation
    Domain(DomainError),

    /// Application error (auth, config, etc.)
    App(AppError),

    /// Resource not found
    NotFound { resource: &'static str, id: String },

    /// Caller lacks a group permission
    PermissionDenied { permission: String },

    /// Validation error
    Validation(String),

    /// A mutation on this invite is already running
    MutationInFlight { token: InviteToken },

    /// Internal error
    Internal(String),
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Domain(e) => write!(f, "{e}"),
            Self::App(e) => write!(f, "{e}"),
            Self::NotFound { resource, id } => write!(f, "{resource} not found: {id}"),
            Self::PermissionDenied { permission } => {
                write!(f, "Missing required permission: {permission}")
            }
            Self::Validation(msg) => write!(f, "Validation error: {msg}"),
            Self::MutationInFlight { .. } => {
                write!(f, "This invite is already being updated")
            }
            Self::Internal(msg) => write!(f, "Internal error: {msg}"),
        }
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Domain(e) => Some(e),
            Self::App(e) => Some(e),
            _ => None,
        }
    }
}

/// How a failure is presented to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FeedbackKind {
    Success,
    /// Non-fatal, e.g. the invite was already handled elsewhere
    Info,
    Error,
}

impl ServiceError {
    pub fn not_found(resource: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource,
            id: id.into(),
        }
    }

    pub fn permission_denied(permission: impl Into<String>) -> Self {
        Self::PermissionDenied {
            permission: permission.into(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// The wrapped domain error, if any
    pub fn as_domain(&self) -> Option<&DomainError> {
        match self {
            Self::Domain(e) | Self::App(AppError::Domain(e)) => Some(e),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
            || self.as_domain().is_some_and(DomainError::is_not_found)
    }

    pub fn is_authorization(&self) -> bool {
        matches!(self, Self::PermissionDenied { .. })
            || self.as_domain().is_some_and(DomainError::is_authorization)
    }

    pub fn is_validation(&self) -> bool {
        matches!(self, Self::Validation(_))
            || self.as_domain().is_some_and(DomainError::is_validation)
    }

    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::MutationInFlight { .. })
            || self.as_domain().is_some_and(DomainError::is_conflict)
    }

    pub fn is_expired(&self) -> bool {
        self.as_domain().is_some_and(DomainError::is_expired)
    }

    /// Worth retrying unchanged
    pub fn is_transient(&self) -> bool {
        match self {
            Self::App(e) => e.is_transient(),
            _ => self.as_domain().is_some_and(DomainError::is_transient),
        }
    }

    /// Concurrent-actor conflicts are informational; everything else is an error
    pub fn feedback_kind(&self) -> FeedbackKind {
        match self {
            Self::MutationInFlight { .. }
            | Self::Domain(DomainError::AlreadyProcessed { .. }) => FeedbackKind::Info,
            _ => FeedbackKind::Error,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Domain(e) => {
                if e.is_not_found() {
                    404
                } else if e.is_authorization() {
                    403
                } else if e.is_validation() {
                    400
                } else if e.is_conflict() {
                    409
                } else if e.is_expired() {
                    410
                } else if e.is_transient() {
                    503
                } else {
                    500
                }
            }
            Self::App(e) => e.status_code(),
            Self::NotFound { .. } => 404,
            Self::PermissionDenied { .. } => 403,
            Self::Validation(_) => 400,
            Self::MutationInFlight { .. } => 409,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code for client responses
    pub fn error_code(&self) -> &str {
        match self {
            Self::Domain(e) => e.code(),
            Self::App(e) => e.error_code(),
            Self::NotFound { .. } => "NOT_FOUND",
            Self::PermissionDenied { .. } => "NOT_AUTHORIZED",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::MutationInFlight { .. } => "MUTATION_IN_FLIGHT",
            Self::Internal(_) => "INTERNAL_ERROR",
        }
    }
}

impl From<DomainError> for ServiceError {
    fn from(err: DomainError) -> Self {
        Self::Domain(err)
    }
}

impl From<AppError> for ServiceError {
    fn from(err: AppError) -> Self {
        Self::App(err)
    }
}

impl From<validator::ValidationErrors> for ServiceError {
    fn from(err: validator::ValidationErrors) -> Self {
        Self::Validation(err.to_string())
    }
}

impl From<ServiceError> for AppError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) => AppError::Domain(e),
            ServiceError::App(e) => e,
            ServiceError::NotFound { resource, id } => {
                AppError::NotFound(format!("{resource} {id}"))
            }
            ServiceError::PermissionDenied { permission } => {
                AppError::Domain(DomainError::NotAuthorized(permission))
            }
            ServiceError::Validation(msg) => AppError::Validation(msg),
            err @ ServiceError::MutationInFlight { .. } => AppError::Conflict(err.to_string()),
            ServiceError::Internal(msg) => AppError::Internal(anyhow::anyhow!(msg)),
        }
    }
}

impl From<ServiceError> for DomainError {
    fn from(err: ServiceError) -> Self {
        match err {
            ServiceError::Domain(e) | ServiceError::App(AppError::Domain(e)) => e,
            ServiceError::PermissionDenied { permission } => DomainError::NotAuthorized(permission),
            ServiceError::Validation(msg) => DomainError::ValidationError(msg),
            other if other.is_transient() => DomainError::TransientNetwork(other.to_string()),
            other => DomainError::InternalError(other.to_string()),
        }
    }
}

/// Result type for service operations
pub type ServiceResult<T> = Result<T, ServiceError>;
