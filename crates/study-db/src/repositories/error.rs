//! Error handling utilities for repositories

use sqlx::Error as SqlxError;
use study_core::error::DomainError;
use study_core::value_objects::InviteToken;

/// Convert SQLx error to DomainError
///
/// Connection-level failures are transient and may be retried; everything
/// else is a database error.
pub fn map_db_error(e: SqlxError) -> DomainError {
    match e {
        SqlxError::Io(_) | SqlxError::PoolTimedOut | SqlxError::PoolClosed => {
            DomainError::TransientNetwork(e.to_string())
        }
        SqlxError::Tls(_) | SqlxError::WorkerCrashed => DomainError::TransientNetwork(e.to_string()),
        _ => DomainError::DatabaseError(e.to_string()),
    }
}

/// Check for unique violation and return appropriate error or fallback
pub fn map_unique_violation<F>(e: SqlxError, on_unique: F) -> DomainError
where
    F: FnOnce() -> DomainError,
{
    if let Some(db_err) = e.as_database_error() {
        if db_err.is_unique_violation() {
            return on_unique();
        }
    }
    map_db_error(e)
}

/// Create an "invite not found" error
pub fn invite_not_found(token: &InviteToken) -> DomainError {
    DomainError::InviteNotFound(token.to_string())
}

/// Create a "member not found" error
pub fn member_not_found() -> DomainError {
    DomainError::MemberNotFound
}
