//! Business logic services
//!
//! Each service borrows the shared `ServiceContext` and takes the calling
//! identity explicitly.

pub mod context;
pub mod error;
pub mod group;
pub mod invite;
pub mod member;
pub mod permission;
pub mod retry;

// Re-export all services for convenience
pub use context::{InviteSettings, ServiceContext, ServiceContextBuilder};
pub use error::{FeedbackKind, ServiceError, ServiceResult};
pub use group::GroupService;
pub use invite::InviteService;
pub use member::MemberService;
pub use permission::PermissionService;
pub use retry::RetryPolicy;
