//! # study-service
//!
//! Application layer: the invite service, membership and group reads, the
//! retry policy, and the invite lifecycle controller that keeps the query
//! cache in step with server state.

pub mod controller;
pub mod dto;
pub mod services;

pub use controller::{Feedback, InviteAction, InviteLifecycleController, ServiceFetcher};
pub use services::{
    FeedbackKind, GroupService, InviteService, InviteSettings, MemberService, PermissionService,
    RetryPolicy, ServiceContext, ServiceContextBuilder, ServiceError, ServiceResult,
};
