//! Data transfer objects
//!
//! This module provides:
//! - Request DTOs with validation for service inputs
//! - Response DTOs returned by the services and cached by the controller
//! - Mappers for assembling responses from domain entities

pub mod mappers;
pub mod requests;
pub mod responses;

pub use requests::{CreateGroupRequest, CreateInviteRequest};

pub use responses::{CreatedInvite, InviteOutcome, InvitePreview, InviteView, MemberView};

pub use mappers::{InviteWithGroup, MemberWithProfile};
