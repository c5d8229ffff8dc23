//! # study-core
//!
//! Domain layer for study-group invites: entities, the effective-status
//! derivation, value objects, repository ports, and realtime change events.
//! This crate has zero dependencies on infrastructure (database, cache, etc.).

pub mod entities;
pub mod error;
pub mod events;
pub mod traits;
pub mod value_objects;

// Re-export commonly used types at crate root
pub use entities::{
    effective_status, Group, GroupInvite, GroupMember, GroupSummary, InviteTarget, Profile,
    StatusCounts,
};
pub use error::DomainError;
pub use events::{ChangeEvent, ChangeKind};
pub use traits::{
    ChangePublisher, Clock, GroupRepository, InviteNotifier, InviteRepository, ManualClock,
    MemberRepository, NoopNotifier, ProfileRepository, RepoResult, SystemClock,
};
pub use value_objects::{
    Caller, EffectiveStatus, GroupPermissions, GroupRole, InviteStatus, InviteToken, RecordId,
    RecordIdParseError,
};
