//! Domain entities - core business objects

mod group;
mod invite;
mod member;
mod profile;

pub use group::{Group, GroupSummary};
pub use invite::{effective_status, GroupInvite, InviteTarget, StatusCounts};
pub use member::GroupMember;
pub use profile::Profile;
