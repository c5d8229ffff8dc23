//! Database models - SQLx-compatible structs for PostgreSQL tables

mod group;
mod invite;
mod member;
mod profile;

pub use group::{GroupModel, GroupWithCountModel};
pub use invite::InviteModel;
pub use member::MemberModel;
pub use profile::ProfileModel;
