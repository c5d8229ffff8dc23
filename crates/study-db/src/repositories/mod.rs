//! Repository implementations
//!
//! PostgreSQL implementations of the repository traits defined in study-core.
//! Each repository handles database operations for a specific domain entity.

mod error;
mod group;
mod invite;
mod member;
mod profile;

pub use error::map_db_error;
pub use group::PgGroupRepository;
pub use invite::PgInviteRepository;
pub use member::PgMemberRepository;
pub use profile::PgProfileRepository;
