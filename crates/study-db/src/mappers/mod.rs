//! Entity to model mappers
//!
//! Conversions between domain entities (study-core) and database models.
//! - `From<Model> for Entity` / `TryFrom` where the row can violate a domain rule
//! - `*Insert` structs: prepare entity data for database operations

mod group;
mod invite;
mod member;
mod profile;

pub use invite::InviteInsert;
pub use member::MemberInsert;
