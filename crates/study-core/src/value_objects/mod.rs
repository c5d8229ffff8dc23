//! Value objects - immutable types that represent domain concepts

mod identity;
mod invite_status;
mod invite_token;
mod permissions;
mod record_id;

pub use identity::Caller;
pub use invite_status::{EffectiveStatus, InviteStatus, InviteStatusParseError};
pub use invite_token::{InviteToken, DEFAULT_TOKEN_LENGTH};
pub use permissions::{GroupPermissions, GroupRole, GroupRoleParseError};
pub use record_id::{RecordId, RecordIdParseError};
