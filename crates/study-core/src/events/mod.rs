//! Realtime change events

mod change_event;

pub use change_event::{ChangeEvent, ChangeKind, GROUPS_TABLE, INVITES_TABLE, MEMBERS_TABLE};
