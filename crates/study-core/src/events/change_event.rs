//! Row-level change events - what the realtime feed delivers
//!
//! These events are used for:
//! - Invalidating cached queries on every connected client
//! - Notifying an invitee that an invite arrived

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::entities::{Group, GroupInvite, GroupMember};
use crate::value_objects::RecordId;

/// Table holding invite rows
pub const INVITES_TABLE: &str = "group_invites";
/// Table holding membership rows
pub const MEMBERS_TABLE: &str = "group_members";
/// Table holding group rows
pub const GROUPS_TABLE: &str = "groups";

/// Kind of row change
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

impl ChangeKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Insert => "INSERT",
            Self::Update => "UPDATE",
            Self::Delete => "DELETE",
        }
    }
}

/// A single row change on a subscribed table
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub table: String,
    pub kind: ChangeKind,
    /// New row image (absent for deletes)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub record: Option<Value>,
    /// Previous row image (present for updates and deletes when known)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_record: Option<Value>,
    pub committed_at: DateTime<Utc>,
}

impl ChangeEvent {
    pub fn new(table: impl Into<String>, kind: ChangeKind) -> Self {
        Self {
            table: table.into(),
            kind,
            record: None,
            old_record: None,
            committed_at: Utc::now(),
        }
    }

    pub fn with_record(mut self, record: Value) -> Self {
        self.record = Some(record);
        self
    }

    pub fn with_old_record(mut self, old_record: Value) -> Self {
        self.old_record = Some(old_record);
        self
    }

    /// Event for an invite row
    pub fn invite(kind: ChangeKind, invite: &GroupInvite) -> Self {
        let row = invite_row(invite);
        let event = Self::new(INVITES_TABLE, kind);
        match kind {
            ChangeKind::Delete => event.with_old_record(row),
            ChangeKind::Insert | ChangeKind::Update => event.with_record(row),
        }
    }

    /// Event for a membership row
    pub fn member(kind: ChangeKind, member: &GroupMember) -> Self {
        let row = serde_json::json!({
            "group_id": member.group_id,
            "user_id": member.user_id,
            "role": member.role,
            "joined_at": member.joined_at,
        });
        let event = Self::new(MEMBERS_TABLE, kind);
        match kind {
            ChangeKind::Delete => event.with_old_record(row),
            ChangeKind::Insert | ChangeKind::Update => event.with_record(row),
        }
    }

    /// Event for a group row
    pub fn group(kind: ChangeKind, group: &Group) -> Self {
        let row = serde_json::json!({
            "id": group.id,
            "name": group.name,
            "owner_id": group.owner_id,
        });
        let event = Self::new(GROUPS_TABLE, kind);
        match kind {
            ChangeKind::Delete => event.with_old_record(row),
            ChangeKind::Insert | ChangeKind::Update => event.with_record(row),
        }
    }

    /// Get the event type name (e.g. `GROUP_INVITES_INSERT`)
    pub fn event_type(&self) -> String {
        format!("{}_{}", self.table.to_ascii_uppercase(), self.kind.as_str())
    }

    /// Read a field from the new row, falling back to the old row
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.record
            .as_ref()
            .and_then(|r| r.get(name))
            .filter(|v| !v.is_null())
            .or_else(|| {
                self.old_record
                    .as_ref()
                    .and_then(|r| r.get(name))
                    .filter(|v| !v.is_null())
            })
    }

    /// Read an id-valued field
    pub fn id_field(&self, name: &str) -> Option<RecordId> {
        self.field(name)
            .and_then(Value::as_str)
            .and_then(|s| RecordId::parse(s).ok())
    }

    pub fn group_id(&self) -> Option<RecordId> {
        if self.table == GROUPS_TABLE {
            self.id_field("id")
        } else {
            self.id_field("group_id")
        }
    }

    pub fn user_id(&self) -> Option<RecordId> {
        self.id_field("user_id")
    }

    pub fn invitee_id(&self) -> Option<RecordId> {
        self.id_field("invitee_id")
    }

    pub fn email(&self) -> Option<&str> {
        self.field("email").and_then(Value::as_str)
    }
}

/// Flat row image of an invite, shaped like the `group_invites` table
fn invite_row(invite: &GroupInvite) -> Value {
    serde_json::json!({
        "id": invite.id,
        "token": invite.token,
        "group_id": invite.group_id,
        "invited_by": invite.invited_by,
        "invitee_id": invite.invitee_id(),
        "email": invite.email(),
        "status": invite.status,
        "created_at": invite.created_at,
        "expires_at": invite.expires_at,
        "deleted_at": invite.deleted_at,
    })
}
