//! Pub/Sub channel definitions.
//!
//! Every subscribed table gets its own Redis channel.

use study_core::events::{GROUPS_TABLE, INVITES_TABLE, MEMBERS_TABLE};

/// Prefix shared by all realtime channels
pub const CHANNEL_PREFIX: &str = "realtime:";
/// Channel prefix for table change events
pub const TABLE_CHANNEL_PREFIX: &str = "realtime:table:";

/// Pub/Sub channel types
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RealtimeChannel {
    /// Row changes on one table
    Table(String),
    /// Custom channel name
    Custom(String),
}

impl RealtimeChannel {
    #[must_use]
    pub fn table(name: impl Into<String>) -> Self {
        Self::Table(name.into())
    }

    /// Channels for every table the invite flow depends on
    #[must_use]
    pub fn invite_tables() -> Vec<Self> {
        [INVITES_TABLE, MEMBERS_TABLE, GROUPS_TABLE]
            .into_iter()
            .map(Self::table)
            .collect()
    }

    /// Get the Redis channel name
    #[must_use]
    pub fn name(&self) -> String {
        match self {
            Self::Table(table) => format!("{TABLE_CHANNEL_PREFIX}{table}"),
            Self::Custom(name) => name.clone(),
        }
    }

    /// Parse a channel name back to a `RealtimeChannel`
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name.strip_prefix(TABLE_CHANNEL_PREFIX) {
            Some(table) if !table.is_empty() => Self::Table(table.to_string()),
            _ => Self::Custom(name.to_string()),
        }
    }
}

impl std::fmt::Display for RealtimeChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
