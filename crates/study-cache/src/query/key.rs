//! Cache partition keys

use std::fmt;
use std::str::FromStr;

use study_core::value_objects::RecordId;

/// Invites of a group (admin view)
pub const GROUP_INVITES_PREFIX: &str = "invites:group:";
/// Invites addressed to a user
pub const MY_INVITES_PREFIX: &str = "invites:me:";
/// Profiles that can still be invited to a group
pub const NON_MEMBERS_PREFIX: &str = "non_members:group:";
/// Members of a group
pub const GROUP_MEMBERS_PREFIX: &str = "members:group:";
/// Groups a user belongs to
pub const USER_GROUPS_PREFIX: &str = "groups:user:";

/// One cached partition of server data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum QueryKey {
    GroupInvites(RecordId),
    MyInvites(RecordId),
    NonMembers(RecordId),
    GroupMembers(RecordId),
    UserGroups(RecordId),
}

impl QueryKey {
    pub const fn prefix(&self) -> &'static str {
        match self {
            Self::GroupInvites(_) => GROUP_INVITES_PREFIX,
            Self::MyInvites(_) => MY_INVITES_PREFIX,
            Self::NonMembers(_) => NON_MEMBERS_PREFIX,
            Self::GroupMembers(_) => GROUP_MEMBERS_PREFIX,
            Self::UserGroups(_) => USER_GROUPS_PREFIX,
        }
    }

    /// The group or user this partition belongs to
    pub const fn id(&self) -> RecordId {
        match self {
            Self::GroupInvites(id)
            | Self::MyInvites(id)
            | Self::NonMembers(id)
            | Self::GroupMembers(id)
            | Self::UserGroups(id) => *id,
        }
    }

    #[must_use]
    pub fn name(&self) -> String {
        format!("{}{}", self.prefix(), self.id())
    }

    pub fn parse(name: &str) -> Result<Self, QueryKeyParseError> {
        let builders: [(&str, fn(RecordId) -> Self); 5] = [
            (GROUP_INVITES_PREFIX, Self::GroupInvites),
            (MY_INVITES_PREFIX, Self::MyInvites),
            (NON_MEMBERS_PREFIX, Self::NonMembers),
            (GROUP_MEMBERS_PREFIX, Self::GroupMembers),
            (USER_GROUPS_PREFIX, Self::UserGroups),
        ];

        for (prefix, build) in builders {
            if let Some(id) = name.strip_prefix(prefix) {
                return RecordId::parse(id)
                    .map(build)
                    .map_err(|_| QueryKeyParseError::InvalidId(name.to_string()));
            }
        }
        Err(QueryKeyParseError::UnknownPartition(name.to_string()))
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.prefix(), self.id())
    }
}

impl FromStr for QueryKey {
    type Err = QueryKeyParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryKeyParseError {
    #[error("Unknown query partition: {0}")]
    UnknownPartition(String),

    #[error("Invalid id in query key: {0}")]
    InvalidId(String),
}
