//! Group roles and the permission flags they grant

use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt;

bitflags! {
    /// Permission flags derived from a member's role
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct GroupPermissions: u32 {
        /// See the group, its members and notes
        const VIEW_GROUP      = 1 << 0;
        /// Create invites for new members
        const INVITE_MEMBERS  = 1 << 1;
        /// List every invite of the group, revoke invites
        const MANAGE_INVITES  = 1 << 2;
        /// Remove members, change roles
        const MANAGE_MEMBERS  = 1 << 3;
        /// Edit or delete the group itself
        const MANAGE_GROUP    = 1 << 4;

        /// Baseline for plain members
        const DEFAULT = Self::VIEW_GROUP.bits() | Self::INVITE_MEMBERS.bits();

        const ALL = Self::VIEW_GROUP.bits()
            | Self::INVITE_MEMBERS.bits()
            | Self::MANAGE_INVITES.bits()
            | Self::MANAGE_MEMBERS.bits()
            | Self::MANAGE_GROUP.bits();
    }
}

impl GroupPermissions {
    /// Check if the set contains a required permission
    #[inline]
    pub fn has(&self, permission: GroupPermissions) -> bool {
        self.contains(permission)
    }

    /// Names of every individual permission that is set
    pub fn list(&self) -> Vec<&'static str> {
        let mut result = Vec::new();
        if self.contains(Self::VIEW_GROUP) {
            result.push("VIEW_GROUP");
        }
        if self.contains(Self::INVITE_MEMBERS) {
            result.push("INVITE_MEMBERS");
        }
        if self.contains(Self::MANAGE_INVITES) {
            result.push("MANAGE_INVITES");
        }
        if self.contains(Self::MANAGE_MEMBERS) {
            result.push("MANAGE_MEMBERS");
        }
        if self.contains(Self::MANAGE_GROUP) {
            result.push("MANAGE_GROUP");
        }
        result
    }
}

impl Default for GroupPermissions {
    fn default() -> Self {
        GroupPermissions::empty()
    }
}

impl fmt::Display for GroupPermissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.list().join(", "))
    }
}

/// Role of a member inside a group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GroupRole {
    Admin,
    Moderator,
    #[default]
    Member,
}

impl GroupRole {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Moderator => "moderator",
            Self::Member => "member",
        }
    }

    /// Permissions granted by this role
    pub fn permissions(self) -> GroupPermissions {
        match self {
            Self::Admin => GroupPermissions::ALL,
            Self::Moderator => GroupPermissions::DEFAULT | GroupPermissions::MANAGE_MEMBERS,
            Self::Member => GroupPermissions::DEFAULT,
        }
    }

    pub fn parse(s: &str) -> Result<Self, GroupRoleParseError> {
        match s.trim().to_ascii_lowercase().as_str() {
            "admin" => Ok(Self::Admin),
            "moderator" => Ok(Self::Moderator),
            "member" => Ok(Self::Member),
            other => Err(GroupRoleParseError(other.to_string())),
        }
    }
}

impl fmt::Display for GroupRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GroupRole {
    type Err = GroupRoleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown group role: {0}")]
pub struct GroupRoleParseError(pub String);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(GroupRole::Admin.permissions().has(GroupPermissions::MANAGE_INVITES));
        assert!(GroupRole::Member.permissions().has(GroupPermissions::INVITE_MEMBERS));
        assert!(!GroupRole::Member.permissions().has(GroupPermissions::MANAGE_INVITES));
        assert!(!GroupRole::Moderator.permissions().has(GroupPermissions::MANAGE_INVITES));
        assert!(GroupRole::Moderator.permissions().has(GroupPermissions::MANAGE_MEMBERS));
    }

    #[test]
    fn test_permission_list() {
        let perms = GroupPermissions::VIEW_GROUP | GroupPermissions::MANAGE_INVITES;
        assert_eq!(perms.list(), vec!["VIEW_GROUP", "MANAGE_INVITES"]);
        assert_eq!(perms.to_string(), "VIEW_GROUP, MANAGE_INVITES");
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(GroupRole::parse("ADMIN"), Ok(GroupRole::Admin));
        assert_eq!(GroupRole::default(), GroupRole::Member);
        assert!(GroupRole::parse("owner").is_err());
    }
}
