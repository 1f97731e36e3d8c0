//! Role types for group membership.

use std::fmt;
use std::str::FromStr;

/// Role a user holds within a group.
///
/// Variants are declared lowest first so the derived `Ord` is the permission order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Role {
    Member,
    Admin,
    Owner,
}

/// Error type for parsing Role from a string or level
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseRoleError(pub String);

impl fmt::Display for ParseRoleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid role: {}", self.0)
    }
}

impl std::error::Error for ParseRoleError {}

impl FromStr for Role {
    type Err = ParseRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "member" => Ok(Role::Member),
            "admin" => Ok(Role::Admin),
            "owner" => Ok(Role::Owner),
            _ => Err(ParseRoleError(s.to_string())),
        }
    }
}

impl TryFrom<u8> for Role {
    type Error = ParseRoleError;

    fn try_from(level: u8) -> Result<Self, Self::Error> {
        match level {
            0 => Ok(Role::Member),
            1 => Ok(Role::Admin),
            2 => Ok(Role::Owner),
            _ => Err(ParseRoleError(level.to_string())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Role {
    pub const ALL: [Role; 3] = [Role::Member, Role::Admin, Role::Owner];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Member => "member",
            Role::Admin => "admin",
            Role::Owner => "owner",
        }
    }

    /// Numeric level used by external callers (0 = member, 2 = owner).
    pub fn level(&self) -> u8 {
        match self {
            Role::Member => 0,
            Role::Admin => 1,
            Role::Owner => 2,
        }
    }

    pub fn lowest() -> Role {
        Role::Member
    }

    pub fn highest() -> Role {
        Role::Owner
    }

    /// Check if this role has at least the permissions of another role
    pub fn includes(&self, other: &Role) -> bool {
        self >= other
    }
}

/// Visibility of a group
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GroupType {
    Private,
    Public,
}

/// Error type for parsing GroupType from string
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseGroupTypeError(pub String);

impl fmt::Display for ParseGroupTypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid group type: {}", self.0)
    }
}

impl std::error::Error for ParseGroupTypeError {}

impl FromStr for GroupType {
    type Err = ParseGroupTypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(GroupType::Private),
            "public" => Ok(GroupType::Public),
            _ => Err(ParseGroupTypeError(s.to_string())),
        }
    }
}

impl GroupType {
    pub fn as_str(&self) -> &'static str {
        match self {
            GroupType::Private => "private",
            GroupType::Public => "public",
        }
    }
}
