//! Engine configuration.

use std::fmt;
use std::str::FromStr;

/// Who may read a group's snapshot and member list.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum ReadPolicy {
    /// Any caller may read any group, regardless of its type.
    #[default]
    Open,
    /// Private groups are readable by their members only. Public groups stay open.
    PrivateMembersOnly,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseReadPolicyError(pub String);

impl fmt::Display for ParseReadPolicyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "invalid read policy: {} (expected 'open' or 'private-members-only')",
            self.0
        )
    }
}

impl std::error::Error for ParseReadPolicyError {}

impl FromStr for ReadPolicy {
    type Err = ParseReadPolicyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(ReadPolicy::Open),
            "private-members-only" => Ok(ReadPolicy::PrivateMembersOnly),
            _ => Err(ParseReadPolicyError(s.to_string())),
        }
    }
}

impl ReadPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReadPolicy::Open => "open",
            ReadPolicy::PrivateMembersOnly => "private-members-only",
        }
    }
}

/// Configuration handed to [`crate::MembershipService::new`].
#[derive(Clone, Debug, Default)]
pub struct MembershipConfig {
    pub read_policy: ReadPolicy,
}
