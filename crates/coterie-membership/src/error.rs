use coterie_storage::{GroupId, UserId};
use thiserror::Error;

use crate::authz::DenyReason;

/// Domain errors returned by membership operations.
///
/// Exactly one is returned per failed call, and none of them leave a partial write behind.
#[derive(Debug, Error)]
pub enum MembershipError {
    #[error("group {0} not found")]
    GroupNotFound(GroupId),

    #[error("user {user_id} already exists in group {group_id}")]
    UserAlreadyExistsInGroup { group_id: GroupId, user_id: UserId },

    #[error("user {user_id} is not a member of group {group_id}")]
    MemberNotFound { group_id: GroupId, user_id: UserId },

    #[error("forbidden: {0}")]
    Forbidden(DenyReason),

    #[error("user {user_id} is the last owner of group {group_id}")]
    LastOwner { group_id: GroupId, user_id: UserId },

    #[error("role of user {user_id} in group {group_id} changed during the request")]
    RoleChanged { group_id: GroupId, user_id: UserId },

    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Coarse classification for adapters mapping errors to status codes or exit codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    NotFound,
    Conflict,
    Forbidden,
    Unexpected,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::NotFound => "not_found",
            ErrorKind::Conflict => "conflict",
            ErrorKind::Forbidden => "forbidden",
            ErrorKind::Unexpected => "unexpected",
        }
    }
}

impl MembershipError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            MembershipError::GroupNotFound(_) | MembershipError::MemberNotFound { .. } => {
                ErrorKind::NotFound
            }
            MembershipError::UserAlreadyExistsInGroup { .. }
            | MembershipError::LastOwner { .. }
            | MembershipError::RoleChanged { .. } => ErrorKind::Conflict,
            MembershipError::Forbidden(_) => ErrorKind::Forbidden,
            MembershipError::Unexpected(_) => ErrorKind::Unexpected,
        }
    }
}
