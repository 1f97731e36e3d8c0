//! Exit codes.

use coterie_config::ConfigError;
use coterie_membership::{ErrorKind, MembershipError};
use thiserror::Error;

/// Invalid invocation that clap could not catch.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("{0}")]
pub struct UsageError(pub String);

pub const EXIT_UNEXPECTED: i32 = 1;
pub const EXIT_USAGE: i32 = 2;
pub const EXIT_NOT_FOUND: i32 = 3;
pub const EXIT_CONFLICT: i32 = 4;
pub const EXIT_FORBIDDEN: i32 = 5;

pub fn exit_code(err: &(dyn std::error::Error + 'static)) -> i32 {
    if let Some(e) = err.downcast_ref::<MembershipError>() {
        return match e.kind() {
            ErrorKind::NotFound => EXIT_NOT_FOUND,
            ErrorKind::Conflict => EXIT_CONFLICT,
            ErrorKind::Forbidden => EXIT_FORBIDDEN,
            ErrorKind::Unexpected => EXIT_UNEXPECTED,
        };
    }
    if err.is::<UsageError>() || err.is::<ConfigError>() {
        return EXIT_USAGE;
    }
    EXIT_UNEXPECTED
}
