//! Group membership with role-based authorization.
//!
//! [`MembershipService`] is the entry point. Each operation reads the requester's
//! role, checks it against [`policy::REQUIREMENTS`], then applies a single
//! conditional write through the [`coterie_storage::Store`] it was built with.

mod authz;
mod config;
mod error;
mod metrics;
pub mod policy;
mod service;

pub use authz::{Authorizer, Decision, DenyReason};
pub use config::{MembershipConfig, ParseReadPolicyError, ReadPolicy};
pub use error::{ErrorKind, MembershipError};
pub use crate::metrics::describe_metrics;
pub use policy::Action;
pub use service::MembershipService;

#[cfg(test)]
mod tests;
