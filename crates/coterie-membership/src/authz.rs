//! Authorization engine.
//!
//! A decision compares the requester's current role in the group against the
//! requirement from [`crate::policy`]. Decisions carry no lock: the write that
//! follows is itself conditional in the store, so a decision going stale between
//! the check and the write cannot produce an inconsistent membership.

use std::fmt;
use std::sync::Arc;

use coterie_storage::{GroupId, Role, Store, StoreError, UserId};
use tracing::{debug, warn};

use crate::metrics::record_decision;
use crate::policy::{self, Action};
use crate::MembershipError;

/// Outcome of an authorization check.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Carries the requester's role at decision time.
    Allow { role: Role },
    Deny(DenyReason),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DenyReason {
    NotAMember,
    InsufficientRole { required: Role, actual: Role },
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::NotAMember => f.write_str("requester is not a member of the group"),
            DenyReason::InsufficientRole { required, actual } => {
                write!(f, "requires role {required}, requester has {actual}")
            }
        }
    }
}

impl Decision {
    /// Decide from the requester's role, if they have one in the group.
    pub fn evaluate(requester_role: Option<Role>, required: Role) -> Decision {
        match requester_role {
            None => Decision::Deny(DenyReason::NotAMember),
            Some(actual) if actual.includes(&required) => Decision::Allow { role: actual },
            Some(actual) => Decision::Deny(DenyReason::InsufficientRole { required, actual }),
        }
    }

    /// Turn a denial into [`MembershipError::Forbidden`].
    pub fn into_result(self) -> Result<Role, MembershipError> {
        match self {
            Decision::Allow { role } => Ok(role),
            Decision::Deny(reason) => Err(MembershipError::Forbidden(reason)),
        }
    }
}

/// Evaluates requester permissions against a group using the store's current state.
pub struct Authorizer<S> {
    store: Arc<S>,
}

impl<S> Clone for Authorizer<S> {
    fn clone(&self) -> Self {
        Self {
            store: self.store.clone(),
        }
    }
}

impl<S: Store> Authorizer<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Check whether `requester` may perform `action` on a member holding `target_role`.
    pub async fn authorize(
        &self,
        group_id: &GroupId,
        requester: &UserId,
        action: Action,
        target_role: Role,
    ) -> Result<Decision, MembershipError> {
        self.decide(
            group_id,
            requester,
            action,
            policy::required_role(action, target_role),
        )
        .await
    }

    /// Check whether `requester` may move a member from `current` to `new`.
    pub async fn authorize_role_change(
        &self,
        group_id: &GroupId,
        requester: &UserId,
        current: Role,
        new: Role,
    ) -> Result<Decision, MembershipError> {
        self.decide(
            group_id,
            requester,
            Action::ChangeRole,
            policy::required_role_for_change(current, new),
        )
        .await
    }

    async fn decide(
        &self,
        group_id: &GroupId,
        requester: &UserId,
        action: Action,
        required: Role,
    ) -> Result<Decision, MembershipError> {
        let requester_role = match self.store.get_group_member(group_id, requester).await {
            Ok(member) => Some(member.role),
            Err(StoreError::NotFound) => None,
            Err(e) => {
                warn!(?group_id, ?requester, %action, error = %e, "Failed to look up requester membership");
                return Err(MembershipError::Unexpected(format!(
                    "failed to look up membership of {requester} in group {group_id}: {e}"
                )));
            }
        };

        let decision = Decision::evaluate(requester_role, required);
        record_decision(action, &decision);
        if let Decision::Deny(reason) = decision {
            debug!(?group_id, ?requester, %action, %reason, "Authorization denied");
        }
        Ok(decision)
    }
}
