//! Metrics for authorization decisions and membership operations.
//!
//! Only the `metrics` facade is used here; the host process installs the recorder.

use metrics::{counter, describe_counter};

use crate::authz::Decision;
use crate::policy::Action;
use crate::MembershipError;

/// Register metric descriptions with the installed recorder.
pub fn describe_metrics() {
    describe_counter!(
        "coterie_authz_decisions_total",
        "Authorization decisions by action and outcome"
    );
    describe_counter!(
        "coterie_membership_ops_total",
        "Membership operations by operation and result"
    );
}

pub(crate) fn record_decision(action: Action, decision: &Decision) {
    let outcome = match decision {
        Decision::Allow { .. } => "allow",
        Decision::Deny(_) => "deny",
    };
    counter!("coterie_authz_decisions_total", "action" => action.as_str(), "outcome" => outcome)
        .increment(1);
}

pub(crate) fn record_op<T>(op: &'static str, result: &Result<T, MembershipError>) {
    let result = match result {
        Ok(_) => "ok",
        Err(e) => e.kind().as_str(),
    };
    counter!("coterie_membership_ops_total", "op" => op, "result" => result).increment(1);
}
