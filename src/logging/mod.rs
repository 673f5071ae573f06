//! The decision logger (§4.G): one structured `tracing` event per
//! evaluation call, with fields attached rather than interpolated into the
//! message, so a collector can index them. This event doubles as the audit
//! trail; there is no separate audit datastore in this core.

use crate::model::{GrantId, Permission, ResolvedSubject, Resource};

/// `decision` is whatever shape the caller evaluated to (`Vec<Vec<bool>>`
/// for a full matrix, a `bool` for `evaluate_one`, a permission set for
/// `permissions_for`) — logged via its `Debug` impl.
pub fn log_evaluation(
    subject: &ResolvedSubject,
    requested_resources: &[Resource],
    requested_permissions: &[Permission],
    decision: &dyn std::fmt::Debug,
    matched_grant_ids: &[GrantId],
) {
    tracing::info!(
        caller_iss = subject.iss.as_deref().unwrap_or(""),
        caller_sub = subject.sub.as_deref().unwrap_or(""),
        anonymous = subject.anonymous,
        requested_resources = ?requested_resources,
        requested_permissions = ?requested_permissions,
        decision = ?decision,
        matched_grant_ids = ?matched_grant_ids,
        "policy evaluation",
    );
}
