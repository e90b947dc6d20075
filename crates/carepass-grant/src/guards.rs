//! Capability guards
//!
//! Capabilities are plain strings the directory reports per actor and
//! organization. The patient a grant is about never needs one to act on
//! their own grant.

use crate::error::GrantError;
use crate::grant::GrantAction;
use crate::scope::{AccessScope, ScopeFlag};
use carepass_core::effects::CapabilitySet;
use carepass_core::ActorId;

/// Capability names
pub mod capabilities {
    /// Request a grant on behalf of an organization
    pub const CAP_GRANT_REQUEST: &str = "grant:request";

    /// Approve a pending grant
    pub const CAP_GRANT_APPROVE: &str = "grant:approve";

    /// Deny a pending grant
    pub const CAP_GRANT_DENY: &str = "grant:deny";

    /// Revoke an active grant
    pub const CAP_GRANT_REVOKE: &str = "grant:revoke";

    /// Soft-delete a grant
    pub const CAP_GRANT_DELETE: &str = "grant:delete";

    /// Create a grant that starts active
    pub const CAP_GRANT_AUTO_APPROVE: &str = "grant:auto_approve";

    /// Request the create-encounters scope
    pub const CAP_SCOPE_CREATE_ENCOUNTERS: &str = "scope:create_encounters";

    /// Request the view-audit-logs scope
    pub const CAP_SCOPE_VIEW_AUDIT_LOGS: &str = "scope:view_audit_logs";
}

use capabilities::*;

/// Capability an organization actor needs for `action`
pub fn required_capability(action: GrantAction) -> &'static str {
    match action {
        GrantAction::Approve => CAP_GRANT_APPROVE,
        GrantAction::Deny => CAP_GRANT_DENY,
        GrantAction::Revoke => CAP_GRANT_REVOKE,
    }
}

/// Extra capability needed to request `flag`, if any
pub fn scope_capability(flag: ScopeFlag) -> Option<&'static str> {
    match flag {
        ScopeFlag::ViewHistory | ScopeFlag::ViewPrescriptions => None,
        ScopeFlag::CreateEncounters => Some(CAP_SCOPE_CREATE_ENCOUNTERS),
        ScopeFlag::ViewAuditLogs => Some(CAP_SCOPE_VIEW_AUDIT_LOGS),
    }
}

/// Fail unless `held` contains `required`
pub fn check_capability(
    actor: &ActorId,
    held: &CapabilitySet,
    required: &str,
) -> Result<(), GrantError> {
    if held.contains(required) {
        Ok(())
    } else {
        Err(GrantError::Authorization(format!(
            "{actor} lacks capability '{required}'"
        )))
    }
}

/// Check a practitioner may request `scope`
pub fn check_request(
    actor: &ActorId,
    held: &CapabilitySet,
    scope: &AccessScope,
) -> Result<(), GrantError> {
    check_capability(actor, held, CAP_GRANT_REQUEST)?;
    for flag in scope.flags() {
        if let Some(required) = scope_capability(flag) {
            check_capability(actor, held, required)?;
        }
    }
    Ok(())
}
