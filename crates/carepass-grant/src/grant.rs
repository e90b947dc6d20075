//! Authorization grant model and state machine
//!
//! Transitions are pure: [`transition`] takes a grant and returns the updated
//! grant or a typed rejection, and the service persists the result once.
//!
//! ```text
//! PENDING --approve--> ACTIVE --revoke--> REVOKED
//!    \------deny-------------------------^
//! ```
//!
//! `EXPIRED` is derived at read time whenever `now > expires_at`, whatever the
//! stored status says, and the expiry sweep later writes it down.

use crate::error::GrantError;
use crate::scope::{AccessScope, ScopeFlag};
use carepass_core::{ActorId, GrantId, OrganizationId, PhysicalTime, SubjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stored lifecycle status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GrantStatus {
    Pending,
    Active,
    Expired,
    Revoked,
}

impl GrantStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantStatus::Pending => "PENDING",
            GrantStatus::Active => "ACTIVE",
            GrantStatus::Expired => "EXPIRED",
            GrantStatus::Revoked => "REVOKED",
        }
    }

    /// Whether no transition leaves this status
    pub fn is_terminal(&self) -> bool {
        matches!(self, GrantStatus::Expired | GrantStatus::Revoked)
    }
}

impl fmt::Display for GrantStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Actions that move a grant between statuses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantAction {
    Approve,
    Deny,
    Revoke,
}

impl GrantAction {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            GrantAction::Approve => "approve",
            GrantAction::Deny => "deny",
            GrantAction::Revoke => "revoke",
        }
    }

    /// Past-tense label used in status notifications
    pub fn outcome_label(&self) -> &'static str {
        match self {
            GrantAction::Approve => "approved",
            GrantAction::Deny => "denied",
            GrantAction::Revoke => "revoked",
        }
    }
}

impl fmt::Display for GrantAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrantAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "approve" => Ok(GrantAction::Approve),
            "deny" => Ok(GrantAction::Deny),
            "revoke" => Ok(GrantAction::Revoke),
            other => Err(format!("unknown grant action '{other}'")),
        }
    }
}

/// How urgently the requester needs access
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyLevel {
    Routine,
    Urgent,
    Emergency,
}

/// Where a request came from. Immutable after creation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestMetadata {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub device: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_source: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency_level: Option<UrgencyLevel>,
    /// Requester asked for the grant to start active
    #[serde(default)]
    pub auto_approve: bool,
}

/// A time-boxed, scoped authorization for an organization to access a
/// subject's records
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Grant {
    pub id: GrantId,
    pub subject: SubjectId,
    pub organization: OrganizationId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub requesting_practitioner: Option<ActorId>,
    pub status: GrantStatus,
    pub access_scope: AccessScope,
    pub time_window_hours: u32,
    pub justification: String,
    pub metadata: RequestMetadata,
    /// Unix milliseconds
    pub created_at: u64,
    pub updated_at: u64,
    pub expires_at: u64,
    #[serde(default)]
    pub granted_at: Option<u64>,
    #[serde(default)]
    pub revoked_at: Option<u64>,
    #[serde(default)]
    pub deleted_at: Option<u64>,
    #[serde(default)]
    pub reminder_sent_at: Option<u64>,
    /// Reason given with the last action
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_action_by: Option<ActorId>,
}

impl Grant {
    /// Whether `now` is past the grant's window
    pub fn is_expired(&self, now: PhysicalTime) -> bool {
        now.ts_ms > self.expires_at
    }

    /// Whether the grant was soft-deleted
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    /// Status as seen at `now`: a pending or active grant past its window
    /// reads as `EXPIRED`
    pub fn effective_status(&self, now: PhysicalTime) -> GrantStatus {
        match self.status {
            GrantStatus::Pending | GrantStatus::Active if self.is_expired(now) => {
                GrantStatus::Expired
            }
            status => status,
        }
    }

    /// Actions accepted at `now`
    pub fn allowed_actions(&self, now: PhysicalTime) -> Vec<GrantAction> {
        if self.is_deleted() {
            return Vec::new();
        }
        match self.effective_status(now) {
            GrantStatus::Pending => vec![GrantAction::Approve, GrantAction::Deny],
            GrantStatus::Active => vec![GrantAction::Revoke],
            GrantStatus::Expired | GrantStatus::Revoked => Vec::new(),
        }
    }

    /// Whether the grant currently allows `scope`. Never fails; anything other
    /// than a live, undeleted, active grant with the flag set is a deny.
    pub fn has_permission(&self, scope: ScopeFlag, now: PhysicalTime) -> bool {
        !self.is_deleted()
            && self.effective_status(now) == GrantStatus::Active
            && self.access_scope.allows(scope)
    }

    /// Whether this grant blocks a new request for the same pair
    pub fn blocks_new_request(&self, now: PhysicalTime) -> bool {
        !self.is_deleted() && self.effective_status(now) == GrantStatus::Active
    }
}

/// Apply `action` to `grant`.
///
/// Approving re-bases the window on the approval instant.
pub fn transition(
    grant: &Grant,
    action: GrantAction,
    actor: &ActorId,
    reason: Option<&str>,
    now: PhysicalTime,
) -> Result<Grant, GrantError> {
    let allowed_actions = grant.allowed_actions(now);
    if !allowed_actions.contains(&action) {
        return Err(GrantError::GrantAction {
            action,
            current_status: grant.effective_status(now),
            allowed_actions,
        });
    }

    let mut next = grant.clone();
    match action {
        GrantAction::Approve => {
            next.status = GrantStatus::Active;
            next.granted_at = Some(now.ts_ms);
            next.expires_at = now.plus_hours(u64::from(grant.time_window_hours)).ts_ms;
        }
        GrantAction::Deny => {
            next.status = GrantStatus::Revoked;
        }
        GrantAction::Revoke => {
            next.status = GrantStatus::Revoked;
            next.revoked_at = Some(now.ts_ms);
        }
    }
    next.updated_at = now.ts_ms;
    next.status_reason = reason.map(str::to_string);
    next.last_action_by = Some(actor.clone());
    Ok(next)
}
