//! Audit trail
//!
//! Every mutation emits an [`AuditEvent`]. A failing sink is logged and never
//! aborts the operation that produced the event.

use carepass_core::{ActorId, CarepassError, GrantId, OrganizationId, SubjectId};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// What happened to a grant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditKind {
    Requested,
    Approved,
    Denied,
    Revoked,
    Deleted,
    Expired,
    ScanSessionOpened,
}

/// One audit record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub kind: AuditKind,
    pub grant_id: GrantId,
    pub subject: SubjectId,
    pub organization: OrganizationId,
    /// `None` for system sweeps
    pub actor: Option<ActorId>,
    /// Unix milliseconds
    pub timestamp: u64,
    #[serde(default)]
    pub details: serde_json::Value,
}

/// Destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record one event
    async fn record(&self, event: &AuditEvent) -> Result<(), CarepassError>;
}

#[async_trait]
impl<T: AuditSink + ?Sized> AuditSink for Arc<T> {
    async fn record(&self, event: &AuditEvent) -> Result<(), CarepassError> {
        (**self).record(event).await
    }
}

/// Writes audit events to the `carepass::audit` log target
#[derive(Debug, Clone, Default)]
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), CarepassError> {
        tracing::info!(
            target: "carepass::audit",
            kind = ?event.kind,
            grant_id = %event.grant_id,
            subject = %event.subject,
            organization = %event.organization,
            actor = event.actor.as_ref().map(|a| a.as_str()).unwrap_or("system"),
            timestamp = event.timestamp,
            details = %event.details,
            "grant audit event"
        );
        Ok(())
    }
}
