//! Audit sinks for grant tests

use async_lock::Mutex;
use async_trait::async_trait;
use carepass_core::CarepassError;
use carepass_grant::{AuditEvent, AuditKind, AuditSink};
use std::sync::Arc;

/// Keeps every event in memory
#[derive(Debug, Clone, Default)]
pub struct RecordingAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl RecordingAuditSink {
    /// Empty sink
    pub fn new() -> Self {
        Self::default()
    }

    /// Events recorded so far
    pub async fn events(&self) -> Vec<AuditEvent> {
        self.events.lock().await.clone()
    }

    /// Kinds recorded so far, in order
    pub async fn kinds(&self) -> Vec<AuditKind> {
        self.events.lock().await.iter().map(|e| e.kind).collect()
    }
}

#[async_trait]
impl AuditSink for RecordingAuditSink {
    async fn record(&self, event: &AuditEvent) -> Result<(), CarepassError> {
        self.events.lock().await.push(event.clone());
        Ok(())
    }
}

/// Rejects every event
#[derive(Debug, Clone, Default)]
pub struct FailingAuditSink;

#[async_trait]
impl AuditSink for FailingAuditSink {
    async fn record(&self, _event: &AuditEvent) -> Result<(), CarepassError> {
        Err(CarepassError::storage("audit store offline"))
    }
}
