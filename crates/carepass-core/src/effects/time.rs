//! Time effect interface
//!
//! Every operation that compares against "now" reads the clock through this
//! trait so that expiry, scheduling and backoff are deterministic under test.

use crate::time::PhysicalTime;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Error type for time operations.
#[derive(Debug, Clone, thiserror::Error, Serialize, Deserialize)]
pub enum TimeError {
    #[error("Clock unavailable: {reason}")]
    ClockUnavailable { reason: String },
    #[error("Operation failed: {reason}")]
    OperationFailed { reason: String },
}

/// Wall-clock time for timestamps, expiration and retry scheduling.
#[async_trait]
pub trait PhysicalTimeEffects: Send + Sync {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError>;
}

/// Convenience accessors layered over [`PhysicalTimeEffects`].
#[async_trait]
pub trait TimeEffects: PhysicalTimeEffects {
    /// Current Unix timestamp in milliseconds.
    async fn current_timestamp_ms(&self) -> Result<u64, TimeError> {
        self.physical_time().await.map(|t| t.ts_ms)
    }
}

#[async_trait]
impl<T> TimeEffects for T where T: PhysicalTimeEffects + ?Sized {}

/// Blanket implementation for Arc<T> where T: PhysicalTimeEffects
#[async_trait]
impl<T: PhysicalTimeEffects + ?Sized> PhysicalTimeEffects for std::sync::Arc<T> {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        (**self).physical_time().await
    }
}
