//! System clock handler

use async_trait::async_trait;
use carepass_core::effects::{PhysicalTimeEffects, TimeError};
use carepass_core::PhysicalTime;
use std::time::{SystemTime, UNIX_EPOCH};

/// Reads the wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct RealTimeHandler;

impl RealTimeHandler {
    /// Create a new real time handler
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl PhysicalTimeEffects for RealTimeHandler {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        let elapsed = SystemTime::now().duration_since(UNIX_EPOCH).map_err(|e| {
            TimeError::ClockUnavailable {
                reason: format!("system clock is before the Unix epoch: {e}"),
            }
        })?;
        let ts_ms = u64::try_from(elapsed.as_millis()).map_err(|_| TimeError::ClockUnavailable {
            reason: "system clock is out of range".to_string(),
        })?;
        Ok(PhysicalTime::from_millis(ts_ms))
    }
}
