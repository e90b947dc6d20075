//! Controllable clock

use async_trait::async_trait;
use carepass_core::effects::{PhysicalTimeEffects, TimeError};
use carepass_core::time::{MS_PER_HOUR, MS_PER_SECOND};
use carepass_core::PhysicalTime;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Controllable time source for deterministic testing.
///
/// Time only moves when the test moves it. Clones share the same clock.
#[derive(Debug, Clone)]
pub struct ControllableTimeSource {
    current_ms: Arc<AtomicU64>,
}

impl ControllableTimeSource {
    /// Create a clock frozen at `initial_ms` (Unix milliseconds)
    pub fn new(initial_ms: u64) -> Self {
        Self {
            current_ms: Arc::new(AtomicU64::new(initial_ms)),
        }
    }

    /// Current reading
    pub fn now(&self) -> PhysicalTime {
        PhysicalTime::from_millis(self.current_ms.load(Ordering::SeqCst))
    }

    /// Jump to an absolute instant
    pub fn set_time(&self, ts_ms: u64) {
        self.current_ms.store(ts_ms, Ordering::SeqCst);
    }

    /// Advance by milliseconds
    pub fn advance_ms(&self, ms: u64) {
        self.current_ms.fetch_add(ms, Ordering::SeqCst);
    }

    /// Advance by seconds
    pub fn advance_secs(&self, secs: u64) {
        self.advance_ms(secs * MS_PER_SECOND);
    }

    /// Advance by hours
    pub fn advance_hours(&self, hours: u64) {
        self.advance_ms(hours * MS_PER_HOUR);
    }
}

#[async_trait]
impl PhysicalTimeEffects for ControllableTimeSource {
    async fn physical_time(&self) -> Result<PhysicalTime, TimeError> {
        Ok(self.now())
    }
}
