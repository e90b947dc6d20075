//! Wall-clock time values
//!
//! All persisted timestamps are Unix milliseconds (`u64`). Bearer-token claims
//! use Unix seconds, converted at the codec boundary.

use serde::{Deserialize, Serialize};

/// Milliseconds per second
pub const MS_PER_SECOND: u64 = 1_000;
/// Milliseconds per minute
pub const MS_PER_MINUTE: u64 = 60 * MS_PER_SECOND;
/// Milliseconds per hour
pub const MS_PER_HOUR: u64 = 60 * MS_PER_MINUTE;
/// Milliseconds per day
pub const MS_PER_DAY: u64 = 24 * MS_PER_HOUR;

/// A physical (wall-clock) timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PhysicalTime {
    /// Unix timestamp in milliseconds
    pub ts_ms: u64,
}

impl PhysicalTime {
    /// Create from Unix milliseconds
    pub fn from_millis(ts_ms: u64) -> Self {
        Self { ts_ms }
    }

    /// Unix seconds, truncated
    pub fn as_secs(&self) -> u64 {
        self.ts_ms / MS_PER_SECOND
    }

    /// This instant shifted forward by `hours`
    pub fn plus_hours(&self, hours: u64) -> Self {
        Self {
            ts_ms: self.ts_ms.saturating_add(hours.saturating_mul(MS_PER_HOUR)),
        }
    }

    /// This instant shifted forward by `secs`
    pub fn plus_secs(&self, secs: u64) -> Self {
        Self {
            ts_ms: self.ts_ms.saturating_add(secs.saturating_mul(MS_PER_SECOND)),
        }
    }

    /// This instant shifted backward by `hours`, clamped at the epoch
    pub fn minus_hours(&self, hours: u64) -> Self {
        Self {
            ts_ms: self.ts_ms.saturating_sub(hours.saturating_mul(MS_PER_HOUR)),
        }
    }
}
