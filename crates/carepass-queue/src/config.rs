//! Queue configuration

use carepass_core::{ConfigValidation, ConfigValidator, ValidationResult};
use serde::{Deserialize, Serialize};

/// Retry, lifetime and batching defaults for the notification queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Retries allowed when an enqueue does not choose its own bound
    pub default_max_retries: u32,

    /// First retry delay; doubled on every further attempt
    pub base_backoff_ms: u64,

    /// Ceiling on any single retry delay
    pub max_backoff_ms: u64,

    /// Lifetime of a job when an enqueue does not choose its own
    pub default_ttl_hours: u64,

    /// Jobs taken per batch when the caller does not choose a limit
    pub default_batch_limit: usize,

    /// Per-job delivery deadline. `None` lets a delivery run unbounded.
    pub delivery_timeout_ms: Option<u64>,

    /// How long a claimed job stays `PROCESSING` before another batch may
    /// take it over. Must exceed `delivery_timeout_ms`.
    pub claim_lease_ms: u64,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_max_retries: 3,
            base_backoff_ms: 1_000,
            max_backoff_ms: 5 * 60 * 1_000,
            default_ttl_hours: 24,
            default_batch_limit: 50,
            delivery_timeout_ms: Some(30_000),
            claim_lease_ms: 5 * 60 * 1_000,
        }
    }
}

impl ConfigValidation for QueueConfig {
    fn validate(&self) -> ValidationResult {
        let mut v = ConfigValidator::for_section("queue");
        v.range("default_max_retries", self.default_max_retries, Some(0), Some(10))
            .range(
                "base_backoff_ms",
                self.base_backoff_ms,
                Some(1),
                Some(self.max_backoff_ms),
            )
            .range(
                "default_ttl_hours",
                self.default_ttl_hours,
                Some(1),
                Some(24 * 30),
            )
            .range(
                "default_batch_limit",
                self.default_batch_limit,
                Some(1),
                Some(1_000),
            )
            .custom(
                "delivery_timeout_ms",
                &self.delivery_timeout_ms,
                |t| t.map_or(true, |ms| ms > 0),
                "must be positive when set",
            )
            .custom(
                "claim_lease_ms",
                &self.claim_lease_ms,
                |lease| *lease > 0 && self.delivery_timeout_ms.map_or(true, |t| *lease > t),
                "must be positive and longer than delivery_timeout_ms",
            );
        v.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(QueueConfig::default().validate().is_ok());
    }

    #[test]
    fn base_backoff_above_cap_is_rejected() {
        let config = QueueConfig {
            base_backoff_ms: 10_000,
            max_backoff_ms: 1_000,
            ..QueueConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn claim_lease_must_outlast_delivery_timeout() {
        let config = QueueConfig {
            delivery_timeout_ms: Some(30_000),
            claim_lease_ms: 30_000,
            ..QueueConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("claim_lease_ms"));

        let unbounded = QueueConfig {
            delivery_timeout_ms: None,
            claim_lease_ms: 1_000,
            ..QueueConfig::default()
        };
        assert!(unbounded.validate().is_ok());
    }
}
