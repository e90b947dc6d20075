//! Retry delay calculation

use std::time::Duration;

/// Capped exponential backoff: `min(2^retry_count * base, max)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    base_backoff: Duration,
    max_backoff: Duration,
}

impl RetryPolicy {
    /// Create a policy from its base delay and cap
    pub fn new(base_backoff: Duration, max_backoff: Duration) -> Self {
        Self {
            base_backoff,
            max_backoff,
        }
    }

    /// Delay before the retry that follows `retry_count` earlier retries
    pub fn backoff_delay(&self, retry_count: u32) -> Duration {
        let exponential = self
            .base_backoff
            .saturating_mul(2_u32.saturating_pow(retry_count.min(20)));
        exponential.min(self.max_backoff)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(Duration::from_secs(1), Duration::from_secs(300))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn doubles_from_one_second() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff_delay(0), Duration::from_secs(1));
        assert_eq!(policy.backoff_delay(1), Duration::from_secs(2));
        assert_eq!(policy.backoff_delay(2), Duration::from_secs(4));
        assert_eq!(policy.backoff_delay(8), Duration::from_secs(256));
        assert_eq!(policy.backoff_delay(9), Duration::from_secs(300));
    }

    proptest! {
        #[test]
        fn delays_are_monotonic_and_capped(retry in 0u32..64) {
            let policy = RetryPolicy::default();
            let here = policy.backoff_delay(retry);
            let next = policy.backoff_delay(retry + 1);
            prop_assert!(here <= next);
            prop_assert!(next <= Duration::from_secs(300));
        }
    }
}
