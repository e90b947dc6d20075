//! Grant service configuration

use carepass_core::{ConfigValidation, ConfigValidator, ValidationResult};
use serde::{Deserialize, Serialize};

/// Hard ceiling on any grant window: one week
pub const MAX_TIME_WINDOW_HOURS: u32 = 168;

/// Configuration for the grant service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GrantConfig {
    /// Shortest window a request may ask for
    pub min_time_window_hours: u32,

    /// Longest window a request may ask for
    pub max_time_window_hours: u32,

    /// Minimum justification length, in characters
    pub min_justification_len: usize,

    /// Minimum action reason length, in characters
    pub min_reason_len: usize,

    /// Base for the QR-display and scan URLs returned on request
    pub public_base_url: String,

    /// Lifetime of access-request notifications
    pub request_notification_ttl_hours: u64,

    /// Lifetime of status-update notifications
    pub status_notification_ttl_hours: u64,

    /// Windows at or below this are notified as urgent
    pub urgent_window_hours: u32,

    /// How long before expiry an active grant's subject is reminded
    pub reminder_lead_time_hours: u64,

    /// Whether auto-approval needs a practitioner holding `grant:auto_approve`
    pub auto_approve_requires_capability: bool,

    /// Page size when a query does not choose one
    pub default_page_size: usize,

    /// Largest page a query may ask for
    pub max_page_size: usize,
}

impl Default for GrantConfig {
    fn default() -> Self {
        Self {
            min_time_window_hours: 1,
            max_time_window_hours: MAX_TIME_WINDOW_HOURS,
            min_justification_len: 10,
            min_reason_len: 5,
            public_base_url: "http://localhost:3000".to_string(),
            request_notification_ttl_hours: 48,
            status_notification_ttl_hours: 24,
            urgent_window_hours: 2,
            reminder_lead_time_hours: 2,
            auto_approve_requires_capability: true,
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl ConfigValidation for GrantConfig {
    fn validate(&self) -> ValidationResult {
        let mut v = ConfigValidator::for_section("grants");
        v.range(
            "min_time_window_hours",
            self.min_time_window_hours,
            Some(1),
            Some(self.max_time_window_hours),
        )
        .range(
            "max_time_window_hours",
            self.max_time_window_hours,
            Some(1),
            Some(MAX_TIME_WINDOW_HOURS),
        )
        .url("public_base_url", &self.public_base_url)
        .custom(
            "request_notification_ttl_hours",
            &self.request_notification_ttl_hours,
            |h| *h > 0,
            "must be positive",
        )
        .custom(
            "status_notification_ttl_hours",
            &self.status_notification_ttl_hours,
            |h| *h > 0,
            "must be positive",
        )
        .custom(
            "default_page_size",
            &self.default_page_size,
            |size| *size > 0 && *size <= self.max_page_size,
            "must be between 1 and max_page_size",
        );
        v.result()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(GrantConfig::default().validate().is_ok());
    }

    #[test]
    fn window_above_one_week_is_rejected() {
        let config = GrantConfig {
            max_time_window_hours: 200,
            ..GrantConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
