//! Token codec configuration

use carepass_core::secret::MIN_SECRET_LEN;
use carepass_core::{ConfigValidation, ConfigValidator, SigningSecret, ValidationResult};
use serde::{Deserialize, Serialize};

/// Configuration for the capability token codec.
///
/// Both secrets default to empty, which fails validation: they must always be
/// supplied by the deployment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenConfig {
    /// Key for the HMAC signature block embedded in prescription payloads
    pub signing_secret: SigningSecret,

    /// Key for the HS256 bearer-token envelope
    pub bearer_secret: SigningSecret,

    /// Identifier of `signing_secret`, echoed in every signature block
    pub key_id: String,

    /// Bearer-token issuer claim
    pub issuer: String,

    /// Bearer-token audience claim
    pub audience: String,

    /// Bearer validity window for prescription tokens
    pub prescription_validity_days: u64,

    /// Age after which a patient code is flagged as stale
    pub patient_token_stale_after_hours: u64,

    /// Access-token lifetime used when the caller does not choose one
    pub default_access_ttl_secs: u64,

    /// Longest access-token lifetime the codec will issue
    pub max_access_ttl_secs: u64,

    /// Minimum rendered QR edge in pixels
    pub qr_min_size: u32,
}

impl Default for TokenConfig {
    fn default() -> Self {
        Self {
            signing_secret: SigningSecret::default(),
            bearer_secret: SigningSecret::default(),
            key_id: "carepass-hmac-1".to_string(),
            issuer: "carepass".to_string(),
            audience: "carepass-clients".to_string(),
            prescription_validity_days: 30,
            patient_token_stale_after_hours: 24,
            default_access_ttl_secs: 15 * 60,
            max_access_ttl_secs: 24 * 60 * 60,
            qr_min_size: 256,
        }
    }
}

impl ConfigValidation for TokenConfig {
    fn validate(&self) -> ValidationResult {
        let mut v = ConfigValidator::for_section("tokens");
        v.custom(
            "signing_secret",
            &self.signing_secret,
            SigningSecret::is_strong,
            &format!("must be at least {MIN_SECRET_LEN} bytes"),
        )
        .custom(
            "bearer_secret",
            &self.bearer_secret,
            SigningSecret::is_strong,
            &format!("must be at least {MIN_SECRET_LEN} bytes"),
        )
        .custom(
            "bearer_secret",
            &self.bearer_secret,
            |b| b != &self.signing_secret,
            "must differ from signing_secret",
        )
        .required("key_id", &self.key_id)
        .required("issuer", &self.issuer)
        .required("audience", &self.audience)
        .range(
            "prescription_validity_days",
            self.prescription_validity_days,
            Some(1),
            Some(365),
        )
        .range(
            "default_access_ttl_secs",
            self.default_access_ttl_secs,
            Some(1),
            Some(self.max_access_ttl_secs),
        )
        .range("qr_min_size", self.qr_min_size, Some(64), Some(4096));
        v.result()
    }
}
