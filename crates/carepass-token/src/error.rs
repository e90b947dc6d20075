//! Token codec errors
//!
//! Signature failures and expiry are separate variants because the caller
//! remediates them differently: a forged or corrupted code must be re-scanned
//! or reported, an expired one must be re-issued.

use carepass_core::CarepassError;

/// Errors raised while issuing or verifying capability tokens
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// The token could not be decoded at all
    #[error("Malformed token: {0}")]
    Malformed(String),

    /// A signature did not verify
    #[error("Signature verification failed: {0}")]
    SignatureMismatch(String),

    /// The token verified but is past its expiry
    #[error("Token expired at {expired_at_ms}")]
    Expired {
        /// Expiry instant in Unix milliseconds
        expired_at_ms: u64,
    },

    /// Issuer, audience, token use or payload fields are unacceptable
    #[error("Invalid claims: {0}")]
    InvalidClaims(String),

    /// QR rendering failed
    #[error("Rendering failed: {0}")]
    Rendering(String),

    /// Payload could not be serialized
    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl TokenError {
    /// Whether this is a signature failure
    pub fn is_signature_failure(&self) -> bool {
        matches!(self, TokenError::SignatureMismatch(_))
    }

    /// Whether this is an expiry rejection
    pub fn is_expired(&self) -> bool {
        matches!(self, TokenError::Expired { .. })
    }
}

impl From<serde_json::Error> for TokenError {
    fn from(err: serde_json::Error) -> Self {
        TokenError::Serialization(err.to_string())
    }
}

impl From<TokenError> for CarepassError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::SignatureMismatch(_) => CarepassError::crypto(err.to_string()),
            TokenError::Rendering(_) => CarepassError::internal(err.to_string()),
            TokenError::Serialization(_) => CarepassError::serialization(err.to_string()),
            _ => CarepassError::invalid(err.to_string()),
        }
    }
}

/// Result type for token operations
pub type TokenResult<T> = Result<T, TokenError>;
