//! Scan-session access tokens
//!
//! Issued after a provider scans a patient code and the grant is live. Each
//! token is bound to exactly one grant and one patient identifier.

use crate::bearer::RegisteredClaims;
use carepass_core::GrantId;
use serde::{Deserialize, Serialize};

/// Claims of a grant-scoped access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    /// The single grant this token authorizes
    pub grant_id: GrantId,
}

impl AccessClaims {
    /// Patient digital identifier the token was issued for
    pub fn digital_identifier(&self) -> Option<&str> {
        self.registered.sub.as_deref()
    }
}

/// An issued access token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    /// Compact bearer token for the `Authorization` header
    pub token: String,
    /// Unix milliseconds
    pub expires_at: u64,
}
