//! HMAC-SHA256 primitives

use crate::error::{TokenError, TokenResult};
use carepass_core::SigningSecret;
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

type HmacSha256 = Hmac<Sha256>;

/// Algorithm label carried in prescription signature blocks
pub const HMAC_SHA256: &str = "HMAC-SHA256";

/// Compute HMAC-SHA256 of `data` under `secret`
pub fn hmac_sha256(secret: &SigningSecret, data: &[u8]) -> TokenResult<[u8; 32]> {
    let mut mac = HmacSha256::new_from_slice(secret.expose())
        .map_err(|e| TokenError::InvalidClaims(format!("unusable signing key: {e}")))?;
    mac.update(data);
    Ok(mac.finalize().into_bytes().into())
}

/// Compare two byte strings without early exit
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    a.ct_eq(b).into()
}
