//! Compact HS256 bearer tokens
//!
//! `base64url(header) . base64url(claims) . base64url(HMAC-SHA256(header.claims))`
//! with no padding. Only `HS256` is accepted on decode; a token announcing any
//! other algorithm is rejected before its signature is looked at.

use crate::error::{TokenError, TokenResult};
use crate::signing::{constant_time_eq, hmac_sha256};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use carepass_core::time::MS_PER_SECOND;
use carepass_core::{PhysicalTime, SigningSecret};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

/// The only accepted bearer algorithm
pub const ALG_HS256: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// What a bearer token may be used for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenUse {
    /// Prescription dispensing proof
    Prescription,
    /// Grant-scoped API access after a scan
    Access,
}

/// Claims every bearer token carries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegisteredClaims {
    /// Issuer
    pub iss: String,
    /// Audience
    pub aud: String,
    /// Subject, when the token is bound to one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    /// Issued-at, Unix seconds
    pub iat: u64,
    /// Expiry, Unix seconds
    pub exp: u64,
    /// Intended use
    pub token_use: TokenUse,
}

impl RegisteredClaims {
    /// Build claims valid from `now` for `ttl_secs`
    pub fn new(
        issuer: &str,
        audience: &str,
        sub: Option<String>,
        token_use: TokenUse,
        now: PhysicalTime,
        ttl_secs: u64,
    ) -> Self {
        let iat = now.as_secs();
        Self {
            iss: issuer.to_string(),
            aud: audience.to_string(),
            sub,
            iat,
            exp: iat.saturating_add(ttl_secs),
            token_use,
        }
    }

    /// Expiry in Unix milliseconds
    pub fn expires_at_ms(&self) -> u64 {
        self.exp.saturating_mul(MS_PER_SECOND)
    }

    /// Check issuer, audience, intended use and expiry. The token is still
    /// valid at its `exp` instant and rejected after it.
    pub fn validate(
        &self,
        issuer: &str,
        audience: &str,
        expected_use: TokenUse,
        now: PhysicalTime,
    ) -> TokenResult<()> {
        if self.iss != issuer {
            return Err(TokenError::InvalidClaims(format!(
                "unexpected issuer '{}'",
                self.iss
            )));
        }
        if self.aud != audience {
            return Err(TokenError::InvalidClaims(format!(
                "unexpected audience '{}'",
                self.aud
            )));
        }
        if self.token_use != expected_use {
            return Err(TokenError::InvalidClaims(format!(
                "token issued for {:?}, not {:?}",
                self.token_use, expected_use
            )));
        }
        if now.ts_ms > self.expires_at_ms() {
            return Err(TokenError::Expired {
                expired_at_ms: self.expires_at_ms(),
            });
        }
        Ok(())
    }
}

/// Sign `claims` into a compact bearer token
pub fn sign<C: Serialize>(claims: &C, secret: &SigningSecret) -> TokenResult<String> {
    let header = Header {
        alg: ALG_HS256.to_string(),
        typ: "JWT".to_string(),
    };
    let header_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(&header)?);
    let claims_b64 = URL_SAFE_NO_PAD.encode(serde_json::to_vec(claims)?);
    let signing_input = format!("{header_b64}.{claims_b64}");
    let signature = hmac_sha256(secret, signing_input.as_bytes())?;
    Ok(format!(
        "{signing_input}.{}",
        URL_SAFE_NO_PAD.encode(signature)
    ))
}

/// Verify the signature of a compact bearer token and decode its claims.
///
/// Registered-claim checks are left to the caller via
/// [`RegisteredClaims::validate`].
pub fn verify<C: DeserializeOwned>(token: &str, secret: &SigningSecret) -> TokenResult<C> {
    let mut parts = token.split('.');
    let (header_b64, claims_b64, signature_b64) =
        match (parts.next(), parts.next(), parts.next(), parts.next()) {
            (Some(h), Some(c), Some(s), None) => (h, c, s),
            _ => {
                return Err(TokenError::Malformed(
                    "bearer token must have three segments".to_string(),
                ))
            }
        };

    let header: Header = decode_segment(header_b64, "header")?;
    if header.alg != ALG_HS256 {
        return Err(TokenError::InvalidClaims(format!(
            "unsupported algorithm '{}'",
            header.alg
        )));
    }

    let signature = URL_SAFE_NO_PAD
        .decode(signature_b64)
        .map_err(|e| TokenError::Malformed(format!("signature segment: {e}")))?;
    let expected = hmac_sha256(
        secret,
        format!("{header_b64}.{claims_b64}").as_bytes(),
    )?;
    if !constant_time_eq(&signature, &expected) {
        return Err(TokenError::SignatureMismatch(
            "bearer signature does not match".to_string(),
        ));
    }

    decode_segment(claims_b64, "claims")
}

fn decode_segment<T: DeserializeOwned>(segment: &str, name: &str) -> TokenResult<T> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|e| TokenError::Malformed(format!("{name} segment: {e}")))?;
    serde_json::from_slice(&bytes)
        .map_err(|e| TokenError::Malformed(format!("{name} segment: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secret() -> SigningSecret {
        SigningSecret::new(vec![42u8; 32])
    }

    fn claims(now: PhysicalTime) -> RegisteredClaims {
        RegisteredClaims::new("carepass", "clinic", None, TokenUse::Access, now, 60)
    }

    #[test]
    fn sign_then_verify() {
        let now = PhysicalTime::from_millis(1_700_000_000_000);
        let token = sign(&claims(now), &secret()).unwrap();
        let decoded: RegisteredClaims = verify(&token, &secret()).unwrap();
        assert_eq!(decoded, claims(now));
        assert!(decoded.validate("carepass", "clinic", TokenUse::Access, now).is_ok());
    }

    #[test]
    fn wrong_key_is_a_signature_failure() {
        let now = PhysicalTime::from_millis(1_700_000_000_000);
        let token = sign(&claims(now), &secret()).unwrap();
        let err = verify::<RegisteredClaims>(&token, &SigningSecret::new(vec![1u8; 32]))
            .unwrap_err();
        assert!(err.is_signature_failure());
    }

    #[test]
    fn rejects_alg_none() {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(br#"{"iss":"x"}"#);
        let err = verify::<serde_json::Value>(&format!("{header}.{body}."), &secret()).unwrap_err();
        assert!(matches!(err, TokenError::InvalidClaims(_)));
    }

    #[test]
    fn rejects_wrong_segment_count() {
        let err = verify::<serde_json::Value>("a.b", &secret()).unwrap_err();
        assert!(matches!(err, TokenError::Malformed(_)));
    }

    #[test]
    fn validate_checks_each_claim() {
        let now = PhysicalTime::from_millis(1_700_000_000_000);
        let c = claims(now);
        assert!(c.validate("other", "clinic", TokenUse::Access, now).is_err());
        assert!(c.validate("carepass", "other", TokenUse::Access, now).is_err());
        assert!(c
            .validate("carepass", "clinic", TokenUse::Prescription, now)
            .is_err());
        let at_exp = now.plus_secs(60);
        assert!(c.validate("carepass", "clinic", TokenUse::Access, at_exp).is_ok());
        let later = PhysicalTime::from_millis(at_exp.ts_ms + 1);
        assert!(c
            .validate("carepass", "clinic", TokenUse::Access, later)
            .unwrap_err()
            .is_expired());
    }
}
