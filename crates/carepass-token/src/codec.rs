//! Token codec
//!
//! Stateless: every operation takes the current time explicitly, so the
//! codec can be driven from a clock effect in services and from fixed
//! instants in tests.

use crate::access::{AccessClaims, AccessToken};
use crate::bearer::{self, RegisteredClaims, TokenUse};
use crate::config::TokenConfig;
use crate::error::{TokenError, TokenResult};
use crate::patient::{self, PatientQrCode, ScannedPatient};
use crate::prescription::{PrescriptionClaims, PrescriptionData, SignatureBlock};
use crate::signing::{constant_time_eq, HMAC_SHA256};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use carepass_core::{GrantId, PhysicalTime};

const SECS_PER_DAY: u64 = 24 * 60 * 60;

/// Issues and verifies capability tokens
#[derive(Debug, Clone)]
pub struct TokenCodec {
    config: TokenConfig,
}

impl TokenCodec {
    /// Create a codec. The configuration is expected to have been validated.
    pub fn new(config: TokenConfig) -> Self {
        Self { config }
    }

    /// Codec configuration
    pub fn config(&self) -> &TokenConfig {
        &self.config
    }

    // =========================================================================
    // Patient identification
    // =========================================================================

    /// Build and render an unsigned patient identification code
    pub fn issue_patient_token(
        &self,
        digital_identifier: &str,
        now: PhysicalTime,
    ) -> TokenResult<PatientQrCode> {
        let payload = patient::build_payload(digital_identifier, now)?;
        let json = serde_json::to_string(&payload)?;
        let svg = patient::render_svg(&json, self.config.qr_min_size)?;
        Ok(PatientQrCode { payload, json, svg })
    }

    /// Validate a scanned patient code. `None` means "re-scan".
    pub fn validate_patient_token(&self, raw: &str, now: PhysicalTime) -> Option<ScannedPatient> {
        let scanned =
            patient::parse_scanned(raw, now, self.config.patient_token_stale_after_hours);
        match &scanned {
            Some(s) if s.stale => tracing::debug!(
                issued_at = s.timestamp,
                "patient code is older than the staleness window"
            ),
            Some(_) => {}
            None => tracing::debug!("scanned payload is not a patient code"),
        }
        scanned
    }

    // =========================================================================
    // Prescriptions
    // =========================================================================

    /// Sign a prescription and wrap it for QR rendering
    pub fn issue_prescription_token(
        &self,
        data: &PrescriptionData,
        now: PhysicalTime,
    ) -> TokenResult<String> {
        data.validate(now)?;

        let signature = SignatureBlock::new(
            data.compute_signature(&self.config.signing_secret)?,
            &self.config.key_id,
            now,
        );
        let claims = PrescriptionClaims {
            registered: RegisteredClaims::new(
                &self.config.issuer,
                &self.config.audience,
                Some(data.patient.id.clone()),
                TokenUse::Prescription,
                now,
                self.config.prescription_validity_days * SECS_PER_DAY,
            ),
            data: data.clone(),
            signature,
        };

        let envelope = bearer::sign(&claims, &self.config.bearer_secret)?;
        tracing::debug!(
            encounter_id = %data.encounter_id,
            prescription_index = data.prescription_index,
            "issued prescription token"
        );
        Ok(STANDARD.encode(envelope))
    }

    /// Verify a scanned prescription token and return the attested fields
    pub fn verify_prescription_token(
        &self,
        token: &str,
        now: PhysicalTime,
    ) -> TokenResult<PrescriptionData> {
        self.verify_prescription_inner(token, now)
            .map_err(|e| log_rejection("prescription", e))
    }

    fn verify_prescription_inner(
        &self,
        token: &str,
        now: PhysicalTime,
    ) -> TokenResult<PrescriptionData> {
        let envelope = STANDARD
            .decode(token.trim())
            .map_err(|e| TokenError::Malformed(format!("outer encoding: {e}")))?;
        let envelope = String::from_utf8(envelope)
            .map_err(|e| TokenError::Malformed(format!("outer encoding: {e}")))?;

        let claims: PrescriptionClaims = bearer::verify(&envelope, &self.config.bearer_secret)?;
        claims.registered.validate(
            &self.config.issuer,
            &self.config.audience,
            TokenUse::Prescription,
            now,
        )?;

        if claims.signature.algorithm != HMAC_SHA256 {
            return Err(TokenError::SignatureMismatch(format!(
                "unsupported signature algorithm '{}'",
                claims.signature.algorithm
            )));
        }
        if claims.signature.key_id != self.config.key_id {
            return Err(TokenError::SignatureMismatch(format!(
                "unknown signing key '{}'",
                claims.signature.key_id
            )));
        }

        let expected = claims.data.compute_signature(&self.config.signing_secret)?;
        if !constant_time_eq(expected.as_bytes(), claims.signature.value.as_bytes()) {
            return Err(TokenError::SignatureMismatch(
                "prescription signature does not match payload".to_string(),
            ));
        }

        if now.ts_ms > claims.data.expires_at {
            return Err(TokenError::Expired {
                expired_at_ms: claims.data.expires_at,
            });
        }

        Ok(claims.data)
    }

    // =========================================================================
    // Scan-session access
    // =========================================================================

    /// Issue a short-lived token scoped to one grant. `ttl_secs` defaults to
    /// the configured lifetime and may not exceed the configured maximum.
    pub fn issue_access_token(
        &self,
        digital_identifier: &str,
        grant_id: GrantId,
        ttl_secs: Option<u64>,
        now: PhysicalTime,
    ) -> TokenResult<AccessToken> {
        let ttl_secs = ttl_secs.unwrap_or(self.config.default_access_ttl_secs);
        if ttl_secs == 0 || ttl_secs > self.config.max_access_ttl_secs {
            return Err(TokenError::InvalidClaims(format!(
                "access token lifetime must be between 1 and {} seconds",
                self.config.max_access_ttl_secs
            )));
        }
        if digital_identifier.trim().is_empty() {
            return Err(TokenError::InvalidClaims(
                "digital identifier is required".to_string(),
            ));
        }

        let claims = AccessClaims {
            registered: RegisteredClaims::new(
                &self.config.issuer,
                &self.config.audience,
                Some(digital_identifier.to_string()),
                TokenUse::Access,
                now,
                ttl_secs,
            ),
            grant_id,
        };
        let token = bearer::sign(&claims, &self.config.bearer_secret)?;
        Ok(AccessToken {
            token,
            expires_at: claims.registered.expires_at_ms(),
        })
    }

    /// Verify an access token and return its claims
    pub fn verify_access_token(&self, token: &str, now: PhysicalTime) -> TokenResult<AccessClaims> {
        let claims: AccessClaims = bearer::verify(token.trim(), &self.config.bearer_secret)
            .map_err(|e| log_rejection("access", e))?;
        claims
            .registered
            .validate(
                &self.config.issuer,
                &self.config.audience,
                TokenUse::Access,
                now,
            )
            .map_err(|e| log_rejection("access", e))?;
        Ok(claims)
    }
}

fn log_rejection(kind: &str, err: TokenError) -> TokenError {
    match &err {
        TokenError::SignatureMismatch(reason) => {
            tracing::warn!(token_kind = kind, %reason, "token signature verification failed");
        }
        TokenError::Expired { expired_at_ms } => {
            tracing::info!(token_kind = kind, expired_at_ms, "expired token rejected");
        }
        other => {
            tracing::debug!(token_kind = kind, error = %other, "token rejected");
        }
    }
    err
}
