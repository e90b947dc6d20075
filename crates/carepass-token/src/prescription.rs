//! Prescription dispensing payloads
//!
//! The prescription fields are signed twice: an HMAC signature block over
//! their canonical JSON (so the payload stays verifiable if it is ever
//! lifted out of its envelope), and the HS256 bearer envelope carrying
//! issuer, audience and a 30-day validity window.

use crate::bearer::RegisteredClaims;
use crate::canonical::to_canonical_bytes;
use crate::error::{TokenError, TokenResult};
use crate::signing::{hmac_sha256, HMAC_SHA256};
use carepass_core::{PhysicalTime, SigningSecret};
use serde::{Deserialize, Serialize};

/// Prescribed medication
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Medication {
    /// Drug name
    pub name: String,
    /// Dose per administration, e.g. "500 mg"
    pub dosage: String,
    /// Administration frequency, e.g. "twice daily"
    pub frequency: String,
    /// Course length, e.g. "7 days"
    pub duration: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<u32>,
}

/// Reference to a named party (patient or organization)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartyRef {
    pub id: String,
    pub name: String,
}

/// Reference to the prescribing practitioner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriberRef {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_number: Option<String>,
}

/// The facts a prescription token attests to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrescriptionData {
    /// Encounter the prescription was written in
    pub encounter_id: String,
    /// Position of the prescription within the encounter
    pub prescription_index: u32,
    pub medication: Medication,
    pub patient: PartyRef,
    pub prescriber: PrescriberRef,
    pub organization: PartyRef,
    /// Unix milliseconds
    pub issued_at: u64,
    /// Unix milliseconds; dispensing is refused once this instant has passed
    pub expires_at: u64,
}

impl PrescriptionData {
    /// Reject payloads that must never be signed
    pub fn validate(&self, now: PhysicalTime) -> TokenResult<()> {
        let required = [
            ("encounterId", self.encounter_id.as_str()),
            ("medication.name", self.medication.name.as_str()),
            ("patient.id", self.patient.id.as_str()),
            ("prescriber.id", self.prescriber.id.as_str()),
            ("organization.id", self.organization.id.as_str()),
        ];
        if let Some((field, _)) = required.iter().find(|(_, v)| v.trim().is_empty()) {
            return Err(TokenError::InvalidClaims(format!("{field} is required")));
        }
        if self.expires_at <= self.issued_at {
            return Err(TokenError::InvalidClaims(
                "expiresAt must be after issuedAt".to_string(),
            ));
        }
        if now.ts_ms > self.expires_at {
            return Err(TokenError::Expired {
                expired_at_ms: self.expires_at,
            });
        }
        Ok(())
    }

    /// Hex HMAC-SHA256 over the canonical JSON of these fields
    pub fn compute_signature(&self, secret: &SigningSecret) -> TokenResult<String> {
        let canonical = to_canonical_bytes(self)?;
        Ok(hex::encode(hmac_sha256(secret, &canonical)?))
    }
}

/// Signature metadata embedded next to the prescription fields
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureBlock {
    /// Hex-encoded MAC
    pub value: String,
    /// Always [`HMAC_SHA256`]
    pub algorithm: String,
    /// Identifier of the signing key
    pub key_id: String,
    /// Unix milliseconds
    pub issued_at: u64,
}

impl SignatureBlock {
    pub(crate) fn new(value: String, key_id: &str, now: PhysicalTime) -> Self {
        Self {
            value,
            algorithm: HMAC_SHA256.to_string(),
            key_id: key_id.to_string(),
            issued_at: now.ts_ms,
        }
    }
}

/// Full claim set of a prescription bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub(crate) struct PrescriptionClaims {
    #[serde(flatten)]
    pub registered: RegisteredClaims,
    #[serde(flatten)]
    pub data: PrescriptionData,
    pub signature: SignatureBlock,
}
