//! Carepass Capability Tokens
//!
//! Turns minimal identity and prescription facts into scan-able,
//! tamper-evident artifacts, and turns scanned artifacts back into trusted
//! facts.
//!
//! - Patient identification codes: unsigned JSON rendered as a QR code.
//!   Staleness is flagged, never enforced.
//! - Prescription tokens: fields signed with HMAC-SHA256 over their
//!   canonical JSON, wrapped in an HS256 bearer token with issuer, audience
//!   and a 30-day window, then base64-encoded for the QR code.
//! - Access tokens: short-lived bearer tokens bound to one grant.
//!
//! Verification failures are typed: a signature mismatch and an expiry are
//! distinct [`TokenError`] variants.

#![forbid(unsafe_code)]

pub mod access;
pub mod bearer;
pub mod canonical;
pub mod codec;
pub mod config;
pub mod error;
pub mod patient;
pub mod prescription;
pub mod signing;

pub use access::{AccessClaims, AccessToken};
pub use codec::TokenCodec;
pub use config::TokenConfig;
pub use error::{TokenError, TokenResult};
pub use patient::{PatientQrCode, PatientQrPayload, ScannedPatient};
pub use prescription::{
    Medication, PartyRef, PrescriberRef, PrescriptionData, SignatureBlock,
};
