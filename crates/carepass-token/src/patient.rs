//! Patient identification codes
//!
//! An unsigned, self-describing payload rendered as a QR code. Holding the
//! code proves nothing by itself: it only names the patient so a provider can
//! start the scoped access-request flow, and the patient approves that
//! request out of band.

use crate::error::{TokenError, TokenResult};
use carepass_core::time::MS_PER_HOUR;
use carepass_core::PhysicalTime;
use qrcode::render::svg;
use qrcode::QrCode;
use serde::{Deserialize, Serialize};

/// Payload discriminator carried in every patient code
pub const PATIENT_TOKEN_TYPE: &str = "health_access_request";

/// Current payload version
pub const PATIENT_TOKEN_VERSION: &str = "1.0";

/// JSON payload encoded into the patient QR code
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientQrPayload {
    /// Always [`PATIENT_TOKEN_TYPE`]
    #[serde(rename = "type")]
    pub kind: String,
    /// Patient's public digital identifier
    pub digital_identifier: String,
    /// Payload version
    pub version: String,
    /// Issue time, Unix milliseconds
    pub timestamp: u64,
}

/// A rendered patient code
#[derive(Debug, Clone)]
pub struct PatientQrCode {
    /// Structured payload
    pub payload: PatientQrPayload,
    /// Exact JSON text encoded in the code
    pub json: String,
    /// SVG rendering of the code
    pub svg: String,
}

/// A scanned patient code that passed structural validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedPatient {
    /// Patient's public digital identifier
    pub digital_identifier: String,
    /// Issue time, Unix milliseconds
    pub timestamp: u64,
    /// Older than the configured staleness window. The caller decides
    /// whether to accept it.
    pub stale: bool,
}

pub(crate) fn build_payload(digital_identifier: &str, now: PhysicalTime) -> TokenResult<PatientQrPayload> {
    let digital_identifier = digital_identifier.trim();
    if digital_identifier.is_empty() {
        return Err(TokenError::InvalidClaims(
            "digital identifier is required".to_string(),
        ));
    }
    Ok(PatientQrPayload {
        kind: PATIENT_TOKEN_TYPE.to_string(),
        digital_identifier: digital_identifier.to_string(),
        version: PATIENT_TOKEN_VERSION.to_string(),
        timestamp: now.ts_ms,
    })
}

pub(crate) fn render_svg(data: &str, min_size: u32) -> TokenResult<String> {
    let code = QrCode::new(data.as_bytes())
        .map_err(|e| TokenError::Rendering(format!("QR generation failed: {e}")))?;
    Ok(code
        .render::<svg::Color>()
        .min_dimensions(min_size, min_size)
        .dark_color(svg::Color("#000000"))
        .light_color(svg::Color("#FFFFFF"))
        .build())
}

/// Parse and structurally validate a scanned patient code.
///
/// Returns `None` for anything that is not a well-formed patient payload.
pub(crate) fn parse_scanned(
    raw: &str,
    now: PhysicalTime,
    stale_after_hours: u64,
) -> Option<ScannedPatient> {
    let value: serde_json::Value = serde_json::from_str(raw.trim()).ok()?;
    let object = value.as_object()?;

    if object.get("type")?.as_str()? != PATIENT_TOKEN_TYPE {
        return None;
    }
    let digital_identifier = object.get("digitalIdentifier")?.as_str()?.trim();
    if digital_identifier.is_empty() {
        return None;
    }
    let timestamp = object.get("timestamp")?.as_u64()?;

    let age_ms = now.ts_ms.saturating_sub(timestamp);
    Some(ScannedPatient {
        digital_identifier: digital_identifier.to_string(),
        timestamp,
        stale: age_ms > stale_after_hours.saturating_mul(MS_PER_HOUR),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOW: u64 = 1_700_000_000_000;

    #[test]
    fn payload_uses_wire_names() {
        let payload = build_payload("HID-123", PhysicalTime::from_millis(NOW)).unwrap();
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["type"], PATIENT_TOKEN_TYPE);
        assert_eq!(json["digitalIdentifier"], "HID-123");
        assert_eq!(json["version"], "1.0");
        assert_eq!(json["timestamp"], NOW);
    }

    #[test]
    fn blank_identifier_is_rejected() {
        assert!(build_payload("  ", PhysicalTime::from_millis(NOW)).is_err());
    }

    #[test]
    fn parse_rejects_wrong_type_and_missing_fields() {
        let now = PhysicalTime::from_millis(NOW);
        assert!(parse_scanned("not json", now, 24).is_none());
        assert!(parse_scanned(
            r#"{"type":"other","digitalIdentifier":"x","timestamp":1}"#,
            now,
            24
        )
        .is_none());
        assert!(parse_scanned(r#"{"type":"health_access_request","timestamp":1}"#, now, 24).is_none());
        assert!(parse_scanned(
            r#"{"type":"health_access_request","digitalIdentifier":"x"}"#,
            now,
            24
        )
        .is_none());
    }

    #[test]
    fn old_codes_are_flagged_not_rejected() {
        let issued = NOW - 25 * MS_PER_HOUR;
        let raw = format!(
            r#"{{"type":"health_access_request","digitalIdentifier":"HID-1","version":"1.0","timestamp":{issued}}}"#
        );
        let scanned = parse_scanned(&raw, PhysicalTime::from_millis(NOW), 24).unwrap();
        assert!(scanned.stale);
        assert_eq!(scanned.digital_identifier, "HID-1");

        let fresh = parse_scanned(&raw, PhysicalTime::from_millis(issued + MS_PER_HOUR), 24).unwrap();
        assert!(!fresh.stale);
    }

    #[test]
    fn renders_svg() {
        let svg = render_svg("{\"type\":\"health_access_request\"}", 128).unwrap();
        assert!(svg.contains("<svg"));
    }
}
