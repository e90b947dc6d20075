//! End-to-end issue and verify flows through the token codec

use assert_matches::assert_matches;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use carepass_core::time::{MS_PER_DAY, MS_PER_HOUR, MS_PER_SECOND};
use carepass_core::{GrantId, PhysicalTime, SigningSecret};
use carepass_token::{
    bearer, Medication, PartyRef, PrescriberRef, PrescriptionData, TokenCodec, TokenConfig,
    TokenError,
};
use proptest::prelude::*;

const NOW: u64 = 1_700_000_000_000;

fn config() -> TokenConfig {
    TokenConfig {
        signing_secret: SigningSecret::new(b"prescription-signing-secret-0001".to_vec()),
        bearer_secret: SigningSecret::new(b"bearer-envelope-secret-000000001".to_vec()),
        ..TokenConfig::default()
    }
}

fn codec() -> TokenCodec {
    TokenCodec::new(config())
}

fn prescription(issued_at: u64, valid_days: u64) -> PrescriptionData {
    PrescriptionData {
        encounter_id: "enc-42".into(),
        prescription_index: 1,
        medication: Medication {
            name: "Metformin".into(),
            dosage: "850 mg".into(),
            frequency: "twice daily".into(),
            duration: "90 days".into(),
            instructions: Some("Take with meals".into()),
            quantity: Some(180),
        },
        patient: PartyRef {
            id: "patient-7".into(),
            name: "Kofi Boateng".into(),
        },
        prescriber: PrescriberRef {
            id: "dr-3".into(),
            name: "Dr. Amara Eze".into(),
            license_number: Some("MDC-2291".into()),
        },
        organization: PartyRef {
            id: "org-1".into(),
            name: "Lakeside Clinic".into(),
        },
        issued_at,
        expires_at: issued_at + valid_days * MS_PER_DAY,
    }
}

/// Decode the outer base64 layer of a prescription token
fn envelope_of(token: &str) -> String {
    String::from_utf8(STANDARD.decode(token).unwrap()).unwrap()
}

#[test]
fn prescription_token_round_trips() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let data = prescription(NOW, 14);

    let token = codec.issue_prescription_token(&data, now).unwrap();
    let verified = codec
        .verify_prescription_token(&token, now.plus_hours(1))
        .unwrap();
    assert_eq!(verified, data);
}

#[test]
fn tampered_bearer_signature_is_rejected() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let token = codec
        .issue_prescription_token(&prescription(NOW, 14), now)
        .unwrap();

    let envelope = envelope_of(&token);
    let (signing_input, signature) = envelope.rsplit_once('.').unwrap();
    let mut chars: Vec<char> = signature.chars().collect();
    chars[0] = if chars[0] == 'A' { 'B' } else { 'A' };
    let forged = format!("{signing_input}.{}", chars.into_iter().collect::<String>());

    let err = codec
        .verify_prescription_token(&STANDARD.encode(forged), now)
        .unwrap_err();
    assert!(err.is_signature_failure());
}

#[test]
fn re_signed_envelope_with_altered_fields_fails_inner_signature() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let token = codec
        .issue_prescription_token(&prescription(NOW, 14), now)
        .unwrap();

    // Someone holding the envelope key but not the prescription signing key.
    let mut claims: serde_json::Value =
        bearer::verify(&envelope_of(&token), &config().bearer_secret).unwrap();
    claims["medication"]["quantity"] = serde_json::json!(1800);
    let forged = bearer::sign(&claims, &config().bearer_secret).unwrap();

    let err = codec
        .verify_prescription_token(&STANDARD.encode(forged), now)
        .unwrap_err();
    assert_matches!(err, TokenError::SignatureMismatch(_));
}

#[test]
fn prescription_past_its_own_expiry_is_rejected() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let data = prescription(NOW, 7);
    let token = codec.issue_prescription_token(&data, now).unwrap();

    let last_valid = PhysicalTime::from_millis(data.expires_at);
    assert_eq!(
        codec.verify_prescription_token(&token, last_valid).unwrap(),
        data
    );

    let err = codec
        .verify_prescription_token(&token, PhysicalTime::from_millis(data.expires_at + 1))
        .unwrap_err();
    assert_matches!(err, TokenError::Expired { expired_at_ms } if expired_at_ms == data.expires_at);
}

#[test]
fn prescription_past_envelope_window_is_rejected() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let token = codec
        .issue_prescription_token(&prescription(NOW, 90), now)
        .unwrap();

    let later = PhysicalTime::from_millis(NOW + 31 * MS_PER_DAY);
    assert!(codec
        .verify_prescription_token(&token, later)
        .unwrap_err()
        .is_expired());
}

#[test]
fn token_for_another_audience_is_rejected() {
    let now = PhysicalTime::from_millis(NOW);
    let issuer = TokenCodec::new(TokenConfig {
        audience: "pharmacy-network".into(),
        ..config()
    });
    let token = issuer
        .issue_prescription_token(&prescription(NOW, 14), now)
        .unwrap();

    assert_matches!(
        codec().verify_prescription_token(&token, now),
        Err(TokenError::InvalidClaims(_))
    );
}

#[test]
fn garbage_is_malformed() {
    let now = PhysicalTime::from_millis(NOW);
    assert_matches!(
        codec().verify_prescription_token("%%% not base64 %%%", now),
        Err(TokenError::Malformed(_))
    );
    assert_matches!(
        codec().verify_prescription_token(&STANDARD.encode("one.two"), now),
        Err(TokenError::Malformed(_))
    );
}

#[test]
fn already_expired_prescription_is_not_issued() {
    let now = PhysicalTime::from_millis(NOW);
    let data = prescription(NOW - 10 * MS_PER_DAY, 5);
    assert!(codec()
        .issue_prescription_token(&data, now)
        .unwrap_err()
        .is_expired());
}

#[test]
fn patient_code_issue_then_scan() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let code = codec.issue_patient_token("HID-0042", now).unwrap();
    assert!(code.svg.contains("<svg"));

    let scanned = codec.validate_patient_token(&code.json, now).unwrap();
    assert_eq!(scanned.digital_identifier, "HID-0042");
    assert_eq!(scanned.timestamp, NOW);
    assert!(!scanned.stale);

    let next_day = PhysicalTime::from_millis(NOW + 25 * MS_PER_HOUR);
    assert!(codec.validate_patient_token(&code.json, next_day).unwrap().stale);

    assert!(codec
        .validate_patient_token(r#"{"type":"health_access_request"}"#, now)
        .is_none());
}

#[test]
fn access_token_is_bound_to_grant_and_expires() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let grant_id = GrantId::new();

    let issued = codec
        .issue_access_token("HID-0042", grant_id, Some(300), now)
        .unwrap();
    assert_eq!(issued.expires_at, NOW + 300 * MS_PER_SECOND);

    let claims = codec.verify_access_token(&issued.token, now).unwrap();
    assert_eq!(claims.grant_id, grant_id);
    assert_eq!(claims.digital_identifier(), Some("HID-0042"));

    let at_expiry = PhysicalTime::from_millis(issued.expires_at);
    assert!(codec.verify_access_token(&issued.token, at_expiry).is_ok());

    let after = PhysicalTime::from_millis(issued.expires_at + 1);
    assert!(codec
        .verify_access_token(&issued.token, after)
        .unwrap_err()
        .is_expired());
}

#[test]
fn access_token_lifetime_is_capped() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let too_long = codec.config().max_access_ttl_secs + 1;
    assert_matches!(
        codec.issue_access_token("HID-1", GrantId::new(), Some(too_long), now),
        Err(TokenError::InvalidClaims(_))
    );
}

#[test]
fn prescription_token_is_not_an_access_token() {
    let codec = codec();
    let now = PhysicalTime::from_millis(NOW);
    let token = codec
        .issue_prescription_token(&prescription(NOW, 14), now)
        .unwrap();
    assert!(codec
        .verify_access_token(&envelope_of(&token), now)
        .is_err());
}

proptest! {
    #[test]
    fn any_valid_prescription_round_trips(
        name in "[A-Za-z][A-Za-z0-9 -]{0,30}",
        index in 0u32..64,
        quantity in proptest::option::of(1u32..1000),
        valid_days in 1u64..30,
    ) {
        let codec = codec();
        let now = PhysicalTime::from_millis(NOW);
        let mut data = prescription(NOW, valid_days);
        data.medication.name = name;
        data.medication.quantity = quantity;
        data.prescription_index = index;

        let token = codec.issue_prescription_token(&data, now).unwrap();
        prop_assert_eq!(codec.verify_prescription_token(&token, now).unwrap(), data);
    }
}
