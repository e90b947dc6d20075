//! Shared fixtures

use carepass_core::time::MS_PER_DAY;
use carepass_core::SigningSecret;
use carepass_token::{Medication, PartyRef, PrescriberRef, PrescriptionData, TokenConfig};

/// Fixed start instant for scenario tests: 2023-11-14T22:13:20Z
pub const T0: u64 = 1_700_000_000_000;

/// Token configuration with distinct, valid test secrets
pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        signing_secret: SigningSecret::new(b"testkit-prescription-signing-key!".to_vec()),
        bearer_secret: SigningSecret::new(b"testkit-bearer-envelope-signing-k".to_vec()),
        ..TokenConfig::default()
    }
}

/// A 30-day prescription issued at `issued_at`
pub fn sample_prescription(issued_at: u64) -> PrescriptionData {
    PrescriptionData {
        encounter_id: "enc-1001".into(),
        prescription_index: 0,
        medication: Medication {
            name: "Amoxicillin".into(),
            dosage: "500 mg".into(),
            frequency: "three times daily".into(),
            duration: "7 days".into(),
            instructions: Some("Complete the full course".into()),
            quantity: Some(21),
        },
        patient: PartyRef {
            id: "patient-1".into(),
            name: "Ada Obi".into(),
        },
        prescriber: PrescriberRef {
            id: "dr-1".into(),
            name: "Dr. Kwame Mensah".into(),
            license_number: Some("MDC-1042".into()),
        },
        organization: PartyRef {
            id: "org-1".into(),
            name: "Lakeside Clinic".into(),
        },
        issued_at,
        expires_at: issued_at + 30 * MS_PER_DAY,
    }
}
