//! Token issue and inspection

use super::to_json;
use crate::context::Engine;
use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::{json, Value};
use std::path::PathBuf;

/// Token subcommands
#[derive(Debug, Subcommand)]
pub enum TokenCommand {
    /// Print a patient identification payload
    Patient {
        /// Patient digital identifier
        digital_identifier: String,

        /// Also write the QR code as SVG to this file
        #[arg(long)]
        svg: Option<PathBuf>,
    },

    /// Verify a scanned prescription token and print its contents
    VerifyPrescription {
        /// Token text as scanned
        token: String,
    },

    /// Check a scanned patient identification payload
    VerifyPatient {
        /// Payload JSON as scanned
        json: String,
    },
}

/// Run a token subcommand
pub async fn handle_token_command(engine: &Engine, command: TokenCommand) -> Result<Value> {
    let now = engine.now().await?;
    match command {
        TokenCommand::Patient {
            digital_identifier,
            svg,
        } => {
            let code = engine.codec.issue_patient_token(&digital_identifier, now)?;
            if let Some(path) = &svg {
                tokio::fs::write(path, code.svg.as_bytes())
                    .await
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!(path = %path.display(), "wrote patient QR code");
            }
            Ok(json!({
                "payload": code.payload,
                "svgPath": svg,
            }))
        }
        TokenCommand::VerifyPrescription { token } => {
            let prescription = engine
                .codec
                .verify_prescription_token(&token, now)
                .context("prescription rejected")?;
            to_json(&prescription)
        }
        TokenCommand::VerifyPatient { json } => {
            let scanned = engine
                .codec
                .validate_patient_token(&json, now)
                .context("not a patient identification code; ask the patient to re-scan")?;
            if scanned.stale {
                tracing::warn!(
                    digital_identifier = %scanned.digital_identifier,
                    "patient code is stale"
                );
            }
            Ok(json!({
                "digitalIdentifier": scanned.digital_identifier,
                "timestamp": scanned.timestamp,
                "stale": scanned.stale,
            }))
        }
    }
}
