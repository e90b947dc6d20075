//! Grant maintenance sweeps

use super::to_json;
use crate::context::Engine;
use anyhow::Result;
use clap::Subcommand;
use serde_json::Value;

/// Grant subcommands
#[derive(Debug, Subcommand)]
pub enum GrantsCommand {
    /// Mark overdue pending and active grants as expired
    Expire,
    /// Remind patients whose grants are about to expire
    Remind,
}

/// Run a grant subcommand
pub async fn handle_grants_command(engine: &Engine, command: GrantsCommand) -> Result<Value> {
    let report = match command {
        GrantsCommand::Expire => engine.grants.expire_overdue().await?,
        GrantsCommand::Remind => engine.grants.send_expiry_reminders().await?,
    };
    to_json(&report)
}
