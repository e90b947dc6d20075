//! `carepass` operator binary

use anyhow::Result;
use carepass_cli::commands::grants::{handle_grants_command, GrantsCommand};
use carepass_cli::commands::queue::{handle_queue_command, QueueCommand};
use carepass_cli::commands::token::{handle_token_command, TokenCommand};
use carepass_cli::{CarepassConfig, Engine};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "carepass")]
#[command(about = "Carepass - patient consent and access grants", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Config file path (default: ./carepass.toml when present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Notification queue administration
    #[command(subcommand)]
    Queue(QueueCommand),

    /// Grant maintenance sweeps
    #[command(subcommand)]
    Grants(GrantsCommand),

    /// Issue and inspect tokens
    #[command(subcommand)]
    Token(TokenCommand),
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = CarepassConfig::load(cli.config.as_deref())?;
    let engine = Engine::from_config(&config).await?;

    let output = match cli.command {
        Commands::Queue(command) => handle_queue_command(&engine, command).await?,
        Commands::Grants(command) => handle_grants_command(&engine, command).await?,
        Commands::Token(command) => handle_token_command(&engine, command).await?,
    };
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}
