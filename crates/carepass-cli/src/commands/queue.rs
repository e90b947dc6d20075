//! Notification queue administration

use super::to_json;
use crate::context::Engine;
use anyhow::Result;
use carepass_core::SubjectId;
use carepass_queue::Priority;
use clap::Subcommand;
use serde_json::Value;

/// Queue subcommands
#[derive(Debug, Subcommand)]
pub enum QueueCommand {
    /// Deliver one batch of due notifications
    Process {
        /// Jobs to take; defaults to the configured batch limit
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Count jobs by status and type
    Stats,

    /// Delete finished jobs
    Cleanup {
        /// Only jobs that finished at least this many hours ago
        #[arg(long, default_value = "24")]
        older_than_hours: u64,
    },

    /// Queue a system alert for one patient
    Alert {
        /// Recipient patient id
        #[arg(short, long)]
        subject: String,

        /// Alert title
        #[arg(short, long)]
        title: String,

        /// Alert body
        #[arg(short, long)]
        message: String,

        /// low, normal, high or urgent
        #[arg(short, long, default_value = "normal")]
        priority: Priority,
    },
}

/// Run a queue subcommand
pub async fn handle_queue_command(engine: &Engine, command: QueueCommand) -> Result<Value> {
    match command {
        QueueCommand::Process { limit } => {
            let summary = engine.queue.process_batch(limit).await;
            if summary.failed > 0 {
                tracing::warn!(failed = summary.failed, "some deliveries failed");
            }
            to_json(&summary)
        }
        QueueCommand::Stats => to_json(&engine.queue.stats().await?),
        QueueCommand::Cleanup { older_than_hours } => {
            to_json(&engine.queue.cleanup(older_than_hours).await?)
        }
        QueueCommand::Alert {
            subject,
            title,
            message,
            priority,
        } => {
            let job = engine
                .queue
                .enqueue_system_alert(&SubjectId::new(subject), &title, &message, priority)
                .await?;
            to_json(&job)
        }
    }
}
