//! Push message rendering
//!
//! Each notification type reads a small set of payload fields. A payload
//! missing a required field can never be delivered, so rendering fails with a
//! permanent [`DeliveryError`].

use crate::error::DeliveryError;
use crate::job::{NotificationJob, NotificationType};
use carepass_core::{JobId, SubjectId};
use serde::Serialize;
use serde_json::Value;

/// A rendered notification ready for a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    pub job_id: JobId,
    pub recipient: SubjectId,
    pub device_tokens: Vec<String>,
    pub notification_type: NotificationType,
    pub title: String,
    pub body: String,
    /// The job payload, forwarded for deep links
    pub data: Value,
}

impl PushMessage {
    /// Render the message for a job
    pub fn render(job: &NotificationJob) -> Result<Self, DeliveryError> {
        let payload = &job.payload;
        let (title, body) = match job.notification_type {
            NotificationType::AuthorizationRequest => {
                let organization = organization_label(payload)?;
                let hours = payload
                    .get("timeWindowHours")
                    .and_then(Value::as_u64)
                    .ok_or_else(|| missing("timeWindowHours"))?;
                (
                    "Access request".to_string(),
                    format!("{organization} is requesting access to your records for {hours} hours"),
                )
            }
            NotificationType::StatusUpdate => {
                let organization = organization_label(payload)?;
                let status = field(payload, "status")?;
                (
                    "Access update".to_string(),
                    format!("Access for {organization} was {status}"),
                )
            }
            NotificationType::Reminder => {
                let organization = organization_label(payload)?;
                (
                    "Access expiring soon".to_string(),
                    format!("Access for {organization} will expire soon"),
                )
            }
            NotificationType::SystemAlert => (
                field(payload, "title")?.to_string(),
                field(payload, "message")?.to_string(),
            ),
        };

        Ok(Self {
            job_id: job.id,
            recipient: job.subject.clone(),
            device_tokens: job.device_tokens.clone(),
            notification_type: job.notification_type,
            title,
            body,
            data: payload.clone(),
        })
    }
}

fn field<'a>(payload: &'a Value, name: &str) -> Result<&'a str, DeliveryError> {
    payload
        .get(name)
        .and_then(Value::as_str)
        .filter(|s| !s.trim().is_empty())
        .ok_or_else(|| missing(name))
}

fn organization_label(payload: &Value) -> Result<&str, DeliveryError> {
    field(payload, "organizationName").or_else(|_| field(payload, "organizationId"))
}

fn missing(name: &str) -> DeliveryError {
    DeliveryError::permanent(format!("payload is missing '{name}'"))
}
