//! Notification job model

use carepass_core::{JobId, PhysicalTime, SubjectId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a job notifies the subject about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationType {
    /// An organization asked for access
    AuthorizationRequest,
    /// A grant changed status
    StatusUpdate,
    /// A grant is about to expire
    Reminder,
    /// Operator broadcast
    SystemAlert,
}

impl NotificationType {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationType::AuthorizationRequest => "AUTHORIZATION_REQUEST",
            NotificationType::StatusUpdate => "STATUS_UPDATE",
            NotificationType::Reminder => "REMINDER",
            NotificationType::SystemAlert => "SYSTEM_ALERT",
        }
    }
}

impl fmt::Display for NotificationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing state of a job
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Retrying,
}

impl JobStatus {
    /// Wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Pending => "PENDING",
            JobStatus::Processing => "PROCESSING",
            JobStatus::Completed => "COMPLETED",
            JobStatus::Failed => "FAILED",
            JobStatus::Retrying => "RETRYING",
        }
    }

    /// Whether no further processing will happen
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Dequeue priority. Higher ranks are taken first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

impl Priority {
    /// Ordinal used for ordering: `LOW=1, NORMAL=5, HIGH=8, URGENT=10`
    pub fn rank(&self) -> u8 {
        match self {
            Priority::Low => 1,
            Priority::Normal => 5,
            Priority::High => 8,
            Priority::Urgent => 10,
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Priority::Low),
            "normal" => Ok(Priority::Normal),
            "high" => Ok(Priority::High),
            "urgent" => Ok(Priority::Urgent),
            other => Err(format!("unknown priority '{other}'")),
        }
    }
}

impl PartialOrd for Priority {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Priority {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// One failed delivery attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorRecord {
    /// Unix milliseconds
    pub timestamp: u64,
    pub error: String,
    /// 1-based attempt number
    pub attempt: u32,
}

/// A persisted notification job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationJob {
    pub id: JobId,
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    /// Recipient
    pub subject: SubjectId,
    /// Type-specific fields used to render the message
    pub payload: serde_json::Value,
    #[serde(default)]
    pub device_tokens: Vec<String>,
    pub status: JobStatus,
    pub priority: Priority,
    pub retry_count: u32,
    pub max_retries: u32,
    pub created_at: u64,
    /// Earliest first attempt
    pub scheduled_at: u64,
    /// Earliest next attempt after a failure
    #[serde(default)]
    pub next_retry_at: Option<u64>,
    /// Hard lifetime; the job is never selected at or after this instant
    pub expires_at: u64,
    #[serde(default)]
    pub started_at: Option<u64>,
    #[serde(default)]
    pub completed_at: Option<u64>,
    #[serde(default)]
    pub error_history: Vec<ErrorRecord>,
}

impl NotificationJob {
    /// Instant the job becomes eligible for its next attempt
    pub fn due_at(&self) -> u64 {
        match self.status {
            JobStatus::Retrying => self.next_retry_at.unwrap_or(self.scheduled_at),
            _ => self.scheduled_at,
        }
    }

    /// Whether a batch running at `now` may select this job. A `PROCESSING`
    /// job whose claim is older than `claim_lease_ms` was abandoned by its
    /// batch and is taken over.
    pub fn is_eligible(&self, now: PhysicalTime, claim_lease_ms: u64) -> bool {
        if self.expires_at <= now.ts_ms {
            return false;
        }
        match self.status {
            JobStatus::Pending | JobStatus::Retrying => self.due_at() <= now.ts_ms,
            JobStatus::Processing => self.claim_lapsed(now, claim_lease_ms),
            JobStatus::Completed | JobStatus::Failed => false,
        }
    }

    /// Whether this job is `PROCESSING` under a claim older than the lease
    pub fn claim_lapsed(&self, now: PhysicalTime, claim_lease_ms: u64) -> bool {
        self.status == JobStatus::Processing
            && self
                .started_at
                .map_or(true, |started| now.ts_ms.saturating_sub(started) > claim_lease_ms)
    }

    /// Whether another failed attempt may still be retried
    pub fn can_retry(&self) -> bool {
        self.retry_count < self.max_retries
    }

    /// Time the job reached a terminal state, falling back to creation
    pub fn finished_at(&self) -> u64 {
        self.completed_at.unwrap_or(self.created_at)
    }
}

/// Per-enqueue overrides
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    pub priority: Priority,
    /// Defaults to the configured retry bound
    pub max_retries: Option<u32>,
    /// Delay before the first attempt
    pub delay_seconds: u64,
    /// Defaults to the configured lifetime
    pub expires_in_hours: Option<u64>,
    /// Push targets; empty means the transport resolves the subject's devices
    pub device_tokens: Vec<String>,
}

impl EnqueueOptions {
    /// Options with the given priority
    pub fn with_priority(priority: Priority) -> Self {
        Self {
            priority,
            ..Self::default()
        }
    }

    /// Set the job lifetime
    pub fn expires_in_hours(mut self, hours: u64) -> Self {
        self.expires_in_hours = Some(hours);
        self
    }

    /// Delay the first attempt
    pub fn delay_seconds(mut self, seconds: u64) -> Self {
        self.delay_seconds = seconds;
        self
    }

    /// Set the retry bound
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }
}
