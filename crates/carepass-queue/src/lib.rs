//! Carepass Notification Queue
//!
//! A poll-driven job table for grant notifications. Jobs are persisted through
//! the core record store, selected by priority then schedule, claimed with a
//! conditional write, delivered through a [`PushTransport`], and retried with
//! capped exponential backoff until they succeed, exhaust their retries or
//! outlive their lifetime.
//!
//! Delivery is at-least-once.

#![forbid(unsafe_code)]

pub mod backoff;
pub mod config;
pub mod error;
pub mod job;
pub mod message;
pub mod queue;
pub mod store;
pub mod transport;

pub use backoff::RetryPolicy;
pub use config::QueueConfig;
pub use error::{DeliveryError, QueueError};
pub use job::{EnqueueOptions, ErrorRecord, JobStatus, NotificationJob, NotificationType, Priority};
pub use message::PushMessage;
pub use queue::{BatchSummary, CleanupReport, NotificationQueue, QueueStats};
pub use store::JobStore;
pub use transport::{PushTransport, TracingPushTransport};
