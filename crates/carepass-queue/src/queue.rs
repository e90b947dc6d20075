//! Queue operations: enqueue, batch dispatch, stats and cleanup
//!
//! There is no background worker. Whoever calls [`NotificationQueue::process_batch`]
//! next does the work, so every operation reads the clock and the store
//! afresh and keeps no state between calls.

use crate::backoff::RetryPolicy;
use crate::config::QueueConfig;
use crate::error::{DeliveryError, QueueError};
use crate::job::{
    EnqueueOptions, ErrorRecord, JobStatus, NotificationJob, NotificationType, Priority,
};
use crate::message::PushMessage;
use crate::store::{JobStore, StoredJob};
use crate::transport::PushTransport;
use carepass_core::effects::{PhysicalTimeEffects, StorageEffects};
use carepass_core::time::{MS_PER_HOUR, MS_PER_SECOND};
use carepass_core::{JobId, PhysicalTime, SubjectId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

/// Outcome of one dispatch batch
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchSummary {
    /// Jobs claimed and attempted
    pub processed: usize,
    pub succeeded: usize,
    /// Attempts that failed, whether or not a retry was scheduled
    pub failed: usize,
    /// One entry per failure, prefixed with the job id when known
    pub errors: Vec<String>,
}

/// Job counts
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueueStats {
    pub total: usize,
    pub by_status: BTreeMap<JobStatus, usize>,
    pub by_type: BTreeMap<NotificationType, usize>,
}

impl QueueStats {
    /// Jobs currently in `status`
    pub fn count(&self, status: JobStatus) -> usize {
        self.by_status.get(&status).copied().unwrap_or(0)
    }
}

/// Outcome of a cleanup sweep
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: usize,
}

/// Durable, poll-driven notification queue
#[derive(Clone)]
pub struct NotificationQueue {
    store: JobStore,
    time: Arc<dyn PhysicalTimeEffects>,
    transport: Arc<dyn PushTransport>,
    config: QueueConfig,
    retry: RetryPolicy,
}

impl NotificationQueue {
    /// Create a queue over the given record store, clock and transport
    pub fn new(
        storage: Arc<dyn StorageEffects>,
        time: Arc<dyn PhysicalTimeEffects>,
        transport: Arc<dyn PushTransport>,
        config: QueueConfig,
    ) -> Self {
        let retry = RetryPolicy::new(
            Duration::from_millis(config.base_backoff_ms),
            Duration::from_millis(config.max_backoff_ms),
        );
        Self {
            store: JobStore::new(storage),
            time,
            transport,
            config,
            retry,
        }
    }

    /// Queue configuration
    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// Persist a new `PENDING` job
    pub async fn enqueue(
        &self,
        notification_type: NotificationType,
        subject: &SubjectId,
        payload: serde_json::Value,
        options: EnqueueOptions,
    ) -> Result<NotificationJob, QueueError> {
        let expires_in_hours = options
            .expires_in_hours
            .unwrap_or(self.config.default_ttl_hours);
        if expires_in_hours == 0 {
            return Err(QueueError::InvalidOptions(
                "expires_in_hours must be positive".to_string(),
            ));
        }
        let delay_ms = options.delay_seconds.saturating_mul(MS_PER_SECOND);
        let ttl_ms = expires_in_hours.saturating_mul(MS_PER_HOUR);
        if delay_ms >= ttl_ms {
            return Err(QueueError::InvalidOptions(
                "job would expire before its first attempt".to_string(),
            ));
        }

        let now = self.time.physical_time().await?;
        let job = NotificationJob {
            id: JobId::new(),
            notification_type,
            subject: subject.clone(),
            payload,
            device_tokens: options.device_tokens,
            status: JobStatus::Pending,
            priority: options.priority,
            retry_count: 0,
            max_retries: options
                .max_retries
                .unwrap_or(self.config.default_max_retries),
            created_at: now.ts_ms,
            scheduled_at: now.ts_ms.saturating_add(delay_ms),
            next_retry_at: None,
            expires_at: now.ts_ms.saturating_add(ttl_ms),
            started_at: None,
            completed_at: None,
            error_history: Vec::new(),
        };
        self.store.save(&job).await?;

        tracing::debug!(
            job_id = %job.id,
            notification_type = %job.notification_type,
            priority = job.priority.rank(),
            "notification enqueued"
        );
        Ok(job)
    }

    /// Queue an operator broadcast to one subject
    pub async fn enqueue_system_alert(
        &self,
        subject: &SubjectId,
        title: &str,
        message: &str,
        priority: Priority,
    ) -> Result<NotificationJob, QueueError> {
        if title.trim().is_empty() || message.trim().is_empty() {
            return Err(QueueError::InvalidOptions(
                "system alerts need a title and a message".to_string(),
            ));
        }
        self.enqueue(
            NotificationType::SystemAlert,
            subject,
            serde_json::json!({ "title": title, "message": message }),
            EnqueueOptions::with_priority(priority),
        )
        .await
    }

    /// Load one job
    pub async fn job(&self, id: JobId) -> Result<NotificationJob, QueueError> {
        self.store.load(id).await?.ok_or(QueueError::NotFound(id))
    }

    /// Attempt up to `limit` due jobs (the configured default when `None`).
    ///
    /// Never fails: store, clock and delivery errors are collected into the
    /// summary, and one job's failure does not stop the rest of the batch.
    pub async fn process_batch(&self, limit: Option<usize>) -> BatchSummary {
        let limit = limit.unwrap_or(self.config.default_batch_limit);
        let mut summary = BatchSummary::default();

        let batch = match self.select(limit).await {
            Ok(batch) => batch,
            Err(e) => {
                tracing::error!(error = %e, "failed to select notification batch");
                summary.errors.push(e.to_string());
                return summary;
            }
        };

        for stored in batch {
            self.process_one(stored, &mut summary).await;
        }

        tracing::info!(
            processed = summary.processed,
            succeeded = summary.succeeded,
            failed = summary.failed,
            "notification batch finished"
        );
        summary
    }

    async fn select(&self, limit: usize) -> Result<Vec<StoredJob>, QueueError> {
        let now = self.time.physical_time().await?;
        let lease_ms = self.config.claim_lease_ms;
        let mut eligible: Vec<StoredJob> = self
            .store
            .list_stored()
            .await?
            .into_iter()
            .filter(|stored| stored.job.is_eligible(now, lease_ms))
            .collect();
        let due = eligible.len();

        eligible.sort_by(|a, b| {
            b.job
                .priority
                .cmp(&a.job.priority)
                .then(a.job.scheduled_at.cmp(&b.job.scheduled_at))
        });
        eligible.truncate(limit);

        tracing::debug!(due, selected = eligible.len(), limit, "selected notification batch");
        Ok(eligible)
    }

    async fn process_one(&self, stored: StoredJob, summary: &mut BatchSummary) {
        let job_id = stored.job.id;
        let started = match self.time.physical_time().await {
            Ok(now) => now,
            Err(e) => {
                summary.errors.push(format!("{job_id}: {e}"));
                return;
            }
        };

        if stored.job.claim_lapsed(started, self.config.claim_lease_ms) {
            tracing::warn!(
                %job_id,
                claimed_at = stored.job.started_at,
                "taking over job abandoned by an earlier batch"
            );
        }

        let mut job = stored.job.clone();
        job.status = JobStatus::Processing;
        job.started_at = Some(started.ts_ms);

        match self.store.claim(&stored, &job).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(%job_id, "job claimed by a concurrent batch; skipping");
                return;
            }
            Err(e) => {
                tracing::warn!(%job_id, error = %e, "failed to claim job");
                summary.errors.push(format!("{job_id}: {e}"));
                return;
            }
        }
        summary.processed += 1;

        let outcome = self.deliver(&job).await;
        let finished = self.time.physical_time().await.unwrap_or(started);
        match outcome {
            Ok(()) => {
                job.status = JobStatus::Completed;
                job.completed_at = Some(finished.ts_ms);
                summary.succeeded += 1;
                tracing::debug!(%job_id, "notification delivered");
            }
            Err(err) => {
                summary.failed += 1;
                summary.errors.push(format!("{job_id}: {err}"));
                self.record_failure(&mut job, err, finished);
            }
        }

        if let Err(e) = self.store.save(&job).await {
            tracing::error!(%job_id, error = %e, "failed to record job outcome");
            summary.errors.push(format!("{job_id}: {e}"));
        }
    }

    async fn deliver(&self, job: &NotificationJob) -> Result<(), DeliveryError> {
        let message = PushMessage::render(job)?;
        match self.config.delivery_timeout_ms {
            Some(ms) => tokio::time::timeout(Duration::from_millis(ms), self.transport.send(&message))
                .await
                .map_err(|_| DeliveryError::transient(format!("delivery timed out after {ms} ms")))?,
            None => self.transport.send(&message).await,
        }
    }

    fn record_failure(&self, job: &mut NotificationJob, err: DeliveryError, now: PhysicalTime) {
        job.error_history.push(ErrorRecord {
            timestamp: now.ts_ms,
            error: err.message.clone(),
            attempt: job.retry_count + 1,
        });

        if err.retryable && job.can_retry() {
            let delay = self.retry.backoff_delay(job.retry_count);
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            job.next_retry_at = Some(now.ts_ms.saturating_add(delay_ms));
            job.retry_count += 1;
            job.status = JobStatus::Retrying;
            tracing::warn!(
                job_id = %job.id,
                retry_count = job.retry_count,
                max_retries = job.max_retries,
                delay_ms,
                error = %err,
                "delivery failed; retry scheduled"
            );
        } else {
            job.status = JobStatus::Failed;
            job.completed_at = Some(now.ts_ms);
            tracing::error!(
                job_id = %job.id,
                attempts = job.error_history.len(),
                retryable = err.retryable,
                error = %err,
                "delivery failed permanently"
            );
        }
    }

    /// Counts per status and per notification type
    pub async fn stats(&self) -> Result<QueueStats, QueueError> {
        let jobs = self.store.list().await?;
        let mut stats = QueueStats {
            total: jobs.len(),
            ..QueueStats::default()
        };
        for status in [
            JobStatus::Pending,
            JobStatus::Processing,
            JobStatus::Completed,
            JobStatus::Failed,
            JobStatus::Retrying,
        ] {
            stats.by_status.insert(status, 0);
        }
        for job in &jobs {
            *stats.by_status.entry(job.status).or_default() += 1;
            *stats.by_type.entry(job.notification_type).or_default() += 1;
        }
        Ok(stats)
    }

    /// Delete `COMPLETED` and `FAILED` jobs that finished more than
    /// `older_than_hours` ago, and unfinished jobs whose lifetime ran out
    /// before that
    pub async fn cleanup(&self, older_than_hours: u64) -> Result<CleanupReport, QueueError> {
        let cutoff = self.time.physical_time().await?.minus_hours(older_than_hours);
        let mut report = CleanupReport::default();
        for job in self.store.list().await? {
            let done_before_cutoff = if job.status.is_terminal() {
                job.finished_at() < cutoff.ts_ms
            } else {
                job.expires_at < cutoff.ts_ms
            };
            if done_before_cutoff && self.store.delete(job.id).await? {
                report.deleted_count += 1;
            }
        }
        tracing::info!(
            deleted = report.deleted_count,
            older_than_hours,
            "queue cleanup finished"
        );
        Ok(report)
    }
}
