//! Job persistence over the record store
//!
//! Jobs live under `queue/jobs/{id}` as JSON. Listing returns the raw bytes
//! next to each decoded job so that a batch can claim it with a conditional
//! write against exactly what it read.

use crate::error::QueueError;
use crate::job::NotificationJob;
use carepass_core::effects::StorageEffects;
use carepass_core::JobId;
use std::sync::Arc;

const JOB_PREFIX: &str = "queue/jobs/";

fn job_key(id: JobId) -> String {
    format!("{JOB_PREFIX}{id}")
}

/// A job together with the exact bytes it was read from
#[derive(Debug, Clone)]
pub(crate) struct StoredJob {
    pub raw: Vec<u8>,
    pub job: NotificationJob,
}

/// Typed access to persisted jobs
#[derive(Clone)]
pub struct JobStore {
    storage: Arc<dyn StorageEffects>,
}

impl JobStore {
    /// Wrap a record store
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    /// Insert or overwrite a job
    pub async fn save(&self, job: &NotificationJob) -> Result<(), QueueError> {
        let bytes = serde_json::to_vec(job)?;
        self.storage.store(&job_key(job.id), bytes).await?;
        Ok(())
    }

    /// Load one job
    pub async fn load(&self, id: JobId) -> Result<Option<NotificationJob>, QueueError> {
        match self.storage.retrieve(&job_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Delete one job, returning whether it existed
    pub async fn delete(&self, id: JobId) -> Result<bool, QueueError> {
        Ok(self.storage.remove(&job_key(id)).await?)
    }

    /// Every stored job
    pub async fn list(&self) -> Result<Vec<NotificationJob>, QueueError> {
        Ok(self
            .list_stored()
            .await?
            .into_iter()
            .map(|stored| stored.job)
            .collect())
    }

    pub(crate) async fn list_stored(&self) -> Result<Vec<StoredJob>, QueueError> {
        let keys = self.storage.list_keys(Some(JOB_PREFIX)).await?;
        let mut jobs = Vec::with_capacity(keys.len());
        for key in keys {
            // Removed between listing and reading by a concurrent cleanup.
            let Some(raw) = self.storage.retrieve(&key).await? else {
                continue;
            };
            match serde_json::from_slice(&raw) {
                Ok(job) => jobs.push(StoredJob { raw, job }),
                Err(e) => tracing::warn!(%key, error = %e, "skipping undecodable job record"),
            }
        }
        Ok(jobs)
    }

    /// Replace `stored` with `updated` only if nobody changed it since it was
    /// read
    pub(crate) async fn claim(
        &self,
        stored: &StoredJob,
        updated: &NotificationJob,
    ) -> Result<bool, QueueError> {
        let bytes = serde_json::to_vec(updated)?;
        let outcome = self
            .storage
            .compare_and_swap(&job_key(stored.job.id), &stored.raw, bytes)
            .await?;
        Ok(outcome.is_swapped())
    }
}
