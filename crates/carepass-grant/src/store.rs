//! Grant persistence over the record store

use crate::error::GrantError;
use crate::grant::Grant;
use carepass_core::effects::StorageEffects;
use carepass_core::GrantId;
use std::sync::Arc;

const GRANT_PREFIX: &str = "grants/";

fn grant_key(id: GrantId) -> String {
    format!("{GRANT_PREFIX}{id}")
}

/// Typed access to persisted grants
#[derive(Clone)]
pub struct GrantStore {
    storage: Arc<dyn StorageEffects>,
}

impl GrantStore {
    /// Wrap a record store
    pub fn new(storage: Arc<dyn StorageEffects>) -> Self {
        Self { storage }
    }

    /// Insert or overwrite a grant
    pub async fn save(&self, grant: &Grant) -> Result<(), GrantError> {
        let bytes = serde_json::to_vec(grant)?;
        self.storage.store(&grant_key(grant.id), bytes).await?;
        Ok(())
    }

    /// Load a grant, including soft-deleted ones
    pub async fn load(&self, id: GrantId) -> Result<Option<Grant>, GrantError> {
        match self.storage.retrieve(&grant_key(id)).await? {
            Some(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Every stored grant matching `filter`
    pub async fn scan<F>(&self, filter: F) -> Result<Vec<Grant>, GrantError>
    where
        F: Fn(&Grant) -> bool,
    {
        let keys = self.storage.list_keys(Some(GRANT_PREFIX)).await?;
        let mut grants = Vec::new();
        for key in keys {
            let Some(bytes) = self.storage.retrieve(&key).await? else {
                continue;
            };
            match serde_json::from_slice::<Grant>(&bytes) {
                Ok(grant) if filter(&grant) => grants.push(grant),
                Ok(_) => {}
                Err(e) => tracing::warn!(%key, error = %e, "skipping undecodable grant record"),
            }
        }
        Ok(grants)
    }
}
