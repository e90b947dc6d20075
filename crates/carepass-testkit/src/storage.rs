//! In-memory record store

use async_lock::RwLock;
use async_trait::async_trait;
use carepass_core::effects::{StorageEffects, StorageError, SwapOutcome};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Memory storage handler for testing.
///
/// Clones share the same map, so a test can hand one clone to the code under
/// test and inspect the other.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorageHandler {
    data: Arc<RwLock<BTreeMap<String, Vec<u8>>>>,
}

impl MemoryStorageHandler {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored keys
    pub async fn len(&self) -> usize {
        self.data.read().await.len()
    }

    /// Whether nothing is stored
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Keys under `prefix`
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        self.data
            .read()
            .await
            .keys()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect()
    }
}

#[async_trait]
impl StorageEffects for MemoryStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        self.data.write().await.insert(key.to_string(), value);
        Ok(())
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        Ok(self.data.read().await.get(key).cloned())
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        Ok(self.data.write().await.remove(key).is_some())
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let data = self.data.read().await;
        Ok(data
            .keys()
            .filter(|k| prefix.map_or(true, |p| k.starts_with(p)))
            .cloned()
            .collect())
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
    ) -> Result<SwapOutcome, StorageError> {
        let mut data = self.data.write().await;
        match data.get_mut(key) {
            Some(current) if current.as_slice() == expected => {
                *current = new;
                Ok(SwapOutcome::Swapped)
            }
            _ => Ok(SwapOutcome::Conflict),
        }
    }
}
