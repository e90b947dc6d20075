//! Record store interface
//!
//! A flat key-value store of opaque byte records. Typed repositories in the
//! feature crates own the key layout and the record encoding.
//!
//! `compare_and_swap` is the only atomic primitive the engine relies on. It is
//! used to claim notification jobs so that two overlapping dispatch batches do
//! not deliver the same job twice when the backing store supports it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Storage operation errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StorageError {
    #[error("Invalid key: {reason}")]
    InvalidKey { reason: String },
    #[error("Read failed: {0}")]
    ReadFailed(String),
    #[error("Write failed: {0}")]
    WriteFailed(String),
    #[error("Delete failed: {0}")]
    DeleteFailed(String),
}

/// Outcome of a conditional write
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SwapOutcome {
    /// The stored value matched `expected` and was replaced
    Swapped,
    /// The stored value differed (or was absent); nothing was written
    Conflict,
}

impl SwapOutcome {
    /// Whether the write happened
    pub fn is_swapped(&self) -> bool {
        matches!(self, SwapOutcome::Swapped)
    }
}

/// Key-value record storage
#[async_trait]
pub trait StorageEffects: Send + Sync {
    /// Insert or overwrite a record
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError>;

    /// Fetch a record
    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError>;

    /// Delete a record, returning whether it existed
    async fn remove(&self, key: &str) -> Result<bool, StorageError>;

    /// List keys, optionally restricted to a prefix, in lexicographic order
    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError>;

    /// Replace `key` with `new` only if its current value equals `expected`
    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
    ) -> Result<SwapOutcome, StorageError>;
}

/// Blanket implementation for Arc<T> where T: StorageEffects
#[async_trait]
impl<T: StorageEffects + ?Sized> StorageEffects for std::sync::Arc<T> {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        (**self).store(key, value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        (**self).retrieve(key).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        (**self).remove(key).await
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        (**self).list_keys(prefix).await
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
    ) -> Result<SwapOutcome, StorageError> {
        (**self).compare_and_swap(key, expected, new).await
    }
}
