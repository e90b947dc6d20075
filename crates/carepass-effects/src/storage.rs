//! Filesystem record storage
//!
//! Each record lives in its own file at `{base}/{key}.dat`; `/` in a key
//! becomes a directory level, so `grants/<id>` and `queue/jobs/<id>` keep the
//! two tables in separate directories. Files are written to a temporary
//! sibling and renamed into place, so a reader never sees a partial record.
//!
//! Mutations are serialized by a lock shared between clones of the handler.
//! That makes `compare_and_swap` atomic for every user of one process. Two
//! processes pointed at the same directory are not coordinated.

use async_trait::async_trait;
use carepass_core::effects::{StorageEffects, StorageError, SwapOutcome};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::sync::Mutex;

const RECORD_EXT: &str = "dat";
const TEMP_EXT: &str = "tmp";

/// Filesystem-based storage handler for production use
#[derive(Debug, Clone)]
pub struct FilesystemStorageHandler {
    base_path: PathBuf,
    write_lock: Arc<Mutex<()>>,
}

impl FilesystemStorageHandler {
    /// Store records under `base_path`. The directory is created on first
    /// write.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            write_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Root data directory
    pub fn base_path(&self) -> &Path {
        &self.base_path
    }

    fn record_path(&self, key: &str) -> Result<PathBuf, StorageError> {
        validate_key(key)?;
        let (dirs, file) = key.rsplit_once('/').unwrap_or(("", key));
        let mut path = self.base_path.clone();
        path.extend(dirs.split('/').filter(|s| !s.is_empty()));
        path.push(format!("{file}.{RECORD_EXT}"));
        Ok(path)
    }

    async fn read_record(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
        match fs::read(path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StorageError::ReadFailed(format!(
                "failed to read {}: {e}",
                path.display()
            ))),
        }
    }

    async fn write_record(path: &Path, value: &[u8]) -> Result<(), StorageError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::WriteFailed(format!("failed to create {}: {e}", parent.display()))
            })?;
        }
        let temp = path.with_extension(TEMP_EXT);
        fs::write(&temp, value).await.map_err(|e| {
            StorageError::WriteFailed(format!("failed to write {}: {e}", temp.display()))
        })?;
        fs::rename(&temp, path).await.map_err(|e| {
            StorageError::WriteFailed(format!("failed to replace {}: {e}", path.display()))
        })
    }

    fn key_for(&self, path: &Path) -> Option<String> {
        if path.extension().and_then(|e| e.to_str()) != Some(RECORD_EXT) {
            return None;
        }
        let relative = path.strip_prefix(&self.base_path).ok()?.with_extension("");
        let segments: Option<Vec<&str>> = relative
            .components()
            .map(|c| c.as_os_str().to_str())
            .collect();
        Some(segments?.join("/"))
    }
}

/// Keys are `/`-separated segments of ASCII letters, digits, `-`, `_` and
/// `.`. Empty segments and `.`/`..` are refused so a key can never name a
/// path outside the data directory.
fn validate_key(key: &str) -> Result<(), StorageError> {
    let invalid = |reason: String| Err(StorageError::InvalidKey { reason });
    if key.is_empty() {
        return invalid("key cannot be empty".to_string());
    }
    for segment in key.split('/') {
        if segment.is_empty() || segment == "." || segment == ".." {
            return invalid(format!("key '{key}' has an empty or relative segment"));
        }
        if let Some(c) = segment
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
        {
            return invalid(format!("key '{key}' contains '{c}'"));
        }
    }
    Ok(())
}

#[async_trait]
impl StorageEffects for FilesystemStorageHandler {
    async fn store(&self, key: &str, value: Vec<u8>) -> Result<(), StorageError> {
        let path = self.record_path(key)?;
        let _guard = self.write_lock.lock().await;
        Self::write_record(&path, &value).await
    }

    async fn retrieve(&self, key: &str) -> Result<Option<Vec<u8>>, StorageError> {
        let path = self.record_path(key)?;
        Self::read_record(&path).await
    }

    async fn remove(&self, key: &str) -> Result<bool, StorageError> {
        let path = self.record_path(key)?;
        let _guard = self.write_lock.lock().await;
        match fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::DeleteFailed(format!(
                "failed to remove {}: {e}",
                path.display()
            ))),
        }
    }

    async fn list_keys(&self, prefix: Option<&str>) -> Result<Vec<String>, StorageError> {
        let mut keys = Vec::new();
        let mut stack = vec![self.base_path.clone()];

        while let Some(dir) = stack.pop() {
            let mut entries = match fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => {
                    return Err(StorageError::ReadFailed(format!(
                        "failed to read directory {}: {e}",
                        dir.display()
                    )))
                }
            };

            while let Some(entry) = entries.next_entry().await.map_err(|e| {
                StorageError::ReadFailed(format!("failed to read directory entry: {e}"))
            })? {
                let file_type = entry.file_type().await.map_err(|e| {
                    StorageError::ReadFailed(format!("failed to stat directory entry: {e}"))
                })?;
                let path = entry.path();
                if file_type.is_dir() {
                    stack.push(path);
                } else if file_type.is_file() {
                    match self.key_for(&path) {
                        Some(key) if prefix.map_or(true, |p| key.starts_with(p)) => keys.push(key),
                        _ => {}
                    }
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    async fn compare_and_swap(
        &self,
        key: &str,
        expected: &[u8],
        new: Vec<u8>,
    ) -> Result<SwapOutcome, StorageError> {
        let path = self.record_path(key)?;
        let _guard = self.write_lock.lock().await;
        match Self::read_record(&path).await? {
            Some(current) if current == expected => {
                Self::write_record(&path, &new).await?;
                Ok(SwapOutcome::Swapped)
            }
            _ => {
                tracing::debug!(key, "compare-and-swap lost");
                Ok(SwapOutcome::Conflict)
            }
        }
    }
}
