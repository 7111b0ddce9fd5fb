//! File-backed store.

use std::path::PathBuf;

use async_trait::async_trait;
use tracing::debug;

use super::Store;
use crate::error::{StoreError, StoreResult};

const EXTENSION: &str = "val";

/// File-based key/value storage.
///
/// Persists each key as its own file in a directory. Writes go to a
/// temporary file that is renamed into place, so a crash never leaves a
/// half-written value behind.
#[derive(Debug)]
pub struct FileStore {
    base_path: PathBuf,
}

impl FileStore {
    /// Create a new file store with the given base path.
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
        }
    }

    /// Create file storage in the default location (~/.tura/store).
    #[must_use]
    pub fn default_path() -> Self {
        let path = dirs_next::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".tura")
            .join("store");
        Self::new(path)
    }

    /// Base directory of this store.
    #[must_use]
    pub fn base_path(&self) -> &std::path::Path {
        &self.base_path
    }

    /// Get the file path for a key.
    fn entry_path(&self, key: &str) -> StoreResult<PathBuf> {
        if key.is_empty()
            || !key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(StoreError::backend("file", format!("invalid key '{key}'")));
        }
        Ok(self.base_path.join(format!("{key}.{EXTENSION}")))
    }

    /// Ensure the storage directory exists.
    async fn ensure_dir(&self) -> StoreResult<()> {
        tokio::fs::create_dir_all(&self.base_path).await?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    fn backend(&self) -> &'static str {
        "file"
    }

    async fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let path = self.entry_path(key)?;
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.ensure_dir().await?;

        let path = self.entry_path(key)?;
        let tmp = path.with_extension("tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        debug!(key = %key, "wrote store entry");
        Ok(())
    }

    async fn remove(&self, key: &str) -> StoreResult<()> {
        let path = self.entry_path(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => {
                debug!(key = %key, "removed store entry");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn keys(&self) -> StoreResult<Vec<String>> {
        self.ensure_dir().await?;

        let mut keys = Vec::new();
        let mut entries = tokio::fs::read_dir(&self.base_path).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if path.extension().is_some_and(|ext| ext == EXTENSION)
                && let Some(stem) = path.file_stem()
            {
                keys.push(stem.to_string_lossy().into_owned());
            }
        }

        Ok(keys)
    }
}
