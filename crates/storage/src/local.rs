//! Local filesystem backend for layer artifacts.

use bytes::Bytes;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};
use uuid::Uuid;

use layers_common::{LayersError, LayersResult};

/// Filesystem-backed artifact storage rooted at a directory.
pub struct LocalStorage {
    root: PathBuf,
}

impl LocalStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Write bytes under a key.
    ///
    /// Writes go to a uniquely named temporary file in the target directory
    /// and are renamed into place, so a partially written artifact is never
    /// visible at the final key.
    #[instrument(skip(self, data), fields(root = %self.root.display(), key = %key))]
    pub async fn put(&self, key: &str, data: Bytes) -> LayersResult<()> {
        let path = self.resolve(key);
        let parent = path.parent().ok_or_else(|| {
            LayersError::StorageError(format!("key has no parent directory: {}", key))
        })?;
        tokio::fs::create_dir_all(parent).await?;

        let temp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&temp_path, &data).await?;
        tokio::fs::rename(&temp_path, &path).await?;

        debug!(size = data.len(), "Wrote file");
        Ok(())
    }

    /// Read bytes from a key.
    #[instrument(skip(self), fields(root = %self.root.display(), key = %key))]
    pub async fn get(&self, key: &str) -> LayersResult<Bytes> {
        let path = self.resolve(key);
        match tokio::fs::read(&path).await {
            Ok(data) => {
                debug!(size = data.len(), "Read file");
                Ok(Bytes::from(data))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(LayersError::NotFound(key.to_string()))
            }
            Err(e) => Err(LayersError::StorageError(format!(
                "Failed to read {}: {}",
                key, e
            ))),
        }
    }

    /// Check whether a key exists as a file or a directory.
    pub async fn exists(&self, key: &str) -> LayersResult<bool> {
        let path = self.resolve(key);
        Ok(tokio::fs::try_exists(&path).await?)
    }

    /// List file keys under a prefix, relative to the storage root.
    pub async fn list(&self, prefix: &str) -> LayersResult<Vec<String>> {
        let base = self.resolve(prefix);
        if !tokio::fs::try_exists(&base).await? {
            return Ok(Vec::new());
        }

        let root = self.root.clone();
        let keys = tokio::task::spawn_blocking(move || -> LayersResult<Vec<String>> {
            let mut keys = Vec::new();
            for entry in walkdir::WalkDir::new(&base) {
                let entry = entry.map_err(|e| LayersError::StorageError(e.to_string()))?;
                if entry.file_type().is_file() {
                    let relative = entry.path().strip_prefix(&root).map_err(|e| {
                        LayersError::StorageError(format!("path outside root: {}", e))
                    })?;
                    keys.push(relative.to_string_lossy().replace('\\', "/"));
                }
            }
            Ok(keys)
        })
        .await
        .map_err(|e| LayersError::InternalError(format!("listing task failed: {}", e)))??;

        Ok(keys)
    }

    /// Delete a key if it exists.
    #[instrument(skip(self), fields(root = %self.root.display(), key = %key))]
    pub async fn delete(&self, key: &str) -> LayersResult<()> {
        let path = self.resolve(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(LayersError::StorageError(format!(
                "Failed to delete {}: {}",
                key, e
            ))),
        }
    }
}
