//! Object storage backend for layer artifacts (MinIO/S3 compatible).

use bytes::Bytes;
use object_store::{aws::AmazonS3Builder, path::Path, ObjectStore};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

use layers_common::{LayersError, LayersResult};

/// Configuration for object storage connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObjectStorageConfig {
    /// S3/MinIO endpoint URL
    pub endpoint: String,
    /// Bucket name
    pub bucket: String,
    /// Access key ID
    pub access_key_id: String,
    /// Secret access key
    pub secret_access_key: String,
    /// AWS region (use "us-east-1" for MinIO)
    pub region: String,
    /// Allow HTTP (for local MinIO)
    pub allow_http: bool,
}

impl Default for ObjectStorageConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://minio:9000".to_string(),
            bucket: "layer-cache".to_string(),
            access_key_id: "minioadmin".to_string(),
            secret_access_key: "minioadmin".to_string(),
            region: "us-east-1".to_string(),
            allow_http: true,
        }
    }
}

impl ObjectStorageConfig {
    /// Load connection settings from `LAYERS_S3_*` environment variables,
    /// falling back to the local-MinIO defaults, with the bucket overridden
    /// by the caller.
    pub fn from_env(bucket: &str) -> Self {
        let defaults = Self::default();
        Self {
            endpoint: std::env::var("LAYERS_S3_ENDPOINT").unwrap_or(defaults.endpoint),
            bucket: bucket.to_string(),
            access_key_id: std::env::var("LAYERS_S3_ACCESS_KEY_ID")
                .unwrap_or(defaults.access_key_id),
            secret_access_key: std::env::var("LAYERS_S3_SECRET_ACCESS_KEY")
                .unwrap_or(defaults.secret_access_key),
            region: std::env::var("LAYERS_S3_REGION").unwrap_or(defaults.region),
            allow_http: defaults.allow_http,
        }
    }
}

/// Object storage client for layer artifacts.
pub struct ObjectStorage {
    store: Arc<dyn ObjectStore>,
    bucket: String,
}

impl ObjectStorage {
    /// Create a new object storage client from config.
    pub fn new(config: &ObjectStorageConfig) -> LayersResult<Self> {
        let mut builder = AmazonS3Builder::new()
            .with_endpoint(&config.endpoint)
            .with_bucket_name(&config.bucket)
            .with_access_key_id(&config.access_key_id)
            .with_secret_access_key(&config.secret_access_key)
            .with_region(&config.region);

        if config.allow_http {
            builder = builder.with_allow_http(true);
        }

        let store = builder
            .build()
            .map_err(|e| LayersError::StorageError(format!("Failed to create S3 client: {}", e)))?;

        Ok(Self {
            store: Arc::new(store),
            bucket: config.bucket.clone(),
        })
    }

    /// Write bytes to a path in the bucket.
    ///
    /// An object PUT is atomic: a partially uploaded object is never
    /// visible at the key.
    #[instrument(skip(self, data), fields(bucket = %self.bucket, path = %path))]
    pub async fn put(&self, path: &str, data: Bytes) -> LayersResult<()> {
        let location = Path::from(path);
        debug!(size = data.len(), "Writing object");

        self.store
            .put(&location, data.into())
            .await
            .map_err(|e| LayersError::StorageError(format!("Failed to write {}: {}", path, e)))?;

        Ok(())
    }

    /// Read bytes from a path.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn get(&self, path: &str) -> LayersResult<Bytes> {
        let result = match self.store.get(&Path::from(path)).await {
            Ok(result) => result,
            Err(object_store::Error::NotFound { .. }) => {
                return Err(LayersError::NotFound(path.to_string()));
            }
            Err(e) => {
                return Err(LayersError::StorageError(format!(
                    "Failed to read {}: {}",
                    path, e
                )));
            }
        };

        let bytes = result
            .bytes()
            .await
            .map_err(|e| LayersError::StorageError(format!("Failed to read bytes: {}", e)))?;

        debug!(size = bytes.len(), "Read object");
        Ok(bytes)
    }

    /// Check for any object under a prefix.
    ///
    /// Listing rather than a HEAD lets a single call answer for both plain
    /// objects and directory-like prefixes.
    pub async fn exists(&self, prefix: &str) -> LayersResult<bool> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut stream = self.store.list(Some(&prefix_path));

        match stream.try_next().await {
            Ok(entry) => Ok(entry.is_some()),
            Err(e) => Err(LayersError::StorageError(format!(
                "Failed to check {}: {}",
                prefix, e
            ))),
        }
    }

    /// List objects with a given prefix.
    pub async fn list(&self, prefix: &str) -> LayersResult<Vec<String>> {
        use futures::TryStreamExt;

        let prefix_path = Path::from(prefix);
        let mut paths = Vec::new();

        let mut stream = self.store.list(Some(&prefix_path));
        while let Some(meta) = stream
            .try_next()
            .await
            .map_err(|e| LayersError::StorageError(format!("List failed: {}", e)))?
        {
            paths.push(meta.location.to_string());
        }

        Ok(paths)
    }

    /// Delete an object.
    #[instrument(skip(self), fields(bucket = %self.bucket, path = %path))]
    pub async fn delete(&self, path: &str) -> LayersResult<()> {
        match self.store.delete(&Path::from(path)).await {
            Ok(()) => Ok(()),
            Err(object_store::Error::NotFound { .. }) => Ok(()),
            Err(e) => Err(LayersError::StorageError(format!(
                "Failed to delete {}: {}",
                path, e
            ))),
        }
    }
}
