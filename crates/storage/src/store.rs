//! The cache store: one interface over both storage backends, with typed
//! product read/write on top.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::Arc;

use layers_common::{
    CrsCode, FeatureTable, LayersResult, OutputKind, RasterGrid, RowTable,
};

use crate::formats;
use crate::local::LocalStorage;
use crate::object_store::{ObjectStorage, ObjectStorageConfig};
use crate::uri::StorageUri;

/// Byte-level operations every backend provides.
///
/// Keys are slash-separated paths relative to the store root.
#[async_trait]
pub trait BlobStore: Send + Sync {
    async fn exists(&self, key: &str) -> LayersResult<bool>;
    async fn get(&self, key: &str) -> LayersResult<Bytes>;
    async fn put(&self, key: &str, data: Bytes) -> LayersResult<()>;
    async fn list(&self, prefix: &str) -> LayersResult<Vec<String>>;
    async fn delete(&self, key: &str) -> LayersResult<()>;
}

#[async_trait]
impl BlobStore for LocalStorage {
    async fn exists(&self, key: &str) -> LayersResult<bool> {
        LocalStorage::exists(self, key).await
    }

    async fn get(&self, key: &str) -> LayersResult<Bytes> {
        LocalStorage::get(self, key).await
    }

    async fn put(&self, key: &str, data: Bytes) -> LayersResult<()> {
        LocalStorage::put(self, key, data).await
    }

    async fn list(&self, prefix: &str) -> LayersResult<Vec<String>> {
        LocalStorage::list(self, prefix).await
    }

    async fn delete(&self, key: &str) -> LayersResult<()> {
        LocalStorage::delete(self, key).await
    }
}

/// Object-store backend scoped to a key prefix inside its bucket.
struct PrefixedObjectStorage {
    storage: ObjectStorage,
    prefix: String,
}

impl PrefixedObjectStorage {
    fn full_key(&self, key: &str) -> String {
        if self.prefix.is_empty() {
            key.to_string()
        } else {
            format!("{}/{}", self.prefix, key)
        }
    }

    fn strip_prefix<'a>(&self, key: &'a str) -> &'a str {
        match self.prefix.is_empty() {
            true => key,
            false => key
                .strip_prefix(self.prefix.as_str())
                .map(|k| k.trim_start_matches('/'))
                .unwrap_or(key),
        }
    }
}

#[async_trait]
impl BlobStore for PrefixedObjectStorage {
    async fn exists(&self, key: &str) -> LayersResult<bool> {
        self.storage.exists(&self.full_key(key)).await
    }

    async fn get(&self, key: &str) -> LayersResult<Bytes> {
        self.storage.get(&self.full_key(key)).await
    }

    async fn put(&self, key: &str, data: Bytes) -> LayersResult<()> {
        self.storage.put(&self.full_key(key), data).await
    }

    async fn list(&self, prefix: &str) -> LayersResult<Vec<String>> {
        let keys = self.storage.list(&self.full_key(prefix)).await?;
        Ok(keys
            .iter()
            .map(|k| self.strip_prefix(k).to_string())
            .collect())
    }

    async fn delete(&self, key: &str) -> LayersResult<()> {
        self.storage.delete(&self.full_key(key)).await
    }
}

/// An in-memory product of any output kind.
#[derive(Debug, Clone, PartialEq)]
pub enum ProductData {
    Grid(RasterGrid),
    Features(FeatureTable),
    Table(RowTable),
}

impl ProductData {
    pub fn kind(&self) -> OutputKind {
        match self {
            ProductData::Grid(_) => OutputKind::RasterGrid,
            ProductData::Features(_) => OutputKind::FeatureTable,
            ProductData::Table(_) => OutputKind::RowTable,
        }
    }
}

/// A cache store rooted at a storage URI.
///
/// The URI scheme selects the backend; everything above the byte level is
/// dispatched exhaustively on the product's declared output kind.
#[derive(Clone)]
pub struct CacheStore {
    backend: Arc<dyn BlobStore>,
}

impl CacheStore {
    /// Open a store at a root URI.
    pub fn open(root: &StorageUri) -> LayersResult<Self> {
        let backend: Arc<dyn BlobStore> = match root {
            StorageUri::S3 { bucket, prefix } => Arc::new(PrefixedObjectStorage {
                storage: ObjectStorage::new(&ObjectStorageConfig::from_env(bucket))?,
                prefix: prefix.clone(),
            }),
            StorageUri::File { path } => Arc::new(LocalStorage::new(path.clone())),
        };

        Ok(Self { backend })
    }

    /// Wrap an already constructed backend (used by tests and alternate
    /// job-state implementations).
    pub fn with_backend(backend: Arc<dyn BlobStore>) -> Self {
        Self { backend }
    }

    pub async fn exists(&self, key: &str) -> LayersResult<bool> {
        self.backend.exists(key).await
    }

    pub async fn read_bytes(&self, key: &str) -> LayersResult<Bytes> {
        self.backend.get(key).await
    }

    pub async fn write_bytes(&self, key: &str, data: Bytes) -> LayersResult<()> {
        self.backend.put(key, data).await
    }

    pub async fn list(&self, prefix: &str) -> LayersResult<Vec<String>> {
        self.backend.list(prefix).await
    }

    pub async fn delete(&self, key: &str) -> LayersResult<()> {
        self.backend.delete(key).await
    }

    /// Read a product artifact, dispatching by its declared output kind.
    ///
    /// `fallback_crs` is re-attached when the artifact does not embed one.
    /// Callers check `exists` first or handle the not-found error.
    pub async fn read_product(
        &self,
        key: &str,
        kind: OutputKind,
        fallback_crs: Option<CrsCode>,
    ) -> LayersResult<ProductData> {
        let data = self.backend.get(key).await?;

        match kind {
            OutputKind::RasterGrid => {
                Ok(ProductData::Grid(formats::decode_grid(&data, fallback_crs)?))
            }
            OutputKind::FeatureTable => Ok(ProductData::Features(formats::decode_features(
                &data,
                fallback_crs,
            )?)),
            OutputKind::RowTable => Ok(ProductData::Table(formats::decode_table(&data)?)),
        }
    }

    /// Serialize and write a product artifact.
    pub async fn write_product(&self, key: &str, data: &ProductData) -> LayersResult<()> {
        let bytes = match data {
            ProductData::Grid(grid) => formats::encode_grid(grid)?,
            ProductData::Features(table) => formats::encode_features(table)?,
            ProductData::Table(table) => formats::encode_table(table)?,
        };

        self.backend.put(key, bytes).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers_common::GridSpec;

    fn local_store() -> (tempfile::TempDir, CacheStore) {
        let dir = tempfile::tempdir().unwrap();
        let root = StorageUri::File {
            path: dir.path().to_path_buf(),
        };
        let store = CacheStore::open(&root).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn test_product_roundtrip_by_kind() {
        let (_dir, store) = local_store();

        let grid = RasterGrid::filled(
            GridSpec::new(2, 2, 1.0, 1.0, 0.0, 2.0),
            CrsCode::Epsg4326,
            3.5,
        );
        store
            .write_product("prod/layers/grid/x.grid", &ProductData::Grid(grid.clone()))
            .await
            .unwrap();

        let read = store
            .read_product("prod/layers/grid/x.grid", OutputKind::RasterGrid, None)
            .await
            .unwrap();
        assert_eq!(read, ProductData::Grid(grid));
    }

    #[tokio::test]
    async fn test_exists_before_read_contract() {
        let (_dir, store) = local_store();

        assert!(!store.exists("missing.grid").await.unwrap());
        let err = store
            .read_product("missing.grid", OutputKind::RasterGrid, None)
            .await
            .unwrap_err();
        assert!(matches!(err, layers_common::LayersError::NotFound(_)));
    }
}
