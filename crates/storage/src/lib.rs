//! Cache naming and storage for produced layer artifacts.
//!
//! Provides:
//! - the cache naming engine (stable keys from product identity and
//!   non-default parameters, published vs derivative trees)
//! - a cache store over two backends (S3-compatible object storage, local
//!   filesystem) selected by URI scheme
//! - format adapters for the three artifact kinds (binary grid, GeoJSON
//!   feature table, CSV row table)
//! - the geography catalog used to resolve named administrative areas

pub mod catalog;
pub mod config;
pub mod formats;
pub mod local;
pub mod naming;
pub mod object_store;
pub mod store;
pub mod uri;

pub use catalog::{Geography, GeographyCatalog};
pub use config::{CacheConfig, CacheMode, Environment};
pub use naming::{classify, product_file_id, CacheClass, CacheKey};
pub use store::{BlobStore, CacheStore, ProductData};
pub use uri::StorageUri;

pub use self::object_store::{ObjectStorage, ObjectStorageConfig};
pub use local::LocalStorage;
