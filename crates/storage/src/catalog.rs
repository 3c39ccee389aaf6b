//! Geography catalog: the metadata lookup behind named administrative areas.
//!
//! A JSON document at the cache root maps geography ids to their admin
//! level, bounds, CRS, and (optionally) the key of a GeoJSON artifact
//! holding the zone geometries for that geography.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::warn;

use layers_common::{
    BoundingBox, CrsCode, Extent, LayersError, LayersResult, OutputKind, Zone, ZoneCollection,
};

use crate::store::{CacheStore, ProductData};

/// Key of the catalog document under the cache root.
pub const CATALOG_KEY: &str = "geographies.json";

const MAX_FETCH_RETRIES: u32 = 3;
const INITIAL_RETRY_DELAY: Duration = Duration::from_millis(250);

#[derive(Debug, Serialize, Deserialize)]
struct CatalogDocument {
    geographies: BTreeMap<String, CatalogEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct CatalogEntry {
    admin_level: String,
    crs: String,
    bounds: BoundingBox,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    zones_key: Option<String>,
}

/// A resolved named administrative area.
#[derive(Debug, Clone, PartialEq)]
pub struct Geography {
    pub id: String,
    pub admin_level: String,
    pub extent: Extent,
}

/// Catalog client resolving geography ids against a cache store.
pub struct GeographyCatalog {
    store: CacheStore,
    max_retries: u32,
}

impl GeographyCatalog {
    pub fn new(store: CacheStore) -> Self {
        Self {
            store,
            max_retries: MAX_FETCH_RETRIES,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Fetch the catalog document.
    ///
    /// Transient storage errors are retried a fixed number of times with a
    /// doubling delay; a missing document or a malformed one is surfaced
    /// immediately.
    async fn fetch_document(&self) -> LayersResult<CatalogDocument> {
        let mut attempt = 0;
        let mut delay = INITIAL_RETRY_DELAY;

        loop {
            match self.store.read_bytes(CATALOG_KEY).await {
                Ok(data) => {
                    return serde_json::from_slice(&data).map_err(|e| {
                        LayersError::DataReadError(format!("bad geography catalog: {}", e))
                    });
                }
                Err(LayersError::NotFound(_)) => {
                    return Err(LayersError::DataReadError(format!(
                        "geography catalog '{}' does not exist at the cache root",
                        CATALOG_KEY
                    )));
                }
                Err(e) => {
                    attempt += 1;
                    if attempt > self.max_retries {
                        return Err(e);
                    }

                    warn!(
                        error = %e,
                        attempt,
                        max_retries = self.max_retries,
                        "Catalog fetch failed, retrying"
                    );

                    tokio::time::sleep(delay).await;
                    delay *= 2;
                }
            }
        }
    }

    /// Resolve a geography id to its admin level and extent.
    pub async fn resolve(&self, id: &str) -> LayersResult<Geography> {
        let document = self.fetch_document().await?;
        let entry = document
            .geographies
            .get(id)
            .ok_or_else(|| LayersError::GeographyNotFound(id.to_string()))?;

        let crs = CrsCode::from_epsg_string(&entry.crs)?;
        let extent = Extent::new(entry.bounds, crs)?;

        Ok(Geography {
            id: id.to_string(),
            admin_level: entry.admin_level.clone(),
            extent,
        })
    }

    /// Load the zone collection for a geography.
    pub async fn zones(&self, id: &str) -> LayersResult<ZoneCollection> {
        let document = self.fetch_document().await?;
        let entry = document
            .geographies
            .get(id)
            .ok_or_else(|| LayersError::GeographyNotFound(id.to_string()))?;

        let zones_key = entry.zones_key.as_ref().ok_or_else(|| {
            LayersError::InvalidZones(format!("geography '{}' has no zone artifact", id))
        })?;

        let crs = CrsCode::from_epsg_string(&entry.crs)?;
        let data = self
            .store
            .read_product(zones_key, OutputKind::FeatureTable, Some(crs))
            .await?;

        let table = match data {
            ProductData::Features(table) => table,
            other => {
                return Err(LayersError::DataReadError(format!(
                    "zone artifact for '{}' decoded as {:?}",
                    id,
                    other.kind()
                )));
            }
        };

        let zones = table
            .features
            .into_iter()
            .map(|f| Zone::new(f.id, f.geometry))
            .collect();

        ZoneCollection::new(table.crs, zones)
    }
}
