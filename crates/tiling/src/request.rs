//! Cached product requests: the path every layer request flows through.
//!
//! Compute the cache key, check for an existing artifact, and on a miss
//! produce the data — tiled when the projected extent exceeds the
//! product's tile side, in one call otherwise — persisting the result
//! through the cache store.

use tracing::{debug, info};

use layers_common::{Extent, LayersError, OutputKind, Product, RasterGrid};
use projection::ReprojectExt;
use storage::{classify, CacheConfig, CacheKey, CacheStore, ProductData};

use crate::artifacts;
use crate::error::{TilingError, TilingResult};
use crate::job::{TileProducer, TiledJob, TiledJobConfig};
use crate::mosaic::mosaic;

/// A raster product that knows how to produce itself for an extent.
pub trait GridProduct: Product + TileProducer {
    /// Tile side in meters above which production is split into a fishnet
    /// job. `None` always produces in a single call.
    fn tile_side(&self) -> Option<f64> {
        None
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    /// Rebuild even when a cached artifact exists, overwriting it.
    pub force_refresh: bool,
}

/// Fetch a raster product from cache, producing and persisting it on miss.
///
/// With caching disabled the product is always produced fresh and nothing
/// persists.
pub async fn fetch_or_produce<P: GridProduct>(
    product: &P,
    geography: &storage::Geography,
    extent: &Extent,
    config: &CacheConfig,
    options: &RequestOptions,
) -> TilingResult<RasterGrid> {
    if product.output_kind() != OutputKind::RasterGrid {
        return Err(LayersError::InvalidParameter {
            param: "product".to_string(),
            message: "fetch_or_produce expects a raster-grid product".to_string(),
        }
        .into());
    }

    let Some(root) = config.root_for(classify(product)) else {
        debug!("cache disabled, producing fresh");
        return product.produce(extent).await;
    };
    let environment = config.environment().ok_or_else(|| {
        LayersError::InternalError("cache root present without an environment".to_string())
    })?;

    let key = CacheKey::for_product(
        environment,
        product,
        &geography.id,
        &geography.admin_level,
    );
    let path = key.object_path();
    let store = CacheStore::open(root)?;

    if !options.force_refresh && store.exists(&path).await? {
        debug!(path = %path, "cache hit");
        let data = store
            .read_product(&path, OutputKind::RasterGrid, Some(extent.utm_crs()))
            .await?;
        return match data {
            ProductData::Grid(grid) => Ok(grid),
            other => Err(LayersError::DataReadError(format!(
                "artifact at {} decoded as {:?}",
                path,
                other.kind()
            ))
            .into()),
        };
    }

    let projected = extent.as_utm()?;
    let tile_side = product
        .tile_side()
        .filter(|side| projected.bbox().width() > *side || projected.bbox().height() > *side);

    let grid = if let Some(side) = tile_side {
        let prefix = key.tile_prefix();
        info!(prefix = %prefix, side, "extent exceeds single-request limit, tiling");

        let job = TiledJob::new(
            product,
            &store,
            prefix.clone(),
            TiledJobConfig::new(side).with_force_refresh(options.force_refresh),
        );
        let report = job.run(extent).await?;
        if !report.complete {
            return Err(TilingError::JobIncomplete {
                expected: report.expected,
                failed: report.failed,
            });
        }

        let mut tiles = Vec::with_capacity(report.expected);
        for index in 0..report.expected {
            let tile_key = format!("{}/{}", prefix, artifacts::tile_artifact(index));
            match store
                .read_product(&tile_key, OutputKind::RasterGrid, Some(projected.crs()))
                .await?
            {
                ProductData::Grid(grid) => tiles.push(grid),
                other => {
                    return Err(TilingError::BadArtifact(format!(
                        "{} decoded as {:?}",
                        tile_key,
                        other.kind()
                    )));
                }
            }
        }
        mosaic(&tiles)?
    } else {
        product.produce(extent).await?
    };

    store
        .write_product(&path, &ProductData::Grid(grid.clone()))
        .await?;
    info!(path = %path, "produced and cached");

    Ok(grid)
}
