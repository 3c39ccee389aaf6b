//! The resumable tiled production job.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use tracing::{debug, info, warn};

use layers_common::{Extent, RasterGrid};
use projection::ReprojectExt;
use storage::{CacheStore, ProductData};

use crate::artifacts::{self, FailureMarker, TileSetIndex};
use crate::error::TilingResult;
use crate::fishnet::Fishnet;
use crate::state::{JobState, StoreJobState};

/// Production of one tile's data, via the ordinary single-call path.
#[async_trait]
pub trait TileProducer: Send + Sync {
    async fn produce(&self, extent: &Extent) -> TilingResult<RasterGrid>;
}

/// Settings for one tiled job.
#[derive(Debug, Clone)]
pub struct TiledJobConfig {
    /// Tile side length in meters (the fishnet is built on the projected
    /// extent, so tile size is geography-independent).
    pub tile_side: f64,
    /// Bypass resume: reprocess every tile, overwriting artifacts and
    /// failure markers.
    pub force_refresh: bool,
    /// Recorded attempts after which a failed tile is no longer retried by
    /// resumption.
    pub max_tile_attempts: u32,
}

impl TiledJobConfig {
    pub fn new(tile_side: f64) -> Self {
        Self {
            tile_side,
            force_refresh: false,
            max_tile_attempts: 3,
        }
    }

    pub fn with_force_refresh(mut self, force_refresh: bool) -> Self {
        self.force_refresh = force_refresh;
        self
    }

    pub fn with_max_tile_attempts(mut self, max_tile_attempts: u32) -> Self {
        self.max_tile_attempts = max_tile_attempts;
        self
    }
}

/// Outcome of one job invocation.
///
/// A job with failed tiles is reported, not raised: callers inspect the
/// report and decide whether to re-run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TileJobReport {
    /// Expected tile count of the fishnet.
    pub expected: usize,
    /// Tiles produced by this invocation.
    pub processed: Vec<usize>,
    /// Tiles skipped because a prior invocation completed them.
    pub skipped: Vec<usize>,
    /// Tiles that failed (this invocation or, if out of retry budget, a
    /// prior one).
    pub failed: Vec<usize>,
    /// Whether every expected tile now has a real artifact.
    pub complete: bool,
}

/// Drives per-tile production over a fishnet partition, persisting each
/// tile independently and resuming from existing artifacts.
pub struct TiledJob<'a, P> {
    producer: &'a P,
    store: &'a CacheStore,
    prefix: String,
    config: TiledJobConfig,
}

impl<'a, P: TileProducer> TiledJob<'a, P> {
    pub fn new(
        producer: &'a P,
        store: &'a CacheStore,
        prefix: impl Into<String>,
        config: TiledJobConfig,
    ) -> Self {
        Self {
            producer,
            store,
            prefix: prefix.into(),
            config,
        }
    }

    fn tile_key(&self, index: usize) -> String {
        format!("{}/{}", self.prefix, artifacts::tile_artifact(index))
    }

    fn marker_key(&self, index: usize) -> String {
        format!("{}/{}", self.prefix, artifacts::failed_artifact(index))
    }

    /// Run (or resume) the job over an extent.
    ///
    /// Tiles are attempted in fishnet order. One tile's failure is recorded
    /// as a marker and the job moves on; a failure listing or reading the
    /// target location is fatal.
    pub async fn run(&self, extent: &Extent) -> TilingResult<TileJobReport> {
        let projected = extent.as_utm()?;
        let net = Fishnet::partition(&projected, self.config.tile_side)?;
        let expected = net.len();

        let (completed, markers) = if self.config.force_refresh {
            (Default::default(), Default::default())
        } else {
            let state = StoreJobState::new(self.store, self.prefix.clone(), expected);
            (state.completed_tiles().await?, state.failure_markers().await?)
        };

        info!(
            prefix = %self.prefix,
            expected,
            already_completed = completed.len(),
            tile_side = self.config.tile_side,
            "Starting tiled job"
        );

        let mut report = TileJobReport {
            expected,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
            complete: false,
        };

        for tile in net.tiles() {
            if completed.contains(&tile.index) {
                report.skipped.push(tile.index);
                continue;
            }

            let prior_attempts = markers.get(&tile.index).map(|m| m.attempts).unwrap_or(0);
            if prior_attempts >= self.config.max_tile_attempts {
                warn!(
                    index = tile.index,
                    attempts = prior_attempts,
                    "Tile out of retry budget, leaving its failure marker"
                );
                report.failed.push(tile.index);
                continue;
            }

            match self.producer.produce(&tile.extent).await {
                Ok(grid) => {
                    self.store
                        .write_product(&self.tile_key(tile.index), &ProductData::Grid(grid))
                        .await?;
                    // A stale marker from an earlier failed attempt must not
                    // outlive the real artifact
                    self.store.delete(&self.marker_key(tile.index)).await?;

                    debug!(index = tile.index, "Tile produced");
                    report.processed.push(tile.index);
                }
                Err(e) => {
                    warn!(index = tile.index, error = %e, "Tile production failed, continuing");

                    let marker = FailureMarker {
                        index: tile.index,
                        error: e.to_string(),
                        attempts: prior_attempts + 1,
                        attempted_at: Utc::now(),
                    };
                    let body = serde_json::to_vec(&marker)
                        .map_err(layers_common::LayersError::from)?;
                    self.store
                        .write_bytes(&self.marker_key(tile.index), Bytes::from(body))
                        .await?;

                    report.failed.push(tile.index);
                }
            }
        }

        report.complete = report.failed.is_empty()
            && report.processed.len() + report.skipped.len() == expected;

        if report.complete {
            let index = TileSetIndex {
                extent: projected,
                tile_side: self.config.tile_side,
                tile_count: expected,
                tiles: (0..expected).map(artifacts::tile_artifact).collect(),
                generated_at: Utc::now(),
            };
            let body =
                serde_json::to_vec(&index).map_err(layers_common::LayersError::from)?;
            self.store
                .write_bytes(
                    &format!("{}/{}", self.prefix, artifacts::INDEX_ARTIFACT),
                    Bytes::from(body),
                )
                .await?;
        }

        info!(
            prefix = %self.prefix,
            processed = report.processed.len(),
            skipped = report.skipped.len(),
            failed = report.failed.len(),
            complete = report.complete,
            "Tiled job finished"
        );

        Ok(report)
    }
}
