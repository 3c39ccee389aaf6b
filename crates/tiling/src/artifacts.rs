//! Tile artifact naming and the small JSON documents stored alongside
//! tile data.
//!
//! Completed tiles are `tile_<zero-padded-index>.grid`; a failed attempt
//! persists `tile_<index>_processing_failed.grid` instead, whose body is a
//! [`FailureMarker`]. A completed job writes a [`TileSetIndex`] summary as
//! `grid_index.json`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use layers_common::Extent;

/// Extension shared by tile artifacts and failure markers.
pub const TILE_EXTENSION: &str = "grid";

/// Suffix marking an artifact as a recorded failure, placed before the
/// extension so a failed attempt can never be mistaken for tile data.
pub const FAILED_SUFFIX: &str = "_processing_failed";

/// Name of the per-job summary artifact.
pub const INDEX_ARTIFACT: &str = "grid_index.json";

/// Artifact name for a completed tile.
pub fn tile_artifact(index: usize) -> String {
    format!("tile_{:05}.{}", index, TILE_EXTENSION)
}

/// Artifact name recording a failed attempt at a tile.
pub fn failed_artifact(index: usize) -> String {
    format!("tile_{:05}{}.{}", index, FAILED_SUFFIX, TILE_EXTENSION)
}

/// A parsed tile artifact name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileArtifact {
    pub index: usize,
    pub failed: bool,
}

/// Parse a tile artifact file name; `None` for anything else (including
/// the index artifact and foreign files).
pub fn parse_artifact(name: &str) -> Option<TileArtifact> {
    let stem = name.strip_suffix(&format!(".{}", TILE_EXTENSION))?;

    let (stem, failed) = match stem.strip_suffix(FAILED_SUFFIX) {
        Some(stem) => (stem, true),
        None => (stem, false),
    };

    let index = stem.strip_prefix("tile_")?.parse().ok()?;
    Some(TileArtifact { index, failed })
}

/// The body of a failure-marker artifact.
///
/// The attempt count bounds retries: resumption reprocesses a failed tile
/// only while its recorded attempts stay under the job's budget.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureMarker {
    pub index: usize,
    pub error: String,
    pub attempts: u32,
    pub attempted_at: DateTime<Utc>,
}

impl FailureMarker {
    /// Decode a marker body, tolerating unreadable content.
    ///
    /// A stray or truncated marker still marks the tile as failed; it just
    /// carries no attempt history, so the tile is eligible for reprocessing.
    pub fn decode(index: usize, data: &[u8]) -> FailureMarker {
        serde_json::from_slice(data).unwrap_or(FailureMarker {
            index,
            error: "unreadable failure marker".to_string(),
            attempts: 0,
            attempted_at: Utc::now(),
        })
    }
}

/// Summary of a completed tile set, written once the job is complete.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TileSetIndex {
    pub extent: Extent,
    pub tile_side: f64,
    pub tile_count: usize,
    pub tiles: Vec<String>,
    pub generated_at: DateTime<Utc>,
}
