//! Error types for the tiling crate.

use thiserror::Error;

use layers_common::LayersError;

/// Errors that can occur while running a tiled job.
#[derive(Error, Debug)]
pub enum TilingError {
    #[error(transparent)]
    Common(#[from] LayersError),

    #[error("Tile production failed: {0}")]
    Production(String),

    #[error("Tiled job incomplete: {failed:?} of {expected} tiles failed")]
    JobIncomplete { expected: usize, failed: Vec<usize> },

    #[error("Invalid tile artifact: {0}")]
    BadArtifact(String),

    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

/// Result type for tiling operations.
pub type TilingResult<T> = std::result::Result<T, TilingError>;
