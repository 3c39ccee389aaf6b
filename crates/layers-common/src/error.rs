//! Error types shared across the urban-layers crates.

use thiserror::Error;

/// Result type alias using LayersError.
pub type LayersResult<T> = Result<T, LayersError>;

/// Primary error type for layer/metric operations.
#[derive(Debug, Error)]
pub enum LayersError {
    // === Configuration Errors ===
    #[error("Missing required parameter: {0}")]
    MissingParameter(String),

    #[error("Invalid parameter value for '{param}': {message}")]
    InvalidParameter { param: String, message: String },

    #[error("Invalid CRS: {0}")]
    InvalidCrs(String),

    #[error("Invalid extent: {0}")]
    InvalidExtent(String),

    #[error("Invalid statistic: {0}")]
    InvalidStatistic(String),

    #[error("Unknown geography: {0}")]
    GeographyNotFound(String),

    // === Data Errors ===
    #[error("Failed to read data: {0}")]
    DataReadError(String),

    #[error("Invalid zone collection: {0}")]
    InvalidZones(String),

    #[error("Grids are not aligned: {0}")]
    GridMismatch(String),

    // === Storage Errors ===
    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Artifact not found: {0}")]
    NotFound(String),

    // === Infrastructure Errors ===
    #[error("Projection error: {0}")]
    ProjectionError(String),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl LayersError {
    /// Whether this error is a caller configuration problem (never retried)
    /// as opposed to a data or infrastructure failure.
    pub fn is_configuration(&self) -> bool {
        matches!(
            self,
            LayersError::MissingParameter(_)
                | LayersError::InvalidParameter { .. }
                | LayersError::InvalidCrs(_)
                | LayersError::InvalidExtent(_)
                | LayersError::InvalidStatistic(_)
                | LayersError::GeographyNotFound(_)
        )
    }
}

// Conversion from common error types
impl From<std::io::Error> for LayersError {
    fn from(err: std::io::Error) -> Self {
        LayersError::StorageError(err.to_string())
    }
}

impl From<serde_json::Error> for LayersError {
    fn from(err: serde_json::Error) -> Self {
        LayersError::InternalError(format!("JSON error: {}", err))
    }
}
