//! Resumable tile-based production of large-area layer products.
//!
//! An extent too large for a single remote call is partitioned into a
//! fishnet of fixed-size tiles; each tile is produced independently and
//! persisted, failed tiles are marked rather than aborting the job, and a
//! later invocation resumes from whatever artifacts exist.

pub mod artifacts;
pub mod error;
pub mod fishnet;
pub mod job;
pub mod mosaic;
pub mod request;
pub mod state;

pub use artifacts::{FailureMarker, TileSetIndex};
pub use error::{TilingError, TilingResult};
pub use fishnet::{Fishnet, Tile};
pub use job::{TileJobReport, TileProducer, TiledJob, TiledJobConfig};
pub use request::{fetch_or_produce, GridProduct, RequestOptions};
pub use state::{JobState, StoreJobState};
