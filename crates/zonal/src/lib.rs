//! Zonal statistics: per-zone aggregation of produced layer grids.
//!
//! Aggregates a raster over the polygons of a zone collection, optionally
//! masked by other layers and stratified by a categorical raster, re-tiling
//! automatically when the grid exceeds single-call reduction capacity.

pub mod groupby;
pub mod stats;

pub use groupby::{
    to_feature_table, to_row_table, zonal_scalar, zonal_statistics,
    zonal_statistics_with_capacity, ZonalRequest, ZoneAggregate, ZoneResult,
    DEFAULT_REDUCE_CAPACITY,
};
pub use stats::{Aggregate, Statistic};
