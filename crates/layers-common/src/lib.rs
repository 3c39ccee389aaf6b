//! Common types shared across the urban-layers workspace.

pub mod bbox;
pub mod crs;
pub mod error;
pub mod extent;
pub mod grid;
pub mod product;
pub mod zone;

pub use bbox::BoundingBox;
pub use crs::CrsCode;
pub use error::{LayersError, LayersResult};
pub use extent::Extent;
pub use grid::{GridSpec, RasterGrid};
pub use product::{
    AttributeValue, FeatureRecord, FeatureTable, NamingAttribute, OutputKind, Product,
    ProductFamily, RowTable,
};
pub use zone::{Zone, ZoneCollection};
