//! Common fixtures for urban-layers tests.
//!
//! Pre-defined extents, synthetic grids, and zone collections representing
//! the scenarios the engines are exercised against.

use geo_types::{polygon, Polygon};

use layers_common::{CrsCode, Extent, GridSpec, RasterGrid, Zone, ZoneCollection};

/// Geographic bounding boxes of real areas of interest.
pub mod bbox {
    /// Nairobi metro area
    pub const NAIROBI: (f64, f64, f64, f64) = (36.66, -1.44, 37.10, -1.16);

    /// Buenos Aires city proper
    pub const BUENOS_AIRES: (f64, f64, f64, f64) = (-58.53, -34.71, -58.33, -34.52);

    /// Amsterdam
    pub const AMSTERDAM: (f64, f64, f64, f64) = (4.73, 52.28, 5.08, 52.43);
}

/// A UTM test CRS (zone 31 north, covering 0..6E).
pub fn utm31() -> CrsCode {
    CrsCode::Utm {
        zone: 31,
        north: true,
    }
}

/// A projected extent of the given size in meters, anchored at
/// (500000, 100000) in UTM zone 31N.
pub fn utm_extent(width: f64, height: f64) -> Extent {
    Extent::from_corners(
        500_000.0,
        100_000.0,
        500_000.0 + width,
        100_000.0 + height,
        utm31(),
    )
    .expect("fixture extent is valid")
}

/// The Nairobi geographic extent.
pub fn nairobi_extent() -> Extent {
    let (min_x, min_y, max_x, max_y) = bbox::NAIROBI;
    Extent::from_corners(min_x, min_y, max_x, max_y, CrsCode::Epsg4326)
        .expect("fixture extent is valid")
}

/// A grid covering an extent with square cells of the given size, every
/// cell set to `value`.
pub fn uniform_grid(extent: &Extent, cell_size: f64, value: f32) -> RasterGrid {
    let bbox = extent.bbox();
    let nx = (bbox.width() / cell_size).round() as usize;
    let ny = (bbox.height() / cell_size).round() as usize;
    let spec = GridSpec::new(nx, ny, cell_size, cell_size, bbox.min_x, bbox.max_y);
    RasterGrid::filled(spec, extent.crs(), value)
}

/// An axis-aligned square polygon.
pub fn square(min_x: f64, min_y: f64, side: f64) -> Polygon<f64> {
    polygon![
        (x: min_x, y: min_y),
        (x: min_x + side, y: min_y),
        (x: min_x + side, y: min_y + side),
        (x: min_x, y: min_y + side),
    ]
}

/// A collection of square zones laid out west to east with a gap between
/// them, starting at (origin_x, origin_y).
pub fn square_zones(
    crs: CrsCode,
    origin_x: f64,
    origin_y: f64,
    side: f64,
    gap: f64,
    count: usize,
) -> ZoneCollection {
    let zones = (0..count)
        .map(|i| {
            Zone::new(
                format!("zone-{}", i + 1),
                square(origin_x + i as f64 * (side + gap), origin_y, side),
            )
        })
        .collect();

    ZoneCollection::new(crs, zones).expect("fixture zones are valid")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_uniform_grid_covers_extent() {
        let extent = utm_extent(100.0, 50.0);
        let grid = uniform_grid(&extent, 10.0, 1.0);

        assert_eq!(grid.spec().nx, 10);
        assert_eq!(grid.spec().ny, 5);
        assert_eq!(grid.bbox(), *extent.bbox());
        assert_eq!(grid.populated_cells(), 50);
    }

    #[test]
    fn test_square_zones_fixture() {
        let zones = square_zones(utm31(), 500_000.0, 100_000.0, 30.0, 10.0, 3);
        assert_eq!(zones.len(), 3);
        assert_eq!(zones.zones()[0].id, "zone-1");

        let bounds = zones.bounds().unwrap();
        assert_eq!(bounds.bbox().min_x, 500_000.0);
        assert_eq!(bounds.bbox().max_x, 500_110.0);
    }
}
