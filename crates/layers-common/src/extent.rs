//! Areas of interest: a bounding box tied to a CRS.

use geo_types::{polygon, Polygon};
use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::crs::CrsCode;
use crate::error::{LayersError, LayersResult};

/// Margin added on all sides of a remote data request, in native units.
///
/// Adjacent tiles requested independently share edge pixels because of this
/// over-fetch, so clipping each result back to its exact bounds leaves no
/// seam of missing data between them.
pub const REQUEST_MARGIN: f64 = 10.0;

/// An axis-aligned area of interest with its coordinate reference system.
///
/// Extents are immutable after construction; buffered or reprojected
/// variants are new instances.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Extent {
    bbox: BoundingBox,
    crs: CrsCode,
}

impl Extent {
    /// Create an extent, validating the box.
    ///
    /// Degenerate (zero-width or zero-height) boxes are a configuration
    /// error, as are inverted bounds.
    pub fn new(bbox: BoundingBox, crs: CrsCode) -> LayersResult<Self> {
        if !bbox.min_x.is_finite()
            || !bbox.min_y.is_finite()
            || !bbox.max_x.is_finite()
            || !bbox.max_y.is_finite()
        {
            return Err(LayersError::InvalidExtent(format!(
                "non-finite bounds: {}",
                bbox.cache_key()
            )));
        }
        if bbox.min_x >= bbox.max_x || bbox.min_y >= bbox.max_y {
            return Err(LayersError::InvalidExtent(format!(
                "degenerate bounds: {}",
                bbox.cache_key()
            )));
        }

        Ok(Self { bbox, crs })
    }

    /// Create an extent from corner coordinates.
    pub fn from_corners(
        min_x: f64,
        min_y: f64,
        max_x: f64,
        max_y: f64,
        crs: CrsCode,
    ) -> LayersResult<Self> {
        Self::new(BoundingBox::new(min_x, min_y, max_x, max_y), crs)
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    /// Center point (x, y) in native units.
    pub fn centroid(&self) -> (f64, f64) {
        self.bbox.centroid()
    }

    /// The UTM CRS this extent projects into, derived from its centroid.
    ///
    /// For an already-projected extent this is its own CRS.
    pub fn utm_crs(&self) -> CrsCode {
        match self.crs {
            CrsCode::Epsg4326 => {
                let (lon, lat) = self.centroid();
                CrsCode::utm_for(lon, lat)
            }
            utm => utm,
        }
    }

    /// The extent's boundary as a closed polygon.
    pub fn polygon(&self) -> Polygon<f64> {
        polygon![
            (x: self.bbox.min_x, y: self.bbox.min_y),
            (x: self.bbox.max_x, y: self.bbox.min_y),
            (x: self.bbox.max_x, y: self.bbox.max_y),
            (x: self.bbox.min_x, y: self.bbox.max_y),
        ]
    }

    /// Expand all four sides by a fixed distance in native units.
    ///
    /// Only meaningful for projected extents; buffering a geographic extent
    /// goes through the UTM round-trip in the projection crate.
    pub fn buffer(&self, distance: f64) -> LayersResult<Self> {
        if self.crs.is_geographic() {
            return Err(LayersError::InvalidExtent(
                "native-unit buffer on a geographic extent; reproject to UTM first".to_string(),
            ));
        }

        Self::new(self.bbox.expand(distance), self.crs)
    }

    /// The region passed to a remote data service for this extent.
    ///
    /// Coordinates are floored to whole units, then expanded by
    /// [`REQUEST_MARGIN`] on all sides.
    pub fn request_bounds(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.bbox.min_x.floor(),
            min_y: self.bbox.min_y.floor(),
            max_x: self.bbox.max_x.floor(),
            max_y: self.bbox.max_y.floor(),
        }
        .expand(REQUEST_MARGIN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_degenerate_extent_rejected() {
        let zero_width = Extent::from_corners(5.0, 0.0, 5.0, 10.0, CrsCode::Epsg4326);
        assert!(matches!(zero_width, Err(LayersError::InvalidExtent(_))));

        let inverted = Extent::from_corners(10.0, 0.0, 5.0, 10.0, CrsCode::Epsg4326);
        assert!(inverted.is_err());

        let nan = Extent::from_corners(f64::NAN, 0.0, 5.0, 10.0, CrsCode::Epsg4326);
        assert!(nan.is_err());
    }

    #[test]
    fn test_utm_crs_from_centroid() {
        // Box around Nairobi (36.7..36.9E, 1.4..1.2S): centroid is south
        let extent = Extent::from_corners(36.7, -1.4, 36.9, -1.2, CrsCode::Epsg4326).unwrap();
        assert_eq!(
            extent.utm_crs(),
            CrsCode::Utm {
                zone: 37,
                north: false
            }
        );

        // Projected extents keep their own CRS
        let utm = CrsCode::Utm {
            zone: 31,
            north: true,
        };
        let projected = Extent::from_corners(0.0, 0.0, 100.0, 100.0, utm).unwrap();
        assert_eq!(projected.utm_crs(), utm);
    }

    #[test]
    fn test_geographic_buffer_rejected() {
        let extent = Extent::from_corners(0.0, 0.0, 1.0, 1.0, CrsCode::Epsg4326).unwrap();
        assert!(extent.buffer(100.0).is_err());

        let utm = Extent::from_corners(
            500000.0,
            4000000.0,
            501000.0,
            4001000.0,
            CrsCode::Utm {
                zone: 18,
                north: true,
            },
        )
        .unwrap();
        let buffered = utm.buffer(250.0).unwrap();
        assert_eq!(buffered.bbox().min_x, 499750.0);
        assert_eq!(buffered.bbox().max_y, 4001250.0);
    }

    #[test]
    fn test_request_bounds_floor_and_margin() {
        let utm = Extent::from_corners(
            500000.7,
            4000000.3,
            501000.9,
            4001000.1,
            CrsCode::Utm {
                zone: 18,
                north: true,
            },
        )
        .unwrap();

        let request = utm.request_bounds();
        assert_eq!(request.min_x, 500000.0 - REQUEST_MARGIN);
        assert_eq!(request.min_y, 4000000.0 - REQUEST_MARGIN);
        assert_eq!(request.max_x, 501000.0 + REQUEST_MARGIN);
        assert_eq!(request.max_y, 4001000.0 + REQUEST_MARGIN);
    }
}
