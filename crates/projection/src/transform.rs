//! Extent-level reprojection between geographic and UTM representations.

use layers_common::{BoundingBox, CrsCode, Extent, LayersResult};

use crate::utm::UtmProjection;

/// Reprojection operations on extents.
///
/// Converting geographic to UTM picks the zone from the extent's centroid,
/// projects the four corners, and takes the enclosing box; converting back
/// is symmetric. A round-trip is allowed a small bounded drift from
/// projection rounding; it is accepted, not corrected.
pub trait ReprojectExt: Sized {
    /// An equivalent extent in projected (UTM, meters) coordinates.
    fn as_utm(&self) -> LayersResult<Self>;

    /// An equivalent extent in geographic (WGS84, degrees) coordinates.
    fn as_geographic(&self) -> LayersResult<Self>;

    /// Expand all sides by a distance in meters.
    ///
    /// Projected extents buffer in place; geographic extents round-trip
    /// through UTM so the distance is metric.
    fn buffered(&self, distance: f64) -> LayersResult<Self>;
}

fn corners(bbox: &BoundingBox) -> [(f64, f64); 4] {
    [
        (bbox.min_x, bbox.min_y),
        (bbox.max_x, bbox.min_y),
        (bbox.max_x, bbox.max_y),
        (bbox.min_x, bbox.max_y),
    ]
}

fn enclosing(points: impl IntoIterator<Item = (f64, f64)>) -> BoundingBox {
    let mut min_x = f64::MAX;
    let mut min_y = f64::MAX;
    let mut max_x = f64::MIN;
    let mut max_y = f64::MIN;

    for (x, y) in points {
        min_x = min_x.min(x);
        min_y = min_y.min(y);
        max_x = max_x.max(x);
        max_y = max_y.max(y);
    }

    BoundingBox::new(min_x, min_y, max_x, max_y)
}

impl ReprojectExt for Extent {
    fn as_utm(&self) -> LayersResult<Extent> {
        match self.crs() {
            CrsCode::Utm { .. } => Ok(*self),
            CrsCode::Epsg4326 => {
                let utm_crs = self.utm_crs();
                let proj = UtmProjection::from_crs(utm_crs)?;

                let projected = corners(self.bbox())
                    .map(|(lon, lat)| proj.geo_to_utm(lat, lon));

                Extent::new(enclosing(projected), utm_crs)
            }
        }
    }

    fn as_geographic(&self) -> LayersResult<Extent> {
        match self.crs() {
            CrsCode::Epsg4326 => Ok(*self),
            utm @ CrsCode::Utm { .. } => {
                let proj = UtmProjection::from_crs(utm)?;

                let inverted = corners(self.bbox())
                    .map(|(easting, northing)| {
                        let (lat, lon) = proj.utm_to_geo(easting, northing);
                        (lon, lat)
                    });

                Extent::new(enclosing(inverted), CrsCode::Epsg4326)
            }
        }
    }

    fn buffered(&self, distance: f64) -> LayersResult<Extent> {
        match self.crs() {
            CrsCode::Utm { .. } => self.buffer(distance),
            CrsCode::Epsg4326 => self.as_utm()?.buffer(distance)?.as_geographic(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUNDTRIP_TOLERANCE_DEG: f64 = 1e-6;

    fn nairobi_extent() -> Extent {
        Extent::from_corners(36.70, -1.44, 36.95, -1.16, CrsCode::Epsg4326).unwrap()
    }

    #[test]
    fn test_as_utm_picks_centroid_zone() {
        let utm = nairobi_extent().as_utm().unwrap();
        assert_eq!(
            utm.crs(),
            CrsCode::Utm {
                zone: 37,
                north: false
            }
        );
        // A quarter-degree box near the equator is roughly 28km wide
        assert!(utm.bbox().width() > 25_000.0 && utm.bbox().width() < 31_000.0);
    }

    #[test]
    fn test_roundtrip_bounds_drift_bounded() {
        let original = nairobi_extent();
        let roundtrip = original.as_utm().unwrap().as_geographic().unwrap();

        let a = original.bbox();
        let b = roundtrip.bbox();
        assert!((a.min_x - b.min_x).abs() < ROUNDTRIP_TOLERANCE_DEG);
        assert!((a.min_y - b.min_y).abs() < ROUNDTRIP_TOLERANCE_DEG);
        assert!((a.max_x - b.max_x).abs() < ROUNDTRIP_TOLERANCE_DEG);
        assert!((a.max_y - b.max_y).abs() < ROUNDTRIP_TOLERANCE_DEG);
    }

    #[test]
    fn test_as_utm_is_identity_for_projected() {
        let utm_crs = CrsCode::Utm {
            zone: 18,
            north: true,
        };
        let extent =
            Extent::from_corners(560_000.0, 4_500_000.0, 590_000.0, 4_520_000.0, utm_crs).unwrap();
        assert_eq!(extent.as_utm().unwrap(), extent);
    }

    #[test]
    fn test_buffered_geographic_roundtrips_through_utm() {
        let original = nairobi_extent();
        let buffered = original.buffered(1000.0).unwrap();

        assert!(buffered.crs().is_geographic());
        assert!(buffered.bbox().min_x < original.bbox().min_x);
        assert!(buffered.bbox().max_y > original.bbox().max_y);

        // 1km near the equator is just under 0.01 degrees
        let growth = original.bbox().min_x - buffered.bbox().min_x;
        assert!(growth > 0.007 && growth < 0.012, "growth was {}", growth);
    }

    #[test]
    fn test_buffered_projected_is_native() {
        let utm_crs = CrsCode::Utm {
            zone: 18,
            north: true,
        };
        let extent =
            Extent::from_corners(560_000.0, 4_500_000.0, 590_000.0, 4_520_000.0, utm_crs).unwrap();
        let buffered = extent.buffered(500.0).unwrap();

        assert_eq!(buffered.bbox().min_x, 559_500.0);
        assert_eq!(buffered.bbox().max_y, 4_520_500.0);
    }
}
