//! Universal Transverse Mercator projection.
//!
//! Forward and inverse transverse Mercator on the WGS84 ellipsoid, using
//! the classic USGS series expansion. Accuracy is well under a meter inside
//! a zone, which is the tolerance the extent round-trip contract allows.
//!
//! Zones are 6 degrees wide, numbered 1..=60 from 180W; the scale factor on
//! the central meridian is 0.9996, with the standard 500km false easting
//! and 10000km false northing in the southern hemisphere.

use std::f64::consts::PI;

use layers_common::{CrsCode, LayersError, LayersResult};

/// WGS84 semi-major axis (meters)
const WGS84_A: f64 = 6378137.0;
/// WGS84 flattening
const WGS84_F: f64 = 1.0 / 298.257223563;
/// Central meridian scale factor
const K0: f64 = 0.9996;
/// False easting applied in every zone (meters)
const FALSE_EASTING: f64 = 500000.0;
/// False northing applied in the southern hemisphere (meters)
const FALSE_NORTHING_SOUTH: f64 = 10000000.0;

/// First eccentricity squared
fn e2() -> f64 {
    WGS84_F * (2.0 - WGS84_F)
}

/// Second eccentricity squared
fn ep2() -> f64 {
    let e2 = e2();
    e2 / (1.0 - e2)
}

/// Central meridian of a UTM zone, in degrees.
pub fn central_meridian(zone: u8) -> f64 {
    (zone as f64 - 1.0) * 6.0 - 180.0 + 3.0
}

/// Meridional arc length from the equator to a latitude (radians).
fn meridional_arc(lat: f64) -> f64 {
    let e2 = e2();
    let e4 = e2 * e2;
    let e6 = e4 * e2;

    WGS84_A
        * ((1.0 - e2 / 4.0 - 3.0 * e4 / 64.0 - 5.0 * e6 / 256.0) * lat
            - (3.0 * e2 / 8.0 + 3.0 * e4 / 32.0 + 45.0 * e6 / 1024.0) * (2.0 * lat).sin()
            + (15.0 * e4 / 256.0 + 45.0 * e6 / 1024.0) * (4.0 * lat).sin()
            - (35.0 * e6 / 3072.0) * (6.0 * lat).sin())
}

/// A single UTM zone/hemisphere projection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UtmProjection {
    zone: u8,
    north: bool,
}

impl UtmProjection {
    /// Create a projection for a zone and hemisphere.
    pub fn new(zone: u8, north: bool) -> LayersResult<Self> {
        if !(1..=60).contains(&zone) {
            return Err(LayersError::InvalidCrs(format!(
                "UTM zone out of range: {}",
                zone
            )));
        }
        Ok(Self { zone, north })
    }

    /// The projection covering a geographic point.
    pub fn for_point(lon: f64, lat: f64) -> Self {
        match CrsCode::utm_for(lon, lat) {
            CrsCode::Utm { zone, north } => Self { zone, north },
            CrsCode::Epsg4326 => unreachable!("utm_for always returns a UTM code"),
        }
    }

    /// Create a projection from a projected CRS code.
    pub fn from_crs(crs: CrsCode) -> LayersResult<Self> {
        match crs {
            CrsCode::Utm { zone, north } => Self::new(zone, north),
            CrsCode::Epsg4326 => Err(LayersError::InvalidCrs(
                "expected a projected (UTM) CRS, got EPSG:4326".to_string(),
            )),
        }
    }

    pub fn crs(&self) -> CrsCode {
        CrsCode::Utm {
            zone: self.zone,
            north: self.north,
        }
    }

    pub fn zone(&self) -> u8 {
        self.zone
    }

    pub fn is_north(&self) -> bool {
        self.north
    }

    /// Convert geographic coordinates (lat/lon in degrees) to UTM
    /// (easting, northing) in meters.
    pub fn geo_to_utm(&self, lat_deg: f64, lon_deg: f64) -> (f64, f64) {
        let lat = lat_deg.to_radians();
        let lon0 = central_meridian(self.zone).to_radians();

        // Normalize longitude difference to [-π, π]
        let mut dlon = lon_deg.to_radians() - lon0;
        while dlon > PI {
            dlon -= 2.0 * PI;
        }
        while dlon < -PI {
            dlon += 2.0 * PI;
        }

        let ep2 = ep2();
        let sin_lat = lat.sin();
        let cos_lat = lat.cos();

        let n = WGS84_A / (1.0 - e2() * sin_lat * sin_lat).sqrt();
        let t = lat.tan().powi(2);
        let c = ep2 * cos_lat * cos_lat;
        let a = dlon * cos_lat;

        let a2 = a * a;
        let a3 = a2 * a;
        let a4 = a3 * a;
        let a5 = a4 * a;
        let a6 = a5 * a;

        let m = meridional_arc(lat);

        let easting = K0
            * n
            * (a + (1.0 - t + c) * a3 / 6.0
                + (5.0 - 18.0 * t + t * t + 72.0 * c - 58.0 * ep2) * a5 / 120.0)
            + FALSE_EASTING;

        let mut northing = K0
            * (m + n
                * lat.tan()
                * (a2 / 2.0
                    + (5.0 - t + 9.0 * c + 4.0 * c * c) * a4 / 24.0
                    + (61.0 - 58.0 * t + t * t + 600.0 * c - 330.0 * ep2) * a6 / 720.0));

        if !self.north {
            northing += FALSE_NORTHING_SOUTH;
        }

        (easting, northing)
    }

    /// Convert UTM (easting, northing) in meters to geographic coordinates
    /// (lat/lon in degrees).
    pub fn utm_to_geo(&self, easting: f64, northing: f64) -> (f64, f64) {
        let e2 = e2();
        let ep2 = ep2();

        let x = easting - FALSE_EASTING;
        let y = if self.north {
            northing
        } else {
            northing - FALSE_NORTHING_SOUTH
        };

        // Footprint latitude from the meridional arc
        let m = y / K0;
        let mu = m
            / (WGS84_A
                * (1.0 - e2 / 4.0 - 3.0 * e2 * e2 / 64.0 - 5.0 * e2 * e2 * e2 / 256.0));

        let e1 = (1.0 - (1.0 - e2).sqrt()) / (1.0 + (1.0 - e2).sqrt());
        let e1_2 = e1 * e1;
        let e1_3 = e1_2 * e1;
        let e1_4 = e1_3 * e1;

        let phi1 = mu
            + (3.0 * e1 / 2.0 - 27.0 * e1_3 / 32.0) * (2.0 * mu).sin()
            + (21.0 * e1_2 / 16.0 - 55.0 * e1_4 / 32.0) * (4.0 * mu).sin()
            + (151.0 * e1_3 / 96.0) * (6.0 * mu).sin()
            + (1097.0 * e1_4 / 512.0) * (8.0 * mu).sin();

        let sin_phi1 = phi1.sin();
        let cos_phi1 = phi1.cos();
        let tan_phi1 = phi1.tan();

        let c1 = ep2 * cos_phi1 * cos_phi1;
        let t1 = tan_phi1 * tan_phi1;
        let n1 = WGS84_A / (1.0 - e2 * sin_phi1 * sin_phi1).sqrt();
        let r1 = WGS84_A * (1.0 - e2) / (1.0 - e2 * sin_phi1 * sin_phi1).powf(1.5);
        let d = x / (n1 * K0);

        let d2 = d * d;
        let d3 = d2 * d;
        let d4 = d3 * d;
        let d5 = d4 * d;
        let d6 = d5 * d;

        let lat = phi1
            - (n1 * tan_phi1 / r1)
                * (d2 / 2.0
                    - (5.0 + 3.0 * t1 + 10.0 * c1 - 4.0 * c1 * c1 - 9.0 * ep2) * d4 / 24.0
                    + (61.0 + 90.0 * t1 + 298.0 * c1 + 45.0 * t1 * t1
                        - 252.0 * ep2
                        - 3.0 * c1 * c1)
                        * d6
                        / 720.0);

        let lon = central_meridian(self.zone).to_radians()
            + (d - (1.0 + 2.0 * t1 + c1) * d3 / 6.0
                + (5.0 - 2.0 * c1 + 28.0 * t1 - 3.0 * c1 * c1 + 8.0 * ep2 + 24.0 * t1 * t1)
                    * d5
                    / 120.0)
                / cos_phi1;

        (lat.to_degrees(), lon.to_degrees())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_central_meridian() {
        assert_eq!(central_meridian(1), -177.0);
        assert_eq!(central_meridian(18), -75.0);
        assert_eq!(central_meridian(31), 3.0);
        assert_eq!(central_meridian(60), 177.0);
    }

    #[test]
    fn test_central_meridian_maps_to_false_easting() {
        let proj = UtmProjection::new(18, true).unwrap();
        let (easting, _) = proj.geo_to_utm(40.0, -75.0);
        assert!(
            (easting - FALSE_EASTING).abs() < 0.001,
            "easting on the central meridian should be 500000, got {}",
            easting
        );
    }

    #[test]
    fn test_equator_northing() {
        let proj = UtmProjection::new(31, true).unwrap();
        let (_, northing) = proj.geo_to_utm(0.0, 3.0);
        assert!(northing.abs() < 0.001, "equator northing should be 0, got {}", northing);

        // Southern hemisphere carries the false northing
        let south = UtmProjection::new(31, false).unwrap();
        let (_, northing_south) = south.geo_to_utm(0.0, 3.0);
        assert!((northing_south - FALSE_NORTHING_SOUTH).abs() < 0.001);
    }

    #[test]
    fn test_midlatitude_northing_scale() {
        // 45N is roughly 4983km of meridional arc from the equator
        let proj = UtmProjection::new(18, true).unwrap();
        let (_, northing) = proj.geo_to_utm(45.0, -75.0);
        assert!(
            northing > 4_960_000.0 && northing < 5_000_000.0,
            "northing at 45N should be ~4.98e6, got {}",
            northing
        );
    }

    #[test]
    fn test_roundtrip() {
        let cases = [
            (40.7128, -74.0060, 18, true),  // New York
            (-1.2921, 36.8219, 37, false),  // Nairobi
            (52.3676, 4.9041, 31, true),    // Amsterdam
            (-33.4489, -70.6693, 19, false), // Santiago
        ];

        for (lat, lon, zone, north) in cases {
            let proj = UtmProjection::new(zone, north).unwrap();
            let (easting, northing) = proj.geo_to_utm(lat, lon);
            let (lat2, lon2) = proj.utm_to_geo(easting, northing);

            assert!(
                (lat - lat2).abs() < 1e-7,
                "lat roundtrip failed: {} vs {}",
                lat,
                lat2
            );
            assert!(
                (lon - lon2).abs() < 1e-7,
                "lon roundtrip failed: {} vs {}",
                lon,
                lon2
            );
        }
    }

    #[test]
    fn test_for_point_matches_crs() {
        let proj = UtmProjection::for_point(36.8219, -1.2921);
        assert_eq!(proj.zone(), 37);
        assert!(!proj.is_north());
        assert_eq!(
            proj.crs(),
            CrsCode::Utm {
                zone: 37,
                north: false
            }
        );
    }

    #[test]
    fn test_zone_range_check() {
        assert!(UtmProjection::new(0, true).is_err());
        assert!(UtmProjection::new(61, true).is_err());
        assert!(UtmProjection::new(60, false).is_ok());
    }

    #[test]
    fn test_east_of_meridian_increases_easting() {
        let proj = UtmProjection::new(18, true).unwrap();
        let (west, _) = proj.geo_to_utm(40.0, -76.0);
        let (center, _) = proj.geo_to_utm(40.0, -75.0);
        let (east, _) = proj.geo_to_utm(40.0, -74.0);
        assert!(west < center && center < east);
    }
}
