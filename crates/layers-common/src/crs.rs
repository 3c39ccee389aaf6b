//! Coordinate Reference System types and utilities.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{LayersError, LayersResult};

/// CRS codes recognized by the layer engine.
///
/// Two projection kinds exist: geographic (WGS84, degrees) and projected
/// (UTM, meters, EPSG 326xx north / 327xx south).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CrsCode {
    /// WGS84 Geographic (lat/lon in degrees)
    Epsg4326,
    /// Universal Transverse Mercator (meters)
    Utm { zone: u8, north: bool },
}

impl CrsCode {
    /// Parse an EPSG code string.
    ///
    /// Accepts "EPSG:4326" and UTM codes "EPSG:326xx"/"EPSG:327xx"
    /// (case-insensitive).
    pub fn from_epsg_string(s: &str) -> LayersResult<Self> {
        let normalized = s.to_uppercase();
        let code: u32 = normalized
            .strip_prefix("EPSG:")
            .and_then(|c| c.parse().ok())
            .ok_or_else(|| LayersError::InvalidCrs(s.to_string()))?;

        Self::from_epsg(code).ok_or_else(|| LayersError::InvalidCrs(s.to_string()))
    }

    /// Interpret a numeric EPSG code.
    pub fn from_epsg(code: u32) -> Option<Self> {
        match code {
            4326 => Some(CrsCode::Epsg4326),
            32601..=32660 => Some(CrsCode::Utm {
                zone: (code - 32600) as u8,
                north: true,
            }),
            32701..=32760 => Some(CrsCode::Utm {
                zone: (code - 32700) as u8,
                north: false,
            }),
            _ => None,
        }
    }

    /// The numeric EPSG code.
    pub fn epsg(&self) -> u32 {
        match self {
            CrsCode::Epsg4326 => 4326,
            CrsCode::Utm { zone, north: true } => 32600 + *zone as u32,
            CrsCode::Utm { zone, north: false } => 32700 + *zone as u32,
        }
    }

    /// Check if this is a geographic (lat/lon) CRS.
    pub fn is_geographic(&self) -> bool {
        matches!(self, CrsCode::Epsg4326)
    }

    /// Check if this is a projected (meter-based) CRS.
    pub fn is_projected(&self) -> bool {
        !self.is_geographic()
    }

    /// The UTM CRS containing a geographic point.
    ///
    /// The zone is derived from the longitude (6-degree bands, zone 1 at
    /// 180W), the hemisphere from the latitude.
    pub fn utm_for(lon: f64, lat: f64) -> Self {
        let zone = (((lon + 180.0) / 6.0).floor() as i32 + 1).clamp(1, 60) as u8;
        CrsCode::Utm {
            zone,
            north: lat >= 0.0,
        }
    }
}

impl fmt::Display for CrsCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EPSG:{}", self.epsg())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_crs() {
        assert_eq!(
            CrsCode::from_epsg_string("EPSG:4326").unwrap(),
            CrsCode::Epsg4326
        );
        assert_eq!(
            CrsCode::from_epsg_string("epsg:32633").unwrap(),
            CrsCode::Utm {
                zone: 33,
                north: true
            }
        );
        assert_eq!(
            CrsCode::from_epsg_string("EPSG:32718").unwrap(),
            CrsCode::Utm {
                zone: 18,
                north: false
            }
        );
        assert!(CrsCode::from_epsg_string("EPSG:3857").is_err());
        assert!(CrsCode::from_epsg_string("32633").is_err());
    }

    #[test]
    fn test_epsg_roundtrip() {
        for code in [4326u32, 32601, 32660, 32701, 32760] {
            let crs = CrsCode::from_epsg(code).unwrap();
            assert_eq!(crs.epsg(), code);
        }
        assert!(CrsCode::from_epsg(32661).is_none());
        assert!(CrsCode::from_epsg(32700).is_none());
    }

    #[test]
    fn test_utm_for() {
        // Nairobi: 36.82E, 1.29S -> zone 37 south
        assert_eq!(
            CrsCode::utm_for(36.82, -1.29),
            CrsCode::Utm {
                zone: 37,
                north: false
            }
        );
        // Amsterdam: 4.9E, 52.37N -> zone 31 north
        assert_eq!(
            CrsCode::utm_for(4.9, 52.37),
            CrsCode::Utm {
                zone: 31,
                north: true
            }
        );
        // Antimeridian edges clamp into the valid range
        assert_eq!(
            CrsCode::utm_for(180.0, 0.0),
            CrsCode::Utm {
                zone: 60,
                north: true
            }
        );
        assert_eq!(
            CrsCode::utm_for(-180.0, 0.0),
            CrsCode::Utm {
                zone: 1,
                north: true
            }
        );
    }

    #[test]
    fn test_display() {
        assert_eq!(CrsCode::Epsg4326.to_string(), "EPSG:4326");
        assert_eq!(
            CrsCode::Utm {
                zone: 37,
                north: false
            }
            .to_string(),
            "EPSG:32737"
        );
    }
}
