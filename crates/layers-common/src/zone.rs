//! Zone collections: the polygon reporting units statistics aggregate over.

use geo::BoundingRect;
use geo_types::Polygon;
use std::collections::HashSet;

use crate::bbox::BoundingBox;
use crate::crs::CrsCode;
use crate::error::{LayersError, LayersResult};
use crate::extent::Extent;

/// One reporting unit: a polygon with a stable identifier.
///
/// The identifier aligns aggregate results back to input order.
#[derive(Debug, Clone, PartialEq)]
pub struct Zone {
    pub id: String,
    pub polygon: Polygon<f64>,
}

impl Zone {
    pub fn new(id: impl Into<String>, polygon: Polygon<f64>) -> Self {
        Self {
            id: id.into(),
            polygon,
        }
    }

    /// Bounding box of the zone geometry, if it is non-empty.
    pub fn bbox(&self) -> Option<BoundingBox> {
        self.polygon.bounding_rect().map(|r| {
            BoundingBox::new(r.min().x, r.min().y, r.max().x, r.max().y)
        })
    }
}

/// An ordered collection of zones with a shared CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneCollection {
    crs: CrsCode,
    zones: Vec<Zone>,
}

impl ZoneCollection {
    /// Create a collection, enforcing the id invariants.
    pub fn new(crs: CrsCode, zones: Vec<Zone>) -> LayersResult<Self> {
        if zones.is_empty() {
            return Err(LayersError::InvalidZones("empty zone collection".to_string()));
        }

        let mut seen = HashSet::new();
        for zone in &zones {
            if zone.id.is_empty() {
                return Err(LayersError::InvalidZones("zone with empty id".to_string()));
            }
            if !seen.insert(zone.id.as_str()) {
                return Err(LayersError::InvalidZones(format!(
                    "duplicate zone id: {}",
                    zone.id
                )));
            }
        }

        Ok(Self { crs, zones })
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn zones(&self) -> &[Zone] {
        &self.zones
    }

    pub fn len(&self) -> usize {
        self.zones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.zones.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Zone> {
        self.zones.iter()
    }

    /// The union bounds of every zone geometry, as an extent.
    pub fn bounds(&self) -> LayersResult<Extent> {
        let mut union: Option<BoundingBox> = None;
        for zone in &self.zones {
            if let Some(bbox) = zone.bbox() {
                union = Some(match union {
                    Some(u) => u.union(&bbox),
                    None => bbox,
                });
            }
        }

        let bbox = union.ok_or_else(|| {
            LayersError::InvalidZones("no zone has a non-empty geometry".to_string())
        })?;

        Extent::new(bbox, self.crs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn square(min_x: f64, min_y: f64, side: f64) -> Polygon<f64> {
        polygon![
            (x: min_x, y: min_y),
            (x: min_x + side, y: min_y),
            (x: min_x + side, y: min_y + side),
            (x: min_x, y: min_y + side),
        ]
    }

    #[test]
    fn test_id_invariants() {
        assert!(ZoneCollection::new(CrsCode::Epsg4326, vec![]).is_err());

        let dup = ZoneCollection::new(
            CrsCode::Epsg4326,
            vec![
                Zone::new("a", square(0.0, 0.0, 1.0)),
                Zone::new("a", square(2.0, 0.0, 1.0)),
            ],
        );
        assert!(dup.is_err());

        let blank = ZoneCollection::new(
            CrsCode::Epsg4326,
            vec![Zone::new("", square(0.0, 0.0, 1.0))],
        );
        assert!(blank.is_err());
    }

    #[test]
    fn test_union_bounds() {
        let zones = ZoneCollection::new(
            CrsCode::Epsg4326,
            vec![
                Zone::new("a", square(0.0, 0.0, 1.0)),
                Zone::new("b", square(3.0, -2.0, 1.0)),
            ],
        )
        .unwrap();

        let bounds = zones.bounds().unwrap();
        assert_eq!(bounds.bbox().min_x, 0.0);
        assert_eq!(bounds.bbox().min_y, -2.0);
        assert_eq!(bounds.bbox().max_x, 4.0);
        assert_eq!(bounds.bbox().max_y, 1.0);
        assert_eq!(bounds.crs(), CrsCode::Epsg4326);
    }

    #[test]
    fn test_order_preserved() {
        let zones = ZoneCollection::new(
            CrsCode::Epsg4326,
            vec![
                Zone::new("z3", square(0.0, 0.0, 1.0)),
                Zone::new("z1", square(2.0, 0.0, 1.0)),
                Zone::new("z2", square(4.0, 0.0, 1.0)),
            ],
        )
        .unwrap();

        let ids: Vec<&str> = zones.iter().map(|z| z.id.as_str()).collect();
        assert_eq!(ids, vec!["z3", "z1", "z2"]);
    }
}
