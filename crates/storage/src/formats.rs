//! Format adapters for the three artifact kinds.
//!
//! - binary grid (`.grid`): magic, JSON header (grid spec, optional CRS),
//!   raw f32 payload
//! - feature table (`.geojson`): GeoJSON FeatureCollection
//! - row table (`.csv`): headered CSV
//!
//! Each adapter re-attaches geospatial referencing on read when the
//! serialized artifact does not embed it.

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use layers_common::{
    CrsCode, FeatureRecord, FeatureTable, GridSpec, LayersError, LayersResult, RasterGrid,
    RowTable,
};

/// Magic bytes identifying a grid artifact.
const GRID_MAGIC: &[u8; 4] = b"ULG1";

#[derive(Debug, Serialize, Deserialize)]
struct GridHeader {
    spec: GridSpec,
    crs: Option<CrsCode>,
}

/// Serialize a raster grid.
pub fn encode_grid(grid: &RasterGrid) -> LayersResult<Bytes> {
    let header = GridHeader {
        spec: *grid.spec(),
        crs: Some(grid.crs()),
    };
    let header_json = serde_json::to_vec(&header)?;

    let mut out = Vec::with_capacity(8 + header_json.len() + grid.values().len() * 4);
    out.extend_from_slice(GRID_MAGIC);
    out.extend_from_slice(&(header_json.len() as u32).to_le_bytes());
    out.extend_from_slice(&header_json);
    out.extend_from_slice(bytemuck::cast_slice(grid.values()));

    Ok(Bytes::from(out))
}

/// Deserialize a raster grid, re-attaching `fallback_crs` when the header
/// does not embed one.
pub fn decode_grid(data: &[u8], fallback_crs: Option<CrsCode>) -> LayersResult<RasterGrid> {
    if data.len() < 8 || &data[0..4] != GRID_MAGIC {
        return Err(LayersError::DataReadError(
            "not a grid artifact: bad magic".to_string(),
        ));
    }

    let header_len = u32::from_le_bytes([data[4], data[5], data[6], data[7]]) as usize;
    if data.len() < 8 + header_len {
        return Err(LayersError::DataReadError(
            "grid artifact truncated in header".to_string(),
        ));
    }

    let header: GridHeader = serde_json::from_slice(&data[8..8 + header_len])
        .map_err(|e| LayersError::DataReadError(format!("bad grid header: {}", e)))?;

    let crs = header.crs.or(fallback_crs).ok_or_else(|| {
        LayersError::DataReadError(
            "grid artifact has no embedded CRS and none was supplied".to_string(),
        )
    })?;

    let payload = &data[8 + header_len..];
    let expected = header.spec.len() * 4;
    if payload.len() != expected {
        return Err(LayersError::DataReadError(format!(
            "grid payload is {} bytes, expected {}",
            payload.len(),
            expected
        )));
    }

    let values: Vec<f32> = bytemuck::pod_collect_to_vec(payload);
    RasterGrid::new(header.spec, crs, values)
}

/// Serialize a feature table as a GeoJSON FeatureCollection.
pub fn encode_features(table: &FeatureTable) -> LayersResult<Bytes> {
    let features = table
        .features
        .iter()
        .map(|record| geojson::Feature {
            bbox: None,
            geometry: Some(geojson::Geometry::new(geojson::Value::from(
                &record.geometry,
            ))),
            id: Some(geojson::feature::Id::String(record.id.clone())),
            properties: Some(record.properties.clone().into_iter().collect()),
            foreign_members: None,
        })
        .collect();

    let collection = geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    };

    let json = serde_json::to_vec(&geojson::GeoJson::FeatureCollection(collection))?;
    Ok(Bytes::from(json))
}

/// Deserialize a feature table.
///
/// GeoJSON does not carry a CRS (coordinates are WGS84 by definition), so
/// the caller supplies the one to attach; pass `None` for WGS84.
pub fn decode_features(data: &[u8], crs: Option<CrsCode>) -> LayersResult<FeatureTable> {
    let geojson: geojson::GeoJson = serde_json::from_slice(data)
        .map_err(|e| LayersError::DataReadError(format!("bad GeoJSON: {}", e)))?;

    let collection = match geojson {
        geojson::GeoJson::FeatureCollection(fc) => fc,
        _ => {
            return Err(LayersError::DataReadError(
                "expected a GeoJSON FeatureCollection".to_string(),
            ));
        }
    };

    let mut features = Vec::with_capacity(collection.features.len());
    for feature in collection.features {
        let id = match feature.id {
            Some(geojson::feature::Id::String(s)) => s,
            Some(geojson::feature::Id::Number(n)) => n.to_string(),
            None => {
                return Err(LayersError::DataReadError(
                    "feature without an id".to_string(),
                ));
            }
        };

        let geometry = feature.geometry.ok_or_else(|| {
            LayersError::DataReadError(format!("feature '{}' has no geometry", id))
        })?;
        let geo_geometry: geo_types::Geometry<f64> = geometry.try_into().map_err(|e| {
            LayersError::DataReadError(format!("feature '{}' has a bad geometry: {}", id, e))
        })?;
        let polygon = match geo_geometry {
            geo_types::Geometry::Polygon(polygon) => polygon,
            _ => {
                return Err(LayersError::DataReadError(format!(
                    "feature '{}' is not a polygon",
                    id
                )));
            }
        };

        let properties: BTreeMap<String, serde_json::Value> = feature
            .properties
            .map(|map| map.into_iter().collect())
            .unwrap_or_default();

        features.push(FeatureRecord {
            id,
            geometry: polygon,
            properties,
        });
    }

    Ok(FeatureTable::new(crs.unwrap_or(CrsCode::Epsg4326), features))
}

/// Serialize a row table as headered CSV.
pub fn encode_table(table: &RowTable) -> LayersResult<Bytes> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(&table.columns)
        .map_err(|e| LayersError::InternalError(format!("CSV write failed: {}", e)))?;
    for row in &table.rows {
        writer
            .write_record(row)
            .map_err(|e| LayersError::InternalError(format!("CSV write failed: {}", e)))?;
    }

    let inner = writer
        .into_inner()
        .map_err(|e| LayersError::InternalError(format!("CSV flush failed: {}", e)))?;
    Ok(Bytes::from(inner))
}

/// Deserialize a row table from headered CSV.
pub fn decode_table(data: &[u8]) -> LayersResult<RowTable> {
    let mut reader = csv::Reader::from_reader(data);

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| LayersError::DataReadError(format!("bad CSV header: {}", e)))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let mut table = RowTable::new(columns);
    for record in reader.records() {
        let record =
            record.map_err(|e| LayersError::DataReadError(format!("bad CSV row: {}", e)))?;
        table.push_row(record.iter().map(|s| s.to_string()).collect())?;
    }

    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo_types::polygon;

    fn sample_grid() -> RasterGrid {
        let spec = GridSpec::new(3, 2, 10.0, 10.0, 100.0, 200.0);
        let values = vec![1.0, 2.0, f32::NAN, 4.0, 5.0, 6.0];
        RasterGrid::new(spec, CrsCode::Epsg4326, values).unwrap()
    }

    #[test]
    fn test_grid_roundtrip_preserves_nodata() {
        let grid = sample_grid();
        let encoded = encode_grid(&grid).unwrap();
        let decoded = decode_grid(&encoded, None).unwrap();

        assert_eq!(decoded.spec(), grid.spec());
        assert_eq!(decoded.crs(), grid.crs());
        for (a, b) in grid.values().iter().zip(decoded.values()) {
            if a.is_nan() {
                assert!(b.is_nan());
            } else {
                assert_eq!(a, b);
            }
        }
    }

    #[test]
    fn test_grid_crs_reattached() {
        let grid = sample_grid();
        let mut encoded = encode_grid(&grid).unwrap().to_vec();

        // Rewrite the header with no CRS, as an older artifact would carry
        let header_len = u32::from_le_bytes(encoded[4..8].try_into().unwrap()) as usize;
        let mut header: serde_json::Value =
            serde_json::from_slice(&encoded[8..8 + header_len]).unwrap();
        header["crs"] = serde_json::Value::Null;
        let new_header = serde_json::to_vec(&header).unwrap();

        let mut stripped = Vec::new();
        stripped.extend_from_slice(&encoded[0..4]);
        stripped.extend_from_slice(&(new_header.len() as u32).to_le_bytes());
        stripped.extend_from_slice(&new_header);
        stripped.extend_from_slice(&encoded[8 + header_len..]);

        assert!(decode_grid(&stripped, None).is_err());

        let utm = CrsCode::Utm {
            zone: 18,
            north: true,
        };
        let decoded = decode_grid(&stripped, Some(utm)).unwrap();
        assert_eq!(decoded.crs(), utm);
    }

    #[test]
    fn test_grid_bad_magic_rejected() {
        assert!(decode_grid(b"nope", None).is_err());
        assert!(decode_grid(b"XXXX\x00\x00\x00\x00", None).is_err());
    }

    #[test]
    fn test_features_roundtrip() {
        let square = polygon![
            (x: 0.0, y: 0.0),
            (x: 1.0, y: 0.0),
            (x: 1.0, y: 1.0),
            (x: 0.0, y: 1.0),
        ];
        let mut properties = BTreeMap::new();
        properties.insert("mean".to_string(), serde_json::json!(4.25));

        let table = FeatureTable::new(
            CrsCode::Epsg4326,
            vec![FeatureRecord {
                id: "zone-1".to_string(),
                geometry: square,
                properties,
            }],
        );

        let encoded = encode_features(&table).unwrap();
        let decoded = decode_features(&encoded, None).unwrap();

        assert_eq!(decoded, table);
    }

    #[test]
    fn test_table_roundtrip() {
        let mut table = RowTable::new(vec!["zone".to_string(), "count".to_string()]);
        table.push_row(vec!["a".to_string(), "12".to_string()]).unwrap();
        table.push_row(vec!["b".to_string(), "0".to_string()]).unwrap();

        let encoded = encode_table(&table).unwrap();
        let decoded = decode_table(&encoded).unwrap();

        assert_eq!(decoded, table);
    }
}
