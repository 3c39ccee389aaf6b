//! The zonal "groupby" engine.

use geo::Contains;
use geo_types::Point;
use std::collections::BTreeMap;
use tracing::debug;

use layers_common::{
    Extent, FeatureRecord, FeatureTable, LayersError, LayersResult, RasterGrid, RowTable, Zone,
    ZoneCollection,
};
use tiling::Fishnet;

use crate::stats::{Aggregate, Statistic};

/// Cell count above which a reduction is split into fishnet tiles whose
/// partial aggregates are merged.
pub const DEFAULT_REDUCE_CAPACITY: usize = 4_000_000;

/// One zonal aggregation request.
pub struct ZonalRequest<'a> {
    /// The produced grid to reduce.
    pub grid: &'a RasterGrid,
    /// Reporting units; must share the grid's CRS.
    pub zones: &'a ZoneCollection,
    pub statistic: Statistic,
    /// Optional categorical raster aligned to the grid; when present the
    /// per-zone result is keyed by its distinct integer values.
    pub group_by: Option<&'a RasterGrid>,
    /// Mask layers combined as a logical AND before reduction.
    pub masks: Vec<&'a RasterGrid>,
}

/// A zone's aggregate: a scalar, or one value per category present.
#[derive(Debug, Clone, PartialEq)]
pub enum ZoneAggregate {
    /// `None` when no populated cell intersects the zone.
    Scalar(Option<f64>),
    /// Empty when no populated cell intersects the zone.
    ByCategory(BTreeMap<i32, f64>),
}

/// One row of a zonal result, aligned to input zone order by id.
#[derive(Debug, Clone, PartialEq)]
pub struct ZoneResult {
    pub zone_id: String,
    pub aggregate: ZoneAggregate,
}

type ZoneAccumulator = BTreeMap<Option<i32>, Aggregate>;

/// Compute per-zone aggregates with the default reduction capacity.
pub fn zonal_statistics(request: &ZonalRequest<'_>) -> LayersResult<Vec<ZoneResult>> {
    zonal_statistics_with_capacity(request, DEFAULT_REDUCE_CAPACITY)
}

/// Compute per-zone aggregates, re-tiling when the grid exceeds `capacity`
/// cells.
///
/// Partial aggregates from tiles merge additively; means are recomputed
/// from merged sums and counts. Tile membership is half-open so a cell on
/// a tile border contributes exactly once.
pub fn zonal_statistics_with_capacity(
    request: &ZonalRequest<'_>,
    capacity: usize,
) -> LayersResult<Vec<ZoneResult>> {
    if request.zones.crs() != request.grid.crs() {
        return Err(LayersError::InvalidCrs(format!(
            "zones are {} but the grid is {}",
            request.zones.crs(),
            request.grid.crs()
        )));
    }

    let mut grid = request.grid.clone();
    for mask in &request.masks {
        grid = grid.apply_mask(mask)?;
    }

    if let Some(group) = request.group_by {
        if !group.spec().aligned_with(grid.spec()) {
            return Err(LayersError::GridMismatch(
                "group-by grid is not aligned with the product grid".to_string(),
            ));
        }
    }

    let mut accumulators: Vec<ZoneAccumulator> = vec![BTreeMap::new(); request.zones.len()];

    if grid.spec().len() <= capacity {
        accumulate(&grid, request.group_by, request.zones, &mut accumulators);
    } else {
        // Re-tile the reduction: square tiles of at most `capacity` cells
        let cells_per_side = (capacity as f64).sqrt().floor().max(1.0);
        let side = cells_per_side * grid.spec().dx.max(grid.spec().dy);

        let extent = Extent::new(grid.bbox(), grid.crs())?;
        let net = Fishnet::partition(&extent, side)?;
        debug!(
            cells = grid.spec().len(),
            capacity,
            tiles = net.len(),
            "grid exceeds reduction capacity, merging per-tile partials"
        );

        for tile in net.tiles() {
            let Ok(clipped) = grid.clip(tile.extent.bbox()) else {
                continue;
            };
            let clipped_group = match request.group_by {
                Some(group) => Some(group.clip(tile.extent.bbox())?),
                None => None,
            };
            accumulate(
                &clipped,
                clipped_group.as_ref(),
                request.zones,
                &mut accumulators,
            );
        }
    }

    let results = request
        .zones
        .iter()
        .zip(accumulators)
        .map(|(zone, accumulator)| ZoneResult {
            zone_id: zone.id.clone(),
            aggregate: match request.group_by {
                None => ZoneAggregate::Scalar(
                    accumulator
                        .get(&None)
                        .and_then(|a| a.value(request.statistic)),
                ),
                Some(_) => ZoneAggregate::ByCategory(
                    accumulator
                        .into_iter()
                        .filter_map(|(category, aggregate)| {
                            Some((category?, aggregate.value(request.statistic)?))
                        })
                        .collect(),
                ),
            },
        })
        .collect();

    Ok(results)
}

/// Convenience path for a single zone: the scalar aggregate.
pub fn zonal_scalar(
    grid: &RasterGrid,
    zone: &Zone,
    statistic: Statistic,
) -> LayersResult<Option<f64>> {
    let zones = ZoneCollection::new(grid.crs(), vec![zone.clone()])?;
    let results = zonal_statistics(&ZonalRequest {
        grid,
        zones: &zones,
        statistic,
        group_by: None,
        masks: Vec::new(),
    })?;

    match results.into_iter().next() {
        Some(ZoneResult {
            aggregate: ZoneAggregate::Scalar(value),
            ..
        }) => Ok(value),
        _ => Ok(None),
    }
}

/// Accumulate one grid (or one tile of it) into the per-zone partials.
fn accumulate(
    grid: &RasterGrid,
    group_by: Option<&RasterGrid>,
    zones: &ZoneCollection,
    accumulators: &mut [ZoneAccumulator],
) {
    let spec = grid.spec();
    let grid_bbox = grid.bbox();

    for (zone_index, zone) in zones.iter().enumerate() {
        let Some(zone_bbox) = zone.bbox() else {
            continue;
        };
        let Some(window) = zone_bbox.intersection(&grid_bbox) else {
            continue;
        };

        // Index window around the intersection; the polygon test decides
        // actual membership
        let i0 = (((window.min_x - spec.origin_x) / spec.dx).floor()).max(0.0) as usize;
        let i1 = ((((window.max_x - spec.origin_x) / spec.dx).ceil()).max(0.0) as usize).min(spec.nx);
        let j0 = (((spec.origin_y - window.max_y) / spec.dy).floor()).max(0.0) as usize;
        let j1 = ((((spec.origin_y - window.min_y) / spec.dy).ceil()).max(0.0) as usize).min(spec.ny);

        for j in j0..j1 {
            for i in i0..i1 {
                let value = grid.value(i, j);
                if value.is_nan() {
                    continue;
                }

                let (x, y) = spec.cell_center(i, j);
                if !zone.polygon.contains(&Point::new(x, y)) {
                    continue;
                }

                let key = match group_by {
                    None => None,
                    Some(group) => {
                        let category = group.value(i, j);
                        if category.is_nan() {
                            continue;
                        }
                        Some(category.round() as i32)
                    }
                };

                accumulators[zone_index]
                    .entry(key)
                    .or_default()
                    .add_sample(value as f64);
            }
        }
    }
}

/// Flatten results into a row table.
///
/// Scalar results yield `zone_id,<statistic>` rows; stratified results
/// yield `zone_id,category,<statistic>` rows, one per category. A null
/// aggregate renders as an empty field.
pub fn to_row_table(results: &[ZoneResult], statistic: Statistic) -> RowTable {
    let stratified = results
        .iter()
        .any(|r| matches!(r.aggregate, ZoneAggregate::ByCategory(_)));

    let mut table = if stratified {
        RowTable::new(vec![
            "zone_id".to_string(),
            "category".to_string(),
            statistic.to_string(),
        ])
    } else {
        RowTable::new(vec!["zone_id".to_string(), statistic.to_string()])
    };

    for result in results {
        let rows: Vec<Vec<String>> = match &result.aggregate {
            ZoneAggregate::Scalar(value) => {
                let rendered = value.map(|v| v.to_string()).unwrap_or_default();
                if stratified {
                    vec![vec![result.zone_id.clone(), String::new(), rendered]]
                } else {
                    vec![vec![result.zone_id.clone(), rendered]]
                }
            }
            ZoneAggregate::ByCategory(by_category) if by_category.is_empty() => {
                vec![vec![result.zone_id.clone(), String::new(), String::new()]]
            }
            ZoneAggregate::ByCategory(by_category) => by_category
                .iter()
                .map(|(category, value)| {
                    vec![
                        result.zone_id.clone(),
                        category.to_string(),
                        value.to_string(),
                    ]
                })
                .collect(),
        };

        for row in rows {
            // Arity is correct by construction
            let _ = table.push_row(row);
        }
    }

    table
}

/// Attach results to their zone geometries as a feature table.
pub fn to_feature_table(
    zones: &ZoneCollection,
    results: &[ZoneResult],
    statistic: Statistic,
) -> LayersResult<FeatureTable> {
    if zones.len() != results.len() {
        return Err(LayersError::InvalidParameter {
            param: "results".to_string(),
            message: format!("{} results for {} zones", results.len(), zones.len()),
        });
    }

    let features = zones
        .iter()
        .zip(results)
        .map(|(zone, result)| {
            let mut properties = BTreeMap::new();
            match &result.aggregate {
                ZoneAggregate::Scalar(value) => {
                    properties.insert(statistic.to_string(), serde_json::json!(value));
                }
                ZoneAggregate::ByCategory(by_category) => {
                    for (category, value) in by_category {
                        properties.insert(
                            format!("{}_{}", statistic, category),
                            serde_json::json!(value),
                        );
                    }
                }
            }

            FeatureRecord {
                id: zone.id.clone(),
                geometry: zone.polygon.clone(),
                properties,
            }
        })
        .collect();

    Ok(FeatureTable::new(zones.crs(), features))
}
