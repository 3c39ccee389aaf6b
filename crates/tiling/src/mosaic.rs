//! Stitching per-tile grids back into one raster.

use layers_common::{GridSpec, LayersError, LayersResult, RasterGrid};

/// Merge tile grids into a single grid covering their union bounds.
///
/// All inputs must share a CRS and cell size. Cells are placed by center
/// coordinate; where tiles overlap (the over-fetch margin), populated
/// values win over no-data and later tiles win over earlier ones.
pub fn mosaic(grids: &[RasterGrid]) -> LayersResult<RasterGrid> {
    let first = grids.first().ok_or_else(|| LayersError::InvalidParameter {
        param: "grids".to_string(),
        message: "cannot mosaic zero grids".to_string(),
    })?;

    const EPS: f64 = 1e-9;
    let (dx, dy) = (first.spec().dx, first.spec().dy);

    let mut union = first.bbox();
    for grid in grids {
        if grid.crs() != first.crs() {
            return Err(LayersError::GridMismatch(format!(
                "mosaic inputs mix CRS {} and {}",
                first.crs(),
                grid.crs()
            )));
        }
        if (grid.spec().dx - dx).abs() > EPS || (grid.spec().dy - dy).abs() > EPS {
            return Err(LayersError::GridMismatch(
                "mosaic inputs have differing cell sizes".to_string(),
            ));
        }
        union = union.union(&grid.bbox());
    }

    let nx = (union.width() / dx).round() as usize;
    let ny = (union.height() / dy).round() as usize;
    let spec = GridSpec::new(nx, ny, dx, dy, union.min_x, union.max_y);

    let mut result = RasterGrid::empty(spec, first.crs());
    for grid in grids {
        for j in 0..grid.spec().ny {
            for i in 0..grid.spec().nx {
                let value = grid.value(i, j);
                if value.is_nan() {
                    continue;
                }
                let (x, y) = grid.spec().cell_center(i, j);
                if let Some((ti, tj)) = spec.coord_to_index(x, y) {
                    result.set_value(ti, tj, value);
                }
            }
        }
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use layers_common::CrsCode;

    fn utm() -> CrsCode {
        CrsCode::Utm {
            zone: 31,
            north: true,
        }
    }

    #[test]
    fn test_mosaic_two_adjacent_tiles() {
        // Two 2x2 tiles side by side, 10m cells
        let west = RasterGrid::filled(GridSpec::new(2, 2, 10.0, 10.0, 0.0, 20.0), utm(), 1.0);
        let east = RasterGrid::filled(GridSpec::new(2, 2, 10.0, 10.0, 20.0, 20.0), utm(), 2.0);

        let merged = mosaic(&[west, east]).unwrap();
        assert_eq!(merged.spec().nx, 4);
        assert_eq!(merged.spec().ny, 2);
        assert_eq!(merged.value(0, 0), 1.0);
        assert_eq!(merged.value(3, 1), 2.0);
        assert_eq!(merged.populated_cells(), 8);
    }

    #[test]
    fn test_mosaic_populated_wins_over_nodata() {
        let spec = GridSpec::new(2, 1, 10.0, 10.0, 0.0, 10.0);
        let mut a = RasterGrid::filled(spec, utm(), 5.0);
        a.set_value(1, 0, f32::NAN);
        let mut b = RasterGrid::empty(spec, utm());
        b.set_value(1, 0, 9.0);

        let merged = mosaic(&[a, b]).unwrap();
        assert_eq!(merged.value(0, 0), 5.0);
        assert_eq!(merged.value(1, 0), 9.0);
    }

    #[test]
    fn test_mosaic_rejects_mixed_inputs() {
        let a = RasterGrid::filled(GridSpec::new(2, 2, 10.0, 10.0, 0.0, 20.0), utm(), 1.0);
        let b = RasterGrid::filled(
            GridSpec::new(2, 2, 10.0, 10.0, 0.0, 20.0),
            CrsCode::Epsg4326,
            1.0,
        );
        assert!(mosaic(&[a.clone(), b]).is_err());

        let c = RasterGrid::filled(GridSpec::new(2, 2, 5.0, 5.0, 0.0, 20.0), utm(), 1.0);
        assert!(mosaic(&[a, c]).is_err());

        assert!(mosaic(&[]).is_err());
    }
}
