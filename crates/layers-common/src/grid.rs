//! Raster grid type for produced layer data.

use serde::{Deserialize, Serialize};

use crate::bbox::BoundingBox;
use crate::crs::CrsCode;
use crate::error::{LayersError, LayersResult};

/// Specification of a regular, axis-aligned grid.
///
/// Cells are stored row-major from the northwest corner: column `i` grows
/// east, row `j` grows south. `dx`/`dy` are positive cell sizes in the
/// grid's CRS units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSpec {
    /// Number of columns
    pub nx: usize,
    /// Number of rows
    pub ny: usize,
    /// Cell width
    pub dx: f64,
    /// Cell height
    pub dy: f64,
    /// West edge of the grid
    pub origin_x: f64,
    /// North edge of the grid
    pub origin_y: f64,
}

impl GridSpec {
    pub fn new(nx: usize, ny: usize, dx: f64, dy: f64, origin_x: f64, origin_y: f64) -> Self {
        Self {
            nx,
            ny,
            dx,
            dy,
            origin_x,
            origin_y,
        }
    }

    /// Calculate the bounding box covered by this grid.
    pub fn bbox(&self) -> BoundingBox {
        BoundingBox {
            min_x: self.origin_x,
            min_y: self.origin_y - self.ny as f64 * self.dy,
            max_x: self.origin_x + self.nx as f64 * self.dx,
            max_y: self.origin_y,
        }
    }

    /// Center coordinates of cell (i, j).
    pub fn cell_center(&self, i: usize, j: usize) -> (f64, f64) {
        (
            self.origin_x + (i as f64 + 0.5) * self.dx,
            self.origin_y - (j as f64 + 0.5) * self.dy,
        )
    }

    /// The cell whose interior contains a coordinate, if any.
    ///
    /// Membership is half-open (west and north edges inclusive) so a point
    /// on a shared cell boundary belongs to exactly one cell.
    pub fn coord_to_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        let i = ((x - self.origin_x) / self.dx).floor() as isize;
        let j = ((self.origin_y - y) / self.dy).floor() as isize;

        if i < 0 || j < 0 || i >= self.nx as isize || j >= self.ny as isize {
            return None;
        }

        Some((i as usize, j as usize))
    }

    /// The 1D array index for a 2D grid position.
    pub fn flat_index(&self, i: usize, j: usize) -> usize {
        j * self.nx + i
    }

    /// Total number of grid cells.
    pub fn len(&self) -> usize {
        self.nx * self.ny
    }

    /// Check if grid is empty.
    pub fn is_empty(&self) -> bool {
        self.nx == 0 || self.ny == 0
    }

    /// Whether two specs describe the same cell lattice.
    pub fn aligned_with(&self, other: &GridSpec) -> bool {
        const EPS: f64 = 1e-9;
        self.nx == other.nx
            && self.ny == other.ny
            && (self.dx - other.dx).abs() < EPS
            && (self.dy - other.dy).abs() < EPS
            && (self.origin_x - other.origin_x).abs() < EPS
            && (self.origin_y - other.origin_y).abs() < EPS
    }
}

/// A produced raster layer: grid geometry, CRS, and row-major f32 values.
///
/// No-data cells are `f32::NAN`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RasterGrid {
    spec: GridSpec,
    crs: CrsCode,
    values: Vec<f32>,
}

impl RasterGrid {
    /// Create a grid from row-major values.
    pub fn new(spec: GridSpec, crs: CrsCode, values: Vec<f32>) -> LayersResult<Self> {
        if values.len() != spec.len() {
            return Err(LayersError::GridMismatch(format!(
                "expected {} values for a {}x{} grid, got {}",
                spec.len(),
                spec.nx,
                spec.ny,
                values.len()
            )));
        }

        Ok(Self { spec, crs, values })
    }

    /// Create a grid with every cell set to one value.
    pub fn filled(spec: GridSpec, crs: CrsCode, value: f32) -> Self {
        let values = vec![value; spec.len()];
        Self { spec, crs, values }
    }

    /// Create a grid of entirely no-data cells.
    pub fn empty(spec: GridSpec, crs: CrsCode) -> Self {
        Self::filled(spec, crs, f32::NAN)
    }

    pub fn spec(&self) -> &GridSpec {
        &self.spec
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn bbox(&self) -> BoundingBox {
        self.spec.bbox()
    }

    /// Value at cell (i, j). NaN is no-data.
    pub fn value(&self, i: usize, j: usize) -> f32 {
        self.values[self.spec.flat_index(i, j)]
    }

    pub fn set_value(&mut self, i: usize, j: usize, value: f32) {
        let idx = self.spec.flat_index(i, j);
        self.values[idx] = value;
    }

    /// Value at a coordinate, if it falls inside the grid.
    pub fn value_at(&self, x: f64, y: f64) -> Option<f32> {
        self.spec
            .coord_to_index(x, y)
            .map(|(i, j)| self.value(i, j))
    }

    /// Re-attach a CRS to a grid deserialized without one.
    pub fn with_crs(mut self, crs: CrsCode) -> Self {
        self.crs = crs;
        self
    }

    /// Clip to the cells whose centers fall inside a bounding box.
    ///
    /// Membership is half-open (west/north edges inclusive) so clipping a
    /// grid against two adjacent tiles assigns every cell to exactly one.
    pub fn clip(&self, bounds: &BoundingBox) -> LayersResult<RasterGrid> {
        let spec = &self.spec;

        // Column range with center x in [min_x, max_x)
        let i0 = ((bounds.min_x - spec.origin_x) / spec.dx - 0.5).ceil().max(0.0) as usize;
        let i1_f = ((bounds.max_x - spec.origin_x) / spec.dx - 0.5).ceil();
        let i1 = (i1_f.max(0.0) as usize).min(spec.nx);

        // Row range with center y in (min_y, max_y]
        let j0 = ((spec.origin_y - bounds.max_y) / spec.dy - 0.5).ceil().max(0.0) as usize;
        let j1_f = ((spec.origin_y - bounds.min_y) / spec.dy - 0.5).ceil();
        let j1 = (j1_f.max(0.0) as usize).min(spec.ny);

        if i0 >= i1 || j0 >= j1 {
            return Err(LayersError::GridMismatch(format!(
                "clip bounds {} do not cover any cell center",
                bounds.cache_key()
            )));
        }

        let clipped_spec = GridSpec::new(
            i1 - i0,
            j1 - j0,
            spec.dx,
            spec.dy,
            spec.origin_x + i0 as f64 * spec.dx,
            spec.origin_y - j0 as f64 * spec.dy,
        );

        let mut values = Vec::with_capacity(clipped_spec.len());
        for j in j0..j1 {
            let start = spec.flat_index(i0, j);
            values.extend_from_slice(&self.values[start..start + (i1 - i0)]);
        }

        RasterGrid::new(clipped_spec, self.crs, values)
    }

    /// Apply a mask: cells that are no-data in the mask become no-data here.
    ///
    /// Composing several masks this way is a logical AND.
    pub fn apply_mask(&self, mask: &RasterGrid) -> LayersResult<RasterGrid> {
        if !self.spec.aligned_with(&mask.spec) {
            return Err(LayersError::GridMismatch(
                "mask grid is not aligned with the product grid".to_string(),
            ));
        }

        let values = self
            .values
            .iter()
            .zip(mask.values.iter())
            .map(|(v, m)| if m.is_nan() { f32::NAN } else { *v })
            .collect();

        RasterGrid::new(self.spec, self.crs, values)
    }

    /// Count of populated (non-no-data) cells.
    pub fn populated_cells(&self) -> usize {
        self.values.iter().filter(|v| !v.is_nan()).count()
    }
}
