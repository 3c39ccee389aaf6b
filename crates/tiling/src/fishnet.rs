//! Fishnet partitioning: a regular grid of equal-sized tiles over an extent.

use layers_common::{BoundingBox, CrsCode, Extent, LayersError, LayersResult};

/// One tile of a fishnet partition.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tile {
    /// Row-major index within the fishnet.
    pub index: usize,
    pub extent: Extent,
}

/// A deterministic partition of an extent into fixed-size square tiles.
///
/// Tiles are indexed row-major from the northwest corner: index 0 is the
/// NW tile, indices grow east then south. Re-partitioning the same extent
/// with the same side length always reproduces the same index -> bounds
/// mapping, which resumption depends on. Tiles in the last column/row
/// extend past the parent bounds rather than shrinking, so tile geometry
/// is independent of how the parent width divides.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Fishnet {
    crs: CrsCode,
    origin_x: f64,
    origin_y: f64,
    side: f64,
    cols: usize,
    rows: usize,
}

impl Fishnet {
    /// Partition an extent into tiles of a fixed side length.
    pub fn partition(extent: &Extent, side: f64) -> LayersResult<Self> {
        if !(side > 0.0) || !side.is_finite() {
            return Err(LayersError::InvalidParameter {
                param: "side".to_string(),
                message: format!("tile side must be positive and finite, got {}", side),
            });
        }

        let bbox = extent.bbox();
        let cols = (bbox.width() / side).ceil().max(1.0) as usize;
        let rows = (bbox.height() / side).ceil().max(1.0) as usize;

        Ok(Self {
            crs: extent.crs(),
            origin_x: bbox.min_x,
            origin_y: bbox.max_y,
            side,
            cols,
            rows,
        })
    }

    pub fn crs(&self) -> CrsCode {
        self.crs
    }

    pub fn side(&self) -> f64 {
        self.side
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Total number of tiles.
    pub fn len(&self) -> usize {
        self.cols * self.rows
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The tile at a row-major index.
    pub fn tile(&self, index: usize) -> Option<Tile> {
        if index >= self.len() {
            return None;
        }

        let row = index / self.cols;
        let col = index % self.cols;

        let min_x = self.origin_x + col as f64 * self.side;
        let max_y = self.origin_y - row as f64 * self.side;
        let bbox = BoundingBox::new(min_x, max_y - self.side, min_x + self.side, max_y);

        // The box is non-degenerate by construction
        let extent = Extent::new(bbox, self.crs).expect("fishnet tile bounds are valid");

        Some(Tile { index, extent })
    }

    /// Iterate tiles in index order.
    pub fn tiles(&self) -> impl Iterator<Item = Tile> + '_ {
        (0..self.len()).map(move |index| self.tile(index).expect("index in range"))
    }

    /// The tile containing a point, by half-open membership (west/north
    /// tile edges inclusive).
    pub fn tile_at(&self, x: f64, y: f64) -> Option<Tile> {
        let col = ((x - self.origin_x) / self.side).floor();
        let row = ((self.origin_y - y) / self.side).floor();

        if col < 0.0 || row < 0.0 || col >= self.cols as f64 || row >= self.rows as f64 {
            return None;
        }

        self.tile(row as usize * self.cols + col as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn utm_extent(width: f64, height: f64) -> Extent {
        let crs = CrsCode::Utm {
            zone: 31,
            north: true,
        };
        Extent::from_corners(500_000.0, 100_000.0, 500_000.0 + width, 100_000.0 + height, crs)
            .unwrap()
    }

    #[test]
    fn test_150_by_150_with_side_50_yields_9_tiles() {
        let net = Fishnet::partition(&utm_extent(150.0, 150.0), 50.0).unwrap();
        assert_eq!(net.cols(), 3);
        assert_eq!(net.rows(), 3);
        assert_eq!(net.len(), 9);
    }

    #[test]
    fn test_row_major_from_northwest() {
        let net = Fishnet::partition(&utm_extent(150.0, 150.0), 50.0).unwrap();

        let first = net.tile(0).unwrap();
        assert_eq!(first.extent.bbox().min_x, 500_000.0);
        assert_eq!(first.extent.bbox().max_y, 100_150.0);

        // Index 1 is one tile east, index 3 one tile south
        let east = net.tile(1).unwrap();
        assert_eq!(east.extent.bbox().min_x, 500_050.0);
        assert_eq!(east.extent.bbox().max_y, 100_150.0);

        let south = net.tile(3).unwrap();
        assert_eq!(south.extent.bbox().min_x, 500_000.0);
        assert_eq!(south.extent.bbox().max_y, 100_100.0);

        assert!(net.tile(9).is_none());
    }

    #[test]
    fn test_partition_is_deterministic() {
        let extent = utm_extent(1234.0, 987.0);

        let a = Fishnet::partition(&extent, 100.0).unwrap();
        let b = Fishnet::partition(&extent, 100.0).unwrap();

        assert_eq!(a.len(), b.len());
        for index in 0..a.len() {
            assert_eq!(a.tile(index), b.tile(index));
        }
    }

    #[test]
    fn test_ragged_edge_tiles_keep_full_side() {
        // 120 wide with side 50 -> 3 columns, last extends past the parent
        let net = Fishnet::partition(&utm_extent(120.0, 50.0), 50.0).unwrap();
        assert_eq!(net.cols(), 3);
        assert_eq!(net.rows(), 1);

        let last = net.tile(2).unwrap();
        assert_eq!(last.extent.bbox().width(), 50.0);
        assert_eq!(last.extent.bbox().max_x, 500_150.0);
    }

    #[test]
    fn test_tile_at_half_open_membership() {
        let net = Fishnet::partition(&utm_extent(100.0, 100.0), 50.0).unwrap();

        // Interior point of the SE tile
        assert_eq!(net.tile_at(500_075.0, 100_025.0).unwrap().index, 3);
        // A point on the shared vertical edge belongs to the eastern tile
        assert_eq!(net.tile_at(500_050.0, 100_075.0).unwrap().index, 1);
        // A point on the shared horizontal edge belongs to the southern tile
        assert_eq!(net.tile_at(500_025.0, 100_050.0).unwrap().index, 2);
        // Outside
        assert!(net.tile_at(499_999.0, 100_025.0).is_none());
    }

    #[test]
    fn test_invalid_side_rejected() {
        let extent = utm_extent(100.0, 100.0);
        assert!(Fishnet::partition(&extent, 0.0).is_err());
        assert!(Fishnet::partition(&extent, -5.0).is_err());
        assert!(Fishnet::partition(&extent, f64::NAN).is_err());
    }
}
