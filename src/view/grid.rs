//! Tile ranges covering a region of a layer.

use crate::geometry::Rect;

/// A half-open block of tile cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TileRange {
    pub col_start: u32,
    pub col_end: u32,
    pub row_start: u32,
    pub row_end: u32,
}

impl TileRange {
    /// Cells of size `tile_w x tile_h` overlapping `rect`, after clipping
    /// `rect` to the extent `[0, extent_w] x [0, extent_h]`.
    ///
    /// The left and top edges snap outward to a tile boundary; the right and
    /// bottom edges take any partly covered cell.
    pub fn covering(rect: Rect, tile_w: f64, tile_h: f64, extent_w: f64, extent_h: f64) -> Self {
        let left = rect.x.clamp(0.0, extent_w);
        let right = rect.right().clamp(0.0, extent_w);
        let top = rect.y.clamp(0.0, extent_h);
        let bottom = rect.bottom().clamp(0.0, extent_h);

        if right <= left || bottom <= top || tile_w <= 0.0 || tile_h <= 0.0 {
            return Self::default();
        }

        Self {
            col_start: (left / tile_w).floor() as u32,
            col_end: (right / tile_w).ceil() as u32,
            row_start: (top / tile_h).floor() as u32,
            row_end: (bottom / tile_h).ceil() as u32,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.col_start >= self.col_end || self.row_start >= self.row_end
    }

    pub fn len(&self) -> usize {
        if self.is_empty() {
            return 0;
        }
        (self.col_end - self.col_start) as usize * (self.row_end - self.row_start) as usize
    }

    /// `(col, row)` pairs, row by row from the top left.
    pub fn cells(&self) -> impl Iterator<Item = (u32, u32)> {
        let (cols, rows) = (self.col_start..self.col_end, self.row_start..self.row_end);
        rows.flat_map(move |row| cols.clone().map(move |col| (col, row)))
    }
}
