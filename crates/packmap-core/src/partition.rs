use serde::{Deserialize, Serialize};

use crate::error::{AtlasError, Result};
use crate::model::Rect;

/// Number of tiles needed to cover `dim` pixels (`ceil(dim / tile_px)`).
pub fn tiles_along(dim: u32, tile_px: u32) -> u32 {
    dim.div_ceil(tile_px)
}

/// One cell of a tile grid: its grid coordinate and pixel bounds.
///
/// Bounds are half-open (`x0..x1`, `y0..y1`). Cells on the last column/row are
/// truncated to the image edge, never padded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileBounds {
    pub tile_x: u32,
    pub tile_y: u32,
    pub x0: u32,
    pub y0: u32,
    pub x1: u32,
    pub y1: u32,
}

impl TileBounds {
    pub fn width(&self) -> u32 {
        self.x1 - self.x0
    }
    pub fn height(&self) -> u32 {
        self.y1 - self.y0
    }
    /// Bounds as an `x,y,w,h` rectangle.
    pub fn rect(&self) -> Rect {
        Rect::new(self.x0, self.y0, self.width(), self.height())
    }
}

/// Tile grid covering a `width x height` image with square `tile_px` cells.
///
/// The grid is a plain value; [`TileGrid::iter`] can be called any number of
/// times and always yields the same row-major sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TileGrid {
    width: u32,
    height: u32,
    tile_px: u32,
}

impl TileGrid {
    /// Fails with [`AtlasError::InvalidTileSize`] when `tile_px` is zero.
    pub fn new(width: u32, height: u32, tile_px: u32) -> Result<Self> {
        if tile_px == 0 {
            return Err(AtlasError::InvalidTileSize);
        }
        Ok(Self {
            width,
            height,
            tile_px,
        })
    }

    pub fn tiles_x(&self) -> u32 {
        tiles_along(self.width, self.tile_px)
    }

    pub fn tiles_y(&self) -> u32 {
        tiles_along(self.height, self.tile_px)
    }

    /// Total number of cells.
    pub fn len(&self) -> usize {
        self.tiles_x() as usize * self.tiles_y() as usize
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bounds of cell `(tile_x, tile_y)`. Coordinates must be inside the grid.
    pub fn bounds(&self, tile_x: u32, tile_y: u32) -> TileBounds {
        let x0 = tile_x * self.tile_px;
        let y0 = tile_y * self.tile_px;
        TileBounds {
            tile_x,
            tile_y,
            x0,
            y0,
            x1: x0.saturating_add(self.tile_px).min(self.width),
            y1: y0.saturating_add(self.tile_px).min(self.height),
        }
    }

    /// Row-major iterator: `tile_y` outer, `tile_x` inner.
    pub fn iter(&self) -> TileIter {
        TileIter {
            grid: *self,
            next: 0,
            total: self.len(),
        }
    }
}

impl IntoIterator for TileGrid {
    type Item = TileBounds;
    type IntoIter = TileIter;

    fn into_iter(self) -> TileIter {
        self.iter()
    }
}

impl IntoIterator for &TileGrid {
    type Item = TileBounds;
    type IntoIter = TileIter;

    fn into_iter(self) -> TileIter {
        self.iter()
    }
}

/// Lazy row-major walk over a [`TileGrid`].
#[derive(Debug, Clone)]
pub struct TileIter {
    grid: TileGrid,
    next: usize,
    total: usize,
}

impl Iterator for TileIter {
    type Item = TileBounds;

    fn next(&mut self) -> Option<TileBounds> {
        if self.next >= self.total {
            return None;
        }
        let cols = self.grid.tiles_x() as usize;
        let tile_x = (self.next % cols) as u32;
        let tile_y = (self.next / cols) as u32;
        self.next += 1;
        Some(self.grid.bounds(tile_x, tile_y))
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let rest = self.total - self.next;
        (rest, Some(rest))
    }
}

impl ExactSizeIterator for TileIter {}

/// Partitions a `width x height` image into `tile_px` cells in row-major order.
pub fn partition(width: u32, height: u32, tile_px: u32) -> Result<TileIter> {
    Ok(TileGrid::new(width, height, tile_px)?.iter())
}
