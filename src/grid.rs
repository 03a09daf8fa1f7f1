//! Raster geometry and flat-index addressing.
//!
//! Cells are addressed row-major: `index = row * width + col`. Every
//! coordinate-to-index conversion in the crate goes through [`Grid`].

use serde::{Deserialize, Serialize};

use crate::error::{HydroGridError, Result};

/// Fixed raster geometry: `width` columns by `height` rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid {
    width: usize,
    height: usize,
}

impl Grid {
    /// Create a grid, rejecting empty geometries.
    pub fn new(width: usize, height: usize) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(HydroGridError::GeometryMismatch {
                message: format!("Grid must be non-empty, got {}x{}", width, height),
            });
        }
        if width.checked_mul(height).is_none() {
            return Err(HydroGridError::GeometryMismatch {
                message: format!("Grid {}x{} overflows the index space", width, height),
            });
        }
        Ok(Self { width, height })
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    /// Whether `index` addresses a cell of this grid.
    pub fn contains_index(&self, index: usize) -> bool {
        index < self.cell_count()
    }

    /// Convert a flat index into `(row, col)`.
    pub fn to_row_col(&self, index: usize) -> (usize, usize) {
        (index / self.width, index % self.width)
    }

    /// Convert `(row, col)` into a flat index.
    pub fn to_index(&self, row: usize, col: usize) -> usize {
        row * self.width + col
    }

    /// Bounds check for signed coordinates, as produced by neighbourhood offsets.
    pub fn in_bounds(&self, row: i64, col: i64) -> bool {
        row >= 0 && col >= 0 && (row as usize) < self.height && (col as usize) < self.width
    }

    /// Largest search radius worth scanning: `max(width, height) - 1`.
    pub fn max_radius(&self) -> usize {
        self.width.max(self.height) - 1
    }
}
