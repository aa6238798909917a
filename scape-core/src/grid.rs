// Grid geometry: dimensions, cell indexing and Moore neighborhoods

use serde::{Deserialize, Serialize};

use crate::error::ScapeError;
use crate::types::Cell;

/// Width × height of the scape, fixed at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    pub width: usize,
    pub height: usize,
}

impl Dimensions {
    pub fn new(width: usize, height: usize) -> Result<Self, ScapeError> {
        if width == 0 || height == 0 {
            return Err(ScapeError::ZeroDimension { width, height });
        }
        Ok(Self { width, height })
    }

    /// Build dimensions from a loose list of extents.
    ///
    /// - 1 element: broadcast to a square
    /// - 2 elements: width, height
    /// - more: only the first two are used (warns)
    /// - none: rejected
    pub fn from_slice(dims: &[usize]) -> Result<Self, ScapeError> {
        match dims {
            [] => Err(ScapeError::EmptyDimensions),
            [side] => Self::new(*side, *side),
            [width, height] => Self::new(*width, *height),
            [width, height, ..] => {
                #[cfg(feature = "instrument")]
                tracing::warn!(
                    extents = dims.len(),
                    "dimensions longer than needed, only the first two are used"
                );
                Self::new(*width, *height)
            }
        }
    }

    pub fn cell_count(&self) -> usize {
        self.width * self.height
    }

    pub fn contains(&self, cell: Cell) -> bool {
        cell.x < self.width && cell.y < self.height
    }

    /// Row-major index of a cell. Caller guarantees the cell is in bounds.
    pub fn index(&self, cell: Cell) -> usize {
        debug_assert!(self.contains(cell), "cell {cell:?} outside {self:?}");
        cell.y * self.width + cell.x
    }

    pub fn cell_at(&self, index: usize) -> Cell {
        Cell::new(index % self.width, index / self.width)
    }

    pub fn cells(self) -> impl Iterator<Item = Cell> {
        (0..self.cell_count()).map(move |i| self.cell_at(i))
    }

    /// Offset a cell by a movement delta, clamped into the grid.
    pub fn offset_clamped(&self, cell: Cell, dx: i64, dy: i64) -> Cell {
        let clamp = |v: usize, d: i64, extent: usize| -> usize {
            (v as i64 + d).clamp(0, extent as i64 - 1) as usize
        };
        Cell::new(clamp(cell.x, dx, self.width), clamp(cell.y, dy, self.height))
    }

    /// In-bounds cells at Chebyshev distance exactly 1 (the Moore neighborhood).
    ///
    /// Borders clip the neighborhood; the grid does not wrap.
    pub fn moore(self, center: Cell) -> impl Iterator<Item = Cell> {
        (-1i64..=1)
            .flat_map(|dy| (-1i64..=1).map(move |dx| (dx, dy)))
            .filter(|&(dx, dy)| dx != 0 || dy != 0)
            .filter_map(move |(dx, dy)| {
                let x = center.x as i64 + dx;
                let y = center.y as i64 + dy;
                if x < 0 || y < 0 || x >= self.width as i64 || y >= self.height as i64 {
                    None
                } else {
                    Some(Cell::new(x as usize, y as usize))
                }
            })
    }
}

/// A dense per-cell layer, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct Layer<T> {
    dims: Dimensions,
    values: Vec<T>,
}

impl<T: Clone> Layer<T> {
    pub fn filled(dims: Dimensions, value: T) -> Self {
        Self {
            dims,
            values: vec![value; dims.cell_count()],
        }
    }
}

impl<T> Layer<T> {
    pub fn from_fn(dims: Dimensions, mut f: impl FnMut(Cell) -> T) -> Self {
        Self {
            dims,
            values: dims.cells().map(&mut f).collect(),
        }
    }

    pub fn dims(&self) -> Dimensions {
        self.dims
    }

    pub fn get(&self, cell: Cell) -> &T {
        &self.values[self.dims.index(cell)]
    }

    pub fn get_mut(&mut self, cell: Cell) -> &mut T {
        let idx = self.dims.index(cell);
        &mut self.values[idx]
    }

    pub fn set(&mut self, cell: Cell, value: T) {
        *self.get_mut(cell) = value;
    }

    pub fn values(&self) -> &[T] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [T] {
        &mut self.values
    }
}
