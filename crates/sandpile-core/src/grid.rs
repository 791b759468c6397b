//! The square occupancy grid.
//!
//! Cells are stored row-major in a single contiguous `Vec<u64>`; cell
//! `(x, y)` lives at index `x * size + y`, where `x` selects the row.
//! Values are grain counts and so are never negative. The grid is
//! allocated once, zero-filled, and mutated in place for the lifetime of
//! the owning simulation.
//!
//! Initial values are `u32` while storage is `u64`, so a cell is always
//! at least 2^32 increments away from the top of its range and every
//! grain is accounted for.

use rand::Rng;
use serde::Serialize;

use crate::error::SandpileError;
use crate::rule::Offset;

/// An `N x N` matrix of grain counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Grid {
    /// Side length.
    size: usize,
    /// Row-major cell values, `size * size` long.
    cells: Vec<u64>,
}

impl Grid {
    /// Allocate an empty grid with the given side length.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidSize`] if `size` is zero or the
    /// cell count overflows `usize`.
    pub fn new(size: usize) -> Result<Self, SandpileError> {
        if size == 0 {
            return Err(SandpileError::InvalidSize { size });
        }
        let len = size
            .checked_mul(size)
            .ok_or(SandpileError::InvalidSize { size })?;
        Ok(Self {
            size,
            cells: vec![0; len],
        })
    }

    /// Build a grid from explicit rows. Row `x` holds the cells `(x, 0..size)`.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidSize`] for an empty matrix and
    /// [`SandpileError::NonSquareGrid`] if any row length differs from
    /// the number of rows.
    pub fn from_rows(rows: Vec<Vec<u32>>) -> Result<Self, SandpileError> {
        let size = rows.len();
        if size == 0 {
            return Err(SandpileError::InvalidSize { size });
        }
        if let Some((row, cells)) = rows.iter().enumerate().find(|(_, r)| r.len() != size) {
            return Err(SandpileError::NonSquareGrid {
                rows: size,
                row,
                len: cells.len(),
            });
        }
        Ok(Self {
            size,
            cells: rows.into_iter().flatten().map(u64::from).collect(),
        })
    }

    /// Side length.
    pub const fn size(&self) -> usize {
        self.size
    }

    /// Value at `(x, y)`, or `None` if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u64> {
        self.index(x, y).and_then(|i| self.cells.get(i)).copied()
    }

    /// Add one grain to `(x, y)`.
    ///
    /// # Errors
    ///
    /// Returns [`SandpileError::InvalidCoordinate`] if the cell lies
    /// outside the grid. The grid is left untouched in that case.
    pub fn add_grain(&mut self, x: usize, y: usize) -> Result<(), SandpileError> {
        let size = self.size;
        let cell = self
            .index(x, y)
            .and_then(|i| self.cells.get_mut(i))
            .ok_or(SandpileError::InvalidCoordinate {
                x: Some(x),
                y: Some(y),
                size,
            })?;
        *cell = cell.saturating_add(1);
        Ok(())
    }

    /// Add one grain to a uniformly random cell and return that cell.
    ///
    /// The row is drawn before the column.
    pub(crate) fn add_random_grain<R: Rng + ?Sized>(&mut self, rng: &mut R) -> (usize, usize) {
        let x = rng.random_range(0..self.size);
        let y = rng.random_range(0..self.size);
        if let Some(cell) = self.index(x, y).and_then(|i| self.cells.get_mut(i)) {
            *cell = cell.saturating_add(1);
        }
        (x, y)
    }

    /// Borrow the grid read-only.
    pub const fn view(&self) -> GridView<'_> {
        GridView { grid: self }
    }

    /// Coordinates of every cell holding at least `threshold` grains,
    /// in row-major order, read from the grid as it is right now.
    pub(crate) fn unstable_cells(&self, threshold: u32) -> Vec<(usize, usize)> {
        let threshold = u64::from(threshold);
        self.cells
            .iter()
            .enumerate()
            .filter(|&(_, &value)| value >= threshold)
            .filter_map(|(i, _)| self.coords(i))
            .collect()
    }

    /// Remove `grains` from `(x, y)`, saturating at zero.
    pub(crate) fn remove(&mut self, x: usize, y: usize, grains: u32) {
        if let Some(cell) = self.index(x, y).and_then(|i| self.cells.get_mut(i)) {
            *cell = cell.saturating_sub(u64::from(grains));
        }
    }

    /// Add one grain to the neighbour of `(x, y)` at `offset`.
    ///
    /// Returns `false` when the neighbour lies off the grid, in which case
    /// the grain is lost.
    pub(crate) fn deposit(&mut self, x: usize, y: usize, offset: Offset) -> bool {
        let Some((nx, ny)) = self.neighbor(x, y, offset) else {
            return false;
        };
        match self.index(nx, ny).and_then(|i| self.cells.get_mut(i)) {
            Some(cell) => {
                *cell = cell.saturating_add(1);
                true
            }
            None => false,
        }
    }

    /// Resolve `(x + dx, y + dy)` if it lies inside the grid.
    fn neighbor(&self, x: usize, y: usize, (dx, dy): Offset) -> Option<(usize, usize)> {
        let nx = x.checked_add_signed(isize::try_from(dx).ok()?)?;
        let ny = y.checked_add_signed(isize::try_from(dy).ok()?)?;
        (nx < self.size && ny < self.size).then_some((nx, ny))
    }

    fn index(&self, x: usize, y: usize) -> Option<usize> {
        if x >= self.size || y >= self.size {
            return None;
        }
        x.checked_mul(self.size)?.checked_add(y)
    }

    fn coords(&self, index: usize) -> Option<(usize, usize)> {
        Some((
            index.checked_div(self.size)?,
            index.checked_rem(self.size)?,
        ))
    }
}

/// Read-only view of a [`Grid`], handed to rendering and analysis code.
///
/// The view borrows the grid immutably, so nothing holding it can mutate
/// the simulation.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(transparent)]
pub struct GridView<'a> {
    grid: &'a Grid,
}

impl<'a> GridView<'a> {
    /// Side length.
    pub const fn size(&self) -> usize {
        self.grid.size
    }

    /// Value at `(x, y)`, or `None` if out of bounds.
    pub fn get(&self, x: usize, y: usize) -> Option<u64> {
        self.grid.get(x, y)
    }

    /// Iterate over rows; row `x` holds the cells `(x, 0..size)`.
    pub fn rows(&self) -> impl Iterator<Item = &'a [u64]> + 'a {
        self.grid.cells.chunks_exact(self.grid.size)
    }

    /// All cells in row-major order.
    pub fn as_slice(&self) -> &'a [u64] {
        &self.grid.cells
    }

    /// Copy the grid out as a nested matrix.
    pub fn to_rows(&self) -> Vec<Vec<u64>> {
        self.rows().map(<[u64]>::to_vec).collect()
    }

    /// Total number of grains on the grid.
    pub fn total_mass(&self) -> u64 {
        self.grid
            .cells
            .iter()
            .fold(0_u64, |acc, &v| acc.saturating_add(v))
    }

    /// Largest cell value.
    pub fn max_value(&self) -> u64 {
        self.grid.cells.iter().copied().max().unwrap_or(0)
    }

    /// Whether every cell is strictly below `threshold`.
    pub fn is_stable(&self, threshold: u32) -> bool {
        self.grid.cells.iter().all(|&v| v < u64::from(threshold))
    }
}
