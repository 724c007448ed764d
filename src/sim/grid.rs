//! Uniform spatial hash grid for broad-phase pruning
//!
//! The grid covers the world box `[0, width] x [0, height]` and is rebuilt from
//! scratch every sub-step. Each cell holds a fixed number of handles; once a
//! cell is full further insertions are dropped until the next rebuild, which
//! bounds memory regardless of how densely particles pile up.

use glam::Vec2;

use super::particle::{ParticleHandle, ParticleStore};
use crate::consts::CELL_CAPACITY;

/// Row/column of a grid cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CellCoord {
    pub row: usize,
    pub col: usize,
}

impl CellCoord {
    pub fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// Fixed-capacity bucket of particle handles
#[derive(Debug, Clone, Copy)]
pub struct CollisionCell {
    count: usize,
    particles: [ParticleHandle; CELL_CAPACITY],
    overflowed: bool,
}

impl Default for CollisionCell {
    fn default() -> Self {
        Self {
            count: 0,
            particles: [ParticleHandle::NULL; CELL_CAPACITY],
            overflowed: false,
        }
    }
}

impl CollisionCell {
    /// Store a handle; returns false (and drops it) when the cell is full
    pub fn insert(&mut self, handle: ParticleHandle) -> bool {
        if self.count >= CELL_CAPACITY {
            self.overflowed = true;
            return false;
        }
        self.particles[self.count] = handle;
        self.count += 1;
        true
    }

    pub fn clear(&mut self) {
        self.count = 0;
        self.overflowed = false;
    }

    /// True once an insertion was dropped since the last clear
    pub fn overflowed(&self) -> bool {
        self.overflowed
    }

    /// Occupancy, for debug overlays
    pub fn len(&self) -> usize {
        self.count
    }

    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn is_full(&self) -> bool {
        self.count >= CELL_CAPACITY
    }

    pub fn handles(&self) -> &[ParticleHandle] {
        &self.particles[..self.count]
    }
}

/// Uniform grid over the world box
#[derive(Debug, Clone)]
pub struct CollisionGrid {
    width: f32,
    height: f32,
    cell_size: f32,
    rows: usize,
    cols: usize,
    cells: Vec<CollisionCell>,
    /// Insertions dropped since the last clear
    dropped: usize,
}

impl CollisionGrid {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cell_size = if cell_size > 0.0 { cell_size } else { 1.0 };
        let width = width.max(0.0);
        let height = height.max(0.0);
        let rows = ((height / cell_size).ceil() as usize).max(1);
        let cols = ((width / cell_size).ceil() as usize).max(1);
        Self {
            width,
            height,
            cell_size,
            rows,
            cols,
            cells: vec![CollisionCell::default(); rows * cols],
            dropped: 0,
        }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    /// Number of insertions dropped by full cells since the last clear
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    /// Reset every cell, O(cells)
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
        self.dropped = 0;
    }

    /// Cell containing `position`
    ///
    /// The position is clamped into the world box before dividing, and the
    /// resulting row/column clamped again, so the coordinate is always in
    /// range even for queries far outside the world. A particle is binned by
    /// its center, so its radius does not influence the cell.
    pub fn coordinate_of(&self, position: Vec2) -> CellCoord {
        let x = position.x.clamp(0.0, self.width);
        let y = position.y.clamp(0.0, self.height);
        // `as` saturates (NaN -> 0), the min() keeps the far edge in range
        let row = ((y / self.cell_size) as usize).min(self.rows - 1);
        let col = ((x / self.cell_size) as usize).min(self.cols - 1);
        CellCoord { row, col }
    }

    pub fn cell(&self, coord: CellCoord) -> &CollisionCell {
        &self.cells[coord.row * self.cols + coord.col]
    }

    fn cell_mut(&mut self, coord: CellCoord) -> &mut CollisionCell {
        &mut self.cells[coord.row * self.cols + coord.col]
    }

    /// All cells in row-major order
    pub fn cells(&self) -> &[CollisionCell] {
        &self.cells
    }

    /// Bin a handle at `position`; returns false if its cell was full
    pub fn insert(&mut self, handle: ParticleHandle, position: Vec2) -> bool {
        let coord = self.coordinate_of(position);
        let cell = self.cell_mut(coord);
        let first_drop = !cell.overflowed();
        if cell.insert(handle) {
            return true;
        }
        if first_drop {
            log::trace!("Grid cell ({}, {}) full, dropping particles", coord.row, coord.col);
        }
        self.dropped += 1;
        false
    }

    /// Clear and re-bin every particle of the store
    pub fn rebuild(&mut self, particles: &ParticleStore) {
        self.clear();
        for index in 0..particles.len() {
            if let Some(handle) = particles.handle_at(index) {
                let position = particles.as_slice()[index].current_position;
                self.insert(handle, position);
            }
        }
    }

    /// The 3x3 block around `coord`, in row-major order
    ///
    /// Offsets falling outside the grid are replaced by `coord` itself, so a
    /// boundary cell is tested against itself in place of the missing neighbor.
    pub fn neighborhood(&self, coord: CellCoord) -> [CellCoord; 9] {
        let mut out = [coord; 9];
        let mut k = 0;
        for dr in -1isize..=1 {
            for dc in -1isize..=1 {
                let row = coord.row as isize + dr;
                let col = coord.col as isize + dc;
                if row >= 0 && col >= 0 && (row as usize) < self.rows && (col as usize) < self.cols {
                    out[k] = CellCoord::new(row as usize, col as usize);
                }
                k += 1;
            }
        }
        out
    }

    /// Iterate all cell coordinates in row-major order
    pub fn coords(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.rows).flat_map(move |row| (0..self.cols).map(move |col| CellCoord::new(row, col)))
    }

    /// Handles in the 3x3 block around `position` (without self-substitution)
    pub fn nearby(&self, position: Vec2) -> impl Iterator<Item = ParticleHandle> + '_ {
        let center = self.coordinate_of(position);
        let rows = center.row.saturating_sub(1)..=(center.row + 1).min(self.rows - 1);
        rows.flat_map(move |row| {
            let cols = center.col.saturating_sub(1)..=(center.col + 1).min(self.cols - 1);
            cols.flat_map(move |col| self.cell(CellCoord::new(row, col)).handles().iter().copied())
        })
    }
}
