//! Uniform bucket grid for neighbor queries.
//!
//! Rebuilt from scratch every tick: cleared, then repopulated with a
//! kinematic snapshot of each living agent. Queries return the 3×3 block of
//! cells around a point — an approximate candidate set bounded by cell size,
//! not an exact radius search. Any two agents within one cell size of each
//! other are guaranteed to see each other; anything beyond two cell sizes is
//! guaranteed absent. Callers do their own distance filtering.

use hecs::Entity;

use crate::components::Vec2;

/// Kinematic snapshot of one agent, captured at grid-rebuild time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GridEntry {
    pub entity: Entity,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Dense `cols × rows` bucket grid over the world rectangle.
#[derive(Debug, Clone)]
pub struct SpatialGrid {
    cell_size: f32,
    cols: usize,
    rows: usize,
    cells: Vec<Vec<GridEntry>>,
}

impl SpatialGrid {
    pub fn new(width: f32, height: f32, cell_size: f32) -> Self {
        let cols = (width / cell_size).ceil().max(1.0) as usize;
        let rows = (height / cell_size).ceil().max(1.0) as usize;
        Self {
            cell_size,
            cols,
            rows,
            cells: vec![Vec::new(); cols * rows],
        }
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Empty every bucket, keeping allocations for reuse next tick.
    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    /// Insert an agent snapshot. Out-of-bounds agents are silently dropped
    /// from spatial queries; they remain in the master population list.
    pub fn insert(&mut self, entry: GridEntry) {
        let col = (entry.position.x / self.cell_size).floor();
        let row = (entry.position.y / self.cell_size).floor();
        if col >= 0.0 && (col as usize) < self.cols && row >= 0.0 && (row as usize) < self.rows {
            let index = col as usize + row as usize * self.cols;
            self.cells[index].push(entry);
        }
    }

    /// All agents in the cell containing `position` and its 8 neighbors.
    pub fn query(&self, position: Vec2) -> Vec<GridEntry> {
        let mut nearby = Vec::new();
        let center_col = (position.x / self.cell_size).floor() as i64;
        let center_row = (position.y / self.cell_size).floor() as i64;

        for row in (center_row - 1)..=(center_row + 1) {
            for col in (center_col - 1)..=(center_col + 1) {
                if col >= 0 && (col as usize) < self.cols && row >= 0 && (row as usize) < self.rows
                {
                    let index = col as usize + row as usize * self.cols;
                    nearby.extend_from_slice(&self.cells[index]);
                }
            }
        }
        nearby
    }
}
