//! Per-player spatial partition.
//!
//! Each player owns a fixed `NUM_PARTITIONS x NUM_PARTITIONS` grid over the
//! field; a cell holds the indices of that player's own segments whose fat
//! bounding box touches it. There is no global index — cross-player queries
//! simply iterate each player's grid in turn, which is cheap at the small
//! player counts this arena targets and makes a round reset free (the grid
//! starts empty again rather than needing to be rebuilt from a shared
//! structure).

use shared::{fat_aabb, Aabb, Segment, ASPECT_RATIO, NUM_PARTITIONS};
use std::collections::HashSet;

#[derive(Debug)]
pub struct Partition {
    cells: Vec<HashSet<usize>>,
}

impl Partition {
    pub fn new() -> Self {
        Self {
            cells: (0..NUM_PARTITIONS * NUM_PARTITIONS).map(|_| HashSet::new()).collect(),
        }
    }

    pub fn clear(&mut self) {
        for cell in &mut self.cells {
            cell.clear();
        }
    }

    fn cell_width() -> f64 {
        (2.0 * ASPECT_RATIO) / NUM_PARTITIONS as f64
    }

    fn cell_height() -> f64 {
        2.0 / NUM_PARTITIONS as f64
    }

    fn clamp_index(value: i64) -> usize {
        value.clamp(0, NUM_PARTITIONS as i64 - 1) as usize
    }

    fn column_for_x(x: f64) -> usize {
        Self::clamp_index(((x + ASPECT_RATIO) / Self::cell_width()).floor() as i64)
    }

    fn row_for_y(y: f64) -> usize {
        Self::clamp_index(((y + 1.0) / Self::cell_height()).floor() as i64)
    }

    fn cell_index(col: usize, row: usize) -> usize {
        row * NUM_PARTITIONS + col
    }

    /// Cells whose footprint overlaps `aabb`.
    fn cells_for_aabb(aabb: &Aabb) -> Vec<usize> {
        let col_min = Self::column_for_x(aabb.min_x);
        let col_max = Self::column_for_x(aabb.max_x);
        let row_min = Self::row_for_y(aabb.min_y);
        let row_max = Self::row_for_y(aabb.max_y);

        let mut cells = Vec::new();
        for row in row_min..=row_max {
            for col in col_min..=col_max {
                cells.push(Self::cell_index(col, row));
            }
        }
        cells
    }

    /// Inserts `segment_index` into every cell `segment`'s fat bounding box
    /// touches.
    pub fn insert(&mut self, segment_index: usize, segment: &Segment) {
        let aabb = fat_aabb(segment);
        for cell in Self::cells_for_aabb(&aabb) {
            self.cells[cell].insert(segment_index);
        }
    }

    /// Union of segment indices across every cell `segment`'s fat bounding
    /// box touches. May include false positives (segments sharing a cell
    /// without actually overlapping `segment`'s box); callers re-test with
    /// `line_to_line` before treating a hit as real.
    pub fn candidates_touching(&self, segment: &Segment) -> HashSet<usize> {
        let aabb = fat_aabb(segment);
        let mut out = HashSet::new();
        for cell in Self::cells_for_aabb(&aabb) {
            out.extend(self.cells[cell].iter().copied());
        }
        out
    }
}

impl Default for Partition {
    fn default() -> Self {
        Self::new()
    }
}
