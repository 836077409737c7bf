//! Uniform-grid broad phase
//!
//! Rebuilt from scratch every substep over airborne balls only. Cell vectors
//! are cleared, not dropped, so steady-state rebuilds do not allocate.

use std::collections::HashMap;

use glam::{IVec2, Vec2};

/// Above this many cached cells a clear drops the cache instead of reusing it
const MAX_RETAINED_CELLS: usize = 8192;

/// Grid of body indices keyed by integer cell coordinate
#[derive(Debug, Clone, Default)]
pub struct SpatialHash {
    cell_size: f32,
    cells: HashMap<IVec2, Vec<usize>>,
}

impl SpatialHash {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size: cell_size.max(f32::EPSILON),
            cells: HashMap::new(),
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Cell containing `pos`
    #[inline]
    pub fn cell_of(&self, pos: Vec2) -> IVec2 {
        (pos / self.cell_size).floor().as_ivec2()
    }

    /// Empty every cell and adopt a new cell size
    pub fn clear(&mut self, cell_size: f32) {
        self.cell_size = cell_size.max(f32::EPSILON);
        if self.cells.len() > MAX_RETAINED_CELLS {
            self.cells.clear();
            return;
        }
        for members in self.cells.values_mut() {
            members.clear();
        }
    }

    /// Rebuild from `(index, position)` pairs
    pub fn rebuild<I>(&mut self, cell_size: f32, entries: I)
    where
        I: IntoIterator<Item = (usize, Vec2)>,
    {
        self.clear(cell_size);
        for (index, pos) in entries {
            self.insert(index, pos);
        }
    }

    pub fn insert(&mut self, index: usize, pos: Vec2) {
        let cell = self.cell_of(pos);
        self.cells.entry(cell).or_default().push(index);
    }

    /// Number of indexed entries
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.values().all(Vec::is_empty)
    }

    /// Every index stored in the 3x3 block of cells around `cell`
    pub fn neighbors(&self, cell: IVec2) -> impl Iterator<Item = usize> + '_ {
        (-1..=1)
            .flat_map(move |dy| (-1..=1).map(move |dx| cell + IVec2::new(dx, dy)))
            .filter_map(|c| self.cells.get(&c))
            .flat_map(|members| members.iter().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_neighbors_cover_adjacent_cells() {
        let mut grid = SpatialHash::new(21.0);
        grid.insert(0, Vec2::new(10.0, 10.0));
        grid.insert(1, Vec2::new(30.0, 10.0)); // next cell right
        grid.insert(2, Vec2::new(-5.0, -5.0)); // diagonal, negative cell
        grid.insert(3, Vec2::new(100.0, 100.0)); // far away

        let mut found: Vec<usize> = grid.neighbors(grid.cell_of(Vec2::new(10.0, 10.0))).collect();
        found.sort_unstable();
        assert_eq!(found, vec![0, 1, 2]);
    }

    #[test]
    fn test_rebuild_reuses_cells_and_clears() {
        let mut grid = SpatialHash::new(21.0);
        grid.rebuild(21.0, [(0, Vec2::new(5.0, 5.0)), (1, Vec2::new(6.0, 6.0))]);
        assert_eq!(grid.len(), 2);
        grid.rebuild(21.0, std::iter::empty());
        assert!(grid.is_empty());
        assert_eq!(grid.neighbors(IVec2::ZERO).count(), 0);
    }

    #[test]
    fn test_neighbor_order_is_stable() {
        let mut grid = SpatialHash::new(21.0);
        for (i, x) in [3.0, 25.0, 8.0, -12.0, 30.0].into_iter().enumerate() {
            grid.insert(i, Vec2::new(x, 4.0));
        }
        let first: Vec<usize> = grid.neighbors(IVec2::ZERO).collect();
        let second: Vec<usize> = grid.neighbors(IVec2::ZERO).collect();
        assert_eq!(first, second);
        // Row-major over cells, insertion order within a cell
        assert_eq!(first, vec![3, 0, 2, 1, 4]);
    }
}
