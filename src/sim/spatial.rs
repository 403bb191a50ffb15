//! Spatial hash grid for neighbor queries
//!
//! Divides the plane into square cells keyed by a packed `(cell_x, cell_y)`
//! integer. A query returns every other entry in the query cell and its 8
//! neighbors, which is a superset of the agents within one cell size; callers
//! re-filter by squared distance where an exact radius matters.

use hashbrown::HashMap;
use rustc_hash::FxBuildHasher;

use crate::sim::constants::flocking::CELL_SIZE;
use crate::util::vec2::Vec2;

/// Initial capacity for grid cells (number of expected non-empty cells)
const GRID_INITIAL_CAPACITY: usize = 512;

/// Initial capacity for the index list within a cell
const CELL_INITIAL_CAPACITY: usize = 8;

/// Packed cell key: high 32 bits cell x, low 32 bits cell y
pub type CellKey = u64;

#[inline]
pub fn pack_cell(cx: i32, cy: i32) -> CellKey {
    ((cx as u32 as u64) << 32) | (cy as u32 as u64)
}

/// Spatial hash grid over agent indices
#[derive(Debug, Clone)]
pub struct SpatialHashGrid {
    cell_size: f32,
    inv_cell_size: f32,
    cells: HashMap<CellKey, Vec<usize>, FxBuildHasher>,
    /// 3x3 window around the query cell
    neighbor_offsets: [(i32, i32); 9],
    len: usize,
}

impl SpatialHashGrid {
    pub fn new(cell_size: f32) -> Self {
        Self {
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            cells: HashMap::with_capacity_and_hasher(GRID_INITIAL_CAPACITY, FxBuildHasher),
            neighbor_offsets: [
                (-1, -1), (0, -1), (1, -1),
                (-1,  0), (0,  0), (1,  0),
                (-1,  1), (0,  1), (1,  1),
            ],
            len: 0,
        }
    }

    /// Build a fresh grid from `(index, position)` pairs
    pub fn build(cell_size: f32, items: impl IntoIterator<Item = (usize, Vec2)>) -> Self {
        let mut grid = Self::new(cell_size);
        grid.rebuild(items);
        grid
    }

    /// Discard every cell and insert the given items
    pub fn rebuild(&mut self, items: impl IntoIterator<Item = (usize, Vec2)>) {
        self.cells.clear();
        self.len = 0;
        for (index, position) in items {
            self.insert(index, position);
        }
    }

    #[inline]
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Cell coordinates of a world position
    #[inline]
    pub fn cell_of(&self, position: Vec2) -> (i32, i32) {
        (
            (position.x * self.inv_cell_size).floor() as i32,
            (position.y * self.inv_cell_size).floor() as i32,
        )
    }

    #[inline]
    pub fn insert(&mut self, index: usize, position: Vec2) {
        let (cx, cy) = self.cell_of(position);
        self.cells
            .entry(pack_cell(cx, cy))
            .or_insert_with(|| Vec::with_capacity(CELL_INITIAL_CAPACITY))
            .push(index);
        self.len += 1;
    }

    /// Indices in the 3x3 cell window around `position`, excluding `index`
    /// (the querying agent)
    pub fn neighbors_of(&self, index: usize, position: Vec2) -> impl Iterator<Item = usize> + '_ {
        let (cx, cy) = self.cell_of(position);

        self.neighbor_offsets
            .iter()
            .flat_map(move |&(dx, dy)| {
                let key = pack_cell(cx.wrapping_add(dx), cy.wrapping_add(dy));
                self.cells.get(&key).into_iter().flat_map(|cell| cell.iter().copied())
            })
            .filter(move |&other| other != index)
    }

    pub fn stats(&self) -> SpatialGridStats {
        SpatialGridStats {
            non_empty_cells: self.cells.values().filter(|c| !c.is_empty()).count(),
            total_entries: self.len,
            max_per_cell: self.cells.values().map(|c| c.len()).max().unwrap_or(0),
        }
    }
}

impl Default for SpatialHashGrid {
    fn default() -> Self {
        Self::new(CELL_SIZE)
    }
}

#[derive(Debug, Clone)]
pub struct SpatialGridStats {
    pub non_empty_cells: usize,
    pub total_entries: usize,
    pub max_per_cell: usize,
}
