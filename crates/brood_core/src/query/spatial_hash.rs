//! Spatial hash grid for position-based queries.
//!
//! A uniform planar grid: items are bucketed by `(floor(x / cell), floor(z / cell))`
//! and range queries only visit the cells that can hold a hit. Height is not
//! bucketed but does count in the distance test.

use crate::entity::{EntityHandle, TrackedEntity};
use crate::math::Position;
use std::collections::HashMap;
use std::hash::Hash;
use thiserror::Error;

/// Something with a stable identity and a position.
pub trait Spatial {
    type Id: Copy + Eq + Hash;

    fn id(&self) -> Self::Id;
    fn position(&self) -> Position;
}

impl Spatial for TrackedEntity {
    type Id = EntityHandle;

    fn id(&self) -> EntityHandle {
        self.handle
    }

    fn position(&self) -> Position {
        self.position
    }
}

/// Grid cell coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellKey {
    pub x: i64,
    pub z: i64,
}

impl CellKey {
    pub const fn new(x: i64, z: i64) -> Self {
        Self { x, z }
    }

    fn offset(self, dx: i64, dz: i64) -> Option<CellKey> {
        Some(CellKey::new(self.x.checked_add(dx)?, self.z.checked_add(dz)?))
    }
}

#[derive(Debug, Error, Clone, PartialEq)]
pub enum GridError {
    #[error("cell size must be positive and finite, got {cell_size}")]
    InvalidCellSize { cell_size: f32 },
}

/// Uniform grid index.
///
/// Each item lives in exactly one cell: the one matching the position it had
/// when it was added. The grid does not follow items around; callers remove
/// an item before changing its position (or use [`SpatialGrid::relocate`]).
#[derive(Debug, Clone)]
pub struct SpatialGrid<T: Spatial> {
    cell_size: f32,
    /// Map from cell coordinates to the items in that cell. Cells are created
    /// on first insert and dropped when they empty.
    cells: HashMap<CellKey, Vec<T>>,
}

impl<T: Spatial> SpatialGrid<T> {
    /// Create an empty grid. Pick a cell size close to the usual query range.
    pub fn new(cell_size: f32) -> Result<Self, GridError> {
        if !(cell_size.is_finite() && cell_size > 0.0) {
            return Err(GridError::InvalidCellSize { cell_size });
        }
        Ok(Self {
            cell_size,
            cells: HashMap::new(),
        })
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Convert a position to a cell coordinate.
    pub fn cell_of(&self, position: Position) -> CellKey {
        CellKey::new(
            (position.x / self.cell_size).floor() as i64,
            (position.z / self.cell_size).floor() as i64,
        )
    }

    /// Insert an item into the cell for its current position.
    ///
    /// An item with the same id already in that cell is replaced and returned.
    pub fn add(&mut self, item: T) -> Option<T> {
        let cell = self.cell_of(item.position());
        let entries = self.cells.entry(cell).or_default();
        let id = item.id();
        match entries.iter_mut().find(|entry| entry.id() == id) {
            Some(existing) => Some(std::mem::replace(existing, item)),
            None => {
                entries.push(item);
                None
            }
        }
    }

    /// Remove an item, looking it up in the cell for its current position.
    ///
    /// Returns `None` if the item is not in that cell, which is what happens
    /// when the position changed since `add`.
    pub fn remove(&mut self, item: &T) -> Option<T> {
        let cell = self.cell_of(item.position());
        let entries = self.cells.get_mut(&cell)?;
        let id = item.id();
        let index = entries.iter().position(|entry| entry.id() == id)?;
        let removed = entries.remove(index);
        if entries.is_empty() {
            self.cells.remove(&cell);
        }
        Some(removed)
    }

    /// Remove `old` and add `new`. Returns whether `old` was found.
    pub fn relocate(&mut self, old: &T, new: T) -> bool {
        let found = self.remove(old).is_some();
        self.add(new);
        found
    }

    /// All items within `range` (3D Euclidean, inclusive) of `position`.
    ///
    /// Order is unspecified. A negative or NaN range matches nothing.
    pub fn get_in_range(&self, position: Position, range: f32) -> Vec<&T> {
        if !(range >= 0.0) || !position.is_finite() {
            return Vec::new();
        }

        let within = |item: &&T| item.position().distance(position) <= range;

        let reach = (range / self.cell_size).ceil();
        let span = 2.0 * reach as f64 + 1.0;
        if span * span >= self.cells.len() as f64 {
            // Neighbourhood is bigger than the grid; scanning live cells is cheaper.
            return self.cells.values().flatten().filter(within).collect();
        }

        let reach = reach as i64;
        let center = self.cell_of(position);
        let mut result = Vec::new();
        for dz in -reach..=reach {
            for dx in -reach..=reach {
                let Some(cell) = center.offset(dx, dz) else {
                    continue;
                };
                if let Some(entries) = self.cells.get(&cell) {
                    result.extend(entries.iter().filter(within));
                }
            }
        }
        result
    }

    /// Whether an item with this id is registered at its current position.
    pub fn contains(&self, item: &T) -> bool {
        let id = item.id();
        self.cells
            .get(&self.cell_of(item.position()))
            .is_some_and(|entries| entries.iter().any(|entry| entry.id() == id))
    }

    /// Drop all cells.
    pub fn clear(&mut self) {
        self.cells.clear();
    }

    /// Total item count, summed over cells.
    pub fn len(&self) -> usize {
        self.cells.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// Number of live (non-empty) cells.
    pub fn cell_count(&self) -> usize {
        self.cells.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.cells.values().flatten()
    }
}
