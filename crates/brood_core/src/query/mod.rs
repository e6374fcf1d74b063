//! Range queries over tracked entities.
//!
//! The spawn gates only need "who is near this point"; [`RangeQuery`] is that
//! seam. [`SpatialGrid`] is the engine's own provider, but a host with its
//! own broad phase can implement the trait directly.

mod spatial_hash;

pub use spatial_hash::{CellKey, GridError, Spatial, SpatialGrid};

use crate::entity::TrackedEntity;
use crate::math::Position;

/// All tracked entities within `radius` (3D Euclidean, inclusive) of a point.
pub trait RangeQuery {
    fn entities_near(&self, position: Position, radius: f32) -> Vec<TrackedEntity>;

    /// Number of players within `radius`.
    fn players_near(&self, position: Position, radius: f32) -> usize {
        self.entities_near(position, radius)
            .iter()
            .filter(|entity| entity.kind.is_player())
            .count()
    }
}

impl RangeQuery for SpatialGrid<TrackedEntity> {
    fn entities_near(&self, position: Position, radius: f32) -> Vec<TrackedEntity> {
        self.get_in_range(position, radius)
            .into_iter()
            .cloned()
            .collect()
    }

    fn players_near(&self, position: Position, radius: f32) -> usize {
        self.get_in_range(position, radius)
            .into_iter()
            .filter(|entity| entity.kind.is_player())
            .count()
    }
}
