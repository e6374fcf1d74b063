//! Brood Spawn
//!
//! Turns spawn areas and world-state gates into entity creation requests:
//! - Spawn areas (circle, rectangle) sampled for candidate points
//! - Condition gates (time of day, nearby player count and level, custom)
//! - Spawner lifecycle with respawn timing and overlap avoidance
//! - Zones that own the spatial index and tick spawners in a stable order

pub mod area;
pub mod conditions;
mod error;
pub mod spawner;
pub mod zone;

pub use area::{AreaConfig, CircularArea, RectangularArea, SpacingRule, SpacingRuleDef, SpawnArea};
pub use conditions::{
    check_conditions, evaluate_gates, CustomCondition, GateFailure, LevelRange, PredicateError,
    SpawnConditions, SpawnerView, TimeWindow, WorldView,
};
pub use error::SpawnConfigError;
pub use spawner::{
    DeferReason, SpawnAttemptResult, SpawnContext, Spawner, SpawnerBuilder, SpawnerConfig,
    SpawnerId, SpawnerState,
};
pub use zone::{SpawnReport, Zone};
