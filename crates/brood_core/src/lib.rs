//! Brood Core
//!
//! Contains the shared simulation building blocks:
//! - Deterministic math and seeded randomness
//! - Simulation time and clock sources
//! - Entity handles and the host-world seams
//! - Spatial grid index for range queries

pub mod entity;
pub mod math;
pub mod query;
pub mod time;

pub use glam;

pub use entity::{
    CreateEntityError, EntityFactory, EntityHandle, EntityKind, NoStats, PlayerStatsLookup,
    SpawnTemplate, TrackedEntity,
};
pub use query::{GridError, RangeQuery, Spatial, SpatialGrid};
pub use time::{ClockChain, ClockSource, FixedClock, GameClock, SimulationTime, WallClock};

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
