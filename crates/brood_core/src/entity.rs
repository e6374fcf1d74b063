//! Entity handles and the host-world seams
//!
//! The engine never owns entities. It refers to them through opaque handles
//! issued by the host and reaches back into the host only through the small
//! traits below.

use crate::math::Position;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Opaque identity of a host entity.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityHandle(u64);

impl EntityHandle {
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub const fn id(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Coarse classification the gates care about.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Player,
    Mob,
    Resource,
    Other(String),
}

impl EntityKind {
    pub fn is_player(&self) -> bool {
        matches!(self, EntityKind::Player)
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityKind::Player => f.write_str("player"),
            EntityKind::Mob => f.write_str("mob"),
            EntityKind::Resource => f.write_str("resource"),
            EntityKind::Other(name) => f.write_str(name),
        }
    }
}

/// What the spatial index stores: a handle, its kind and the position it
/// was registered at. No game state lives here.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedEntity {
    pub handle: EntityHandle,
    pub kind: EntityKind,
    pub position: Position,
}

impl TrackedEntity {
    pub fn new(handle: EntityHandle, kind: EntityKind, position: Position) -> Self {
        Self {
            handle,
            kind,
            position,
        }
    }

    /// Same entity, new position. Use with `SpatialGrid::relocate`.
    pub fn moved_to(&self, position: Position) -> Self {
        Self {
            position,
            ..self.clone()
        }
    }
}

/// Configuration handed to the host when a spawner creates an entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnTemplate {
    pub kind: EntityKind,
    /// Host-side archetype name, e.g. `"tundra_wolf"`.
    pub name: String,
    #[serde(default)]
    pub level: Option<u32>,
    /// Loot table id, resolved through the registry on every roll.
    #[serde(default)]
    pub loot_table: Option<String>,
}

impl SpawnTemplate {
    pub fn new(kind: EntityKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            level: None,
            loot_table: None,
        }
    }

    pub fn with_level(mut self, level: u32) -> Self {
        self.level = Some(level);
        self
    }

    pub fn with_loot_table(mut self, id: impl Into<String>) -> Self {
        self.loot_table = Some(id.into());
        self
    }
}

/// Host refused to create an entity.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CreateEntityError {
    #[error("entity archetype '{0}' is unknown to the host")]
    UnknownArchetype(String),

    #[error("host rejected entity creation: {0}")]
    Rejected(String),
}

/// Entity creation, implemented by the host world.
pub trait EntityFactory {
    fn create_entity(
        &mut self,
        kind: &EntityKind,
        position: Position,
        template: &SpawnTemplate,
    ) -> Result<EntityHandle, CreateEntityError>;
}

/// Read access to player stats. A missing stat is reported as `None` and
/// treated as level 0 by callers.
pub trait PlayerStatsLookup {
    fn combat_level(&self, handle: EntityHandle) -> Option<u32>;
}

/// Stats lookup for hosts without a stat system.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoStats;

impl PlayerStatsLookup for NoStats {
    fn combat_level(&self, _handle: EntityHandle) -> Option<u32> {
        None
    }
}

impl<F> PlayerStatsLookup for F
where
    F: Fn(EntityHandle) -> Option<u32>,
{
    fn combat_level(&self, handle: EntityHandle) -> Option<u32> {
        self(handle)
    }
}
