//! In-memory demo world standing in for a game server
//!
//! Players and spawned entities live in separate stores so the zone can read
//! player stats while creating entities in the same tick.

use brood_core::math::Position;
use brood_core::{
    CreateEntityError, EntityFactory, EntityHandle, EntityKind, PlayerStatsLookup, SpawnTemplate,
};
use rand::{Rng, RngCore};
use std::collections::BTreeMap;

/// Spawned handles start here so they never collide with player handles.
const POPULATION_HANDLE_BASE: u64 = 1 << 32;

#[derive(Debug, Clone)]
pub struct DemoEntity {
    pub name: String,
    pub kind: EntityKind,
    pub position: Position,
    pub level: Option<u32>,
}

/// Connected players and their combat levels.
#[derive(Debug, Default)]
pub struct Roster {
    next_id: u64,
    players: BTreeMap<EntityHandle, DemoEntity>,
}

impl Roster {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn join(&mut self, name: &str, position: Position, level: Option<u32>) -> EntityHandle {
        self.next_id += 1;
        let handle = EntityHandle::from_raw(self.next_id);
        self.players.insert(
            handle,
            DemoEntity {
                name: name.to_string(),
                kind: EntityKind::Player,
                position,
                level,
            },
        );
        handle
    }

    pub fn len(&self) -> usize {
        self.players.len()
    }
}

impl PlayerStatsLookup for Roster {
    fn combat_level(&self, handle: EntityHandle) -> Option<u32> {
        self.players.get(&handle).and_then(|player| player.level)
    }
}

/// Everything the spawners created that is still alive.
#[derive(Debug, Default)]
pub struct Population {
    next_id: u64,
    entities: BTreeMap<EntityHandle, DemoEntity>,
}

impl Population {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, handle: EntityHandle) -> Option<&DemoEntity> {
        self.entities.get(&handle)
    }

    pub fn remove(&mut self, handle: EntityHandle) -> Option<DemoEntity> {
        self.entities.remove(&handle)
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Entities that die this tick, each with probability `chance`.
    /// Iteration is in handle order, so a seeded rng gives the same deaths
    /// every run.
    pub fn roll_deaths(&self, rng: &mut dyn RngCore, chance: f64) -> Vec<EntityHandle> {
        let chance = if chance.is_nan() { 0.0 } else { chance.clamp(0.0, 1.0) };
        self.entities
            .keys()
            .filter(|_| rng.random_bool(chance))
            .copied()
            .collect()
    }
}

impl EntityFactory for Population {
    fn create_entity(
        &mut self,
        kind: &EntityKind,
        position: Position,
        template: &SpawnTemplate,
    ) -> Result<EntityHandle, CreateEntityError> {
        if kind.is_player() {
            return Err(CreateEntityError::Rejected(format!(
                "'{}' is a player archetype",
                template.name
            )));
        }
        self.next_id += 1;
        let handle = EntityHandle::from_raw(POPULATION_HANDLE_BASE + self.next_id);
        self.entities.insert(
            handle,
            DemoEntity {
                name: template.name.clone(),
                kind: kind.clone(),
                position,
                level: template.level,
            },
        );
        Ok(handle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use brood_core::math::deterministic_rng;

    #[test]
    fn creates_mobs_and_refuses_players() {
        let mut population = Population::new();
        let wolf = SpawnTemplate::new(EntityKind::Mob, "tundra_wolf").with_level(4);
        let handle = population
            .create_entity(&EntityKind::Mob, Position::ONE, &wolf)
            .unwrap();
        assert_eq!(population.get(handle).unwrap().name, "tundra_wolf");
        assert_eq!(population.get(handle).unwrap().level, Some(4));

        let ghost = SpawnTemplate::new(EntityKind::Player, "ghost");
        assert!(population
            .create_entity(&EntityKind::Player, Position::ZERO, &ghost)
            .is_err());
        assert_eq!(population.len(), 1);
    }

    #[test]
    fn handles_do_not_collide() {
        let mut roster = Roster::new();
        let mut population = Population::new();
        let player = roster.join("ada", Position::ZERO, Some(12));
        let crab = SpawnTemplate::new(EntityKind::Mob, "beach_crab");
        let mob = population
            .create_entity(&EntityKind::Mob, Position::ZERO, &crab)
            .unwrap();
        assert_ne!(player, mob);
        assert_eq!(roster.combat_level(player), Some(12));
        assert_eq!(roster.combat_level(mob), None);
    }

    #[test]
    fn death_chance_extremes() {
        let mut population = Population::new();
        let crab = SpawnTemplate::new(EntityKind::Mob, "beach_crab");
        let mob = population
            .create_entity(&EntityKind::Mob, Position::ZERO, &crab)
            .unwrap();
        let mut rng = deterministic_rng(1);
        assert_eq!(population.roll_deaths(&mut rng, 1.0), vec![mob]);
        assert!(population.roll_deaths(&mut rng, 0.0).is_empty());
        assert!(population.roll_deaths(&mut rng, f64::NAN).is_empty());
    }
}
