//! Zone: one spatial index plus the spawners that feed it.
//!
//! The zone is the per-region driver. It owns the grid, hands it to each
//! spawner as the range query and registration target, and evaluates the
//! spawners once per tick in registration order. Host entities that are not
//! spawned here (players, mostly) are fed in through [`Zone::track`].

use crate::spawner::{SpawnAttemptResult, SpawnContext, Spawner, SpawnerBuilder, SpawnerConfig, SpawnerId};
use crate::SpawnConfigError;
use brood_core::math::Position;
use brood_core::{
    ClockSource, EntityFactory, EntityHandle, GridError, PlayerStatsLookup, SimulationTime,
    SpatialGrid, TrackedEntity,
};
use brood_metrics::Counter;
use rand::RngCore;
use std::collections::HashMap;
use std::time::Duration;

/// What one spawner did on one tick.
#[derive(Debug, Clone, PartialEq)]
pub struct SpawnReport {
    pub spawner: SpawnerId,
    pub result: SpawnAttemptResult,
}

pub struct Zone {
    name: String,
    index: SpatialGrid<TrackedEntity>,
    spawners: Vec<Spawner>,
    /// Spawned entity -> position of its spawner in `spawners`.
    owners: HashMap<EntityHandle, usize>,
    /// Host entities tracked on the host's behalf, by handle.
    external: HashMap<EntityHandle, TrackedEntity>,
    time: SimulationTime,
    outcomes: Counter,
}

impl Zone {
    pub fn new(
        name: impl Into<String>,
        cell_size: f32,
        tick_duration: Duration,
    ) -> Result<Self, GridError> {
        Ok(Self {
            name: name.into(),
            index: SpatialGrid::new(cell_size)?,
            spawners: Vec::new(),
            owners: HashMap::new(),
            external: HashMap::new(),
            time: SimulationTime::with_tick_duration(tick_duration),
            outcomes: Counter::new(),
        })
    }

    /// Id the next registered spawner will receive.
    pub fn next_spawner_id(&self) -> SpawnerId {
        SpawnerId(self.spawners.len() as u32)
    }

    /// Register a spawner. The zone assigns the id from registration order,
    /// overriding whatever id the builder was created with.
    pub fn add_spawner(&mut self, builder: SpawnerBuilder) -> Result<SpawnerId, SpawnConfigError> {
        let id = self.next_spawner_id();
        let spawner = builder.assign_id(id).build()?;
        tracing::debug!(zone = %self.name, spawner = spawner.name(), %id, "spawner registered");
        self.spawners.push(spawner);
        Ok(id)
    }

    pub fn add_spawner_config(&mut self, config: SpawnerConfig) -> Result<SpawnerId, SpawnConfigError> {
        let id = self.next_spawner_id();
        let spawner = Spawner::from_config(id, config)?;
        tracing::debug!(zone = %self.name, spawner = spawner.name(), %id, "spawner registered");
        self.spawners.push(spawner);
        Ok(id)
    }

    /// Start tracking a host entity (typically a player).
    pub fn track(&mut self, entity: TrackedEntity) {
        let handle = entity.handle;
        if let Some(previous) = self.external.insert(handle, entity.clone()) {
            self.index.remove(&previous);
        }
        self.index.add(entity);
    }

    pub fn untrack(&mut self, handle: EntityHandle) -> Option<TrackedEntity> {
        let entity = self.external.remove(&handle)?;
        self.index.remove(&entity);
        Some(entity)
    }

    /// Update the position of a tracked or spawned entity.
    ///
    /// Returns false for handles the zone does not know.
    pub fn move_entity(&mut self, handle: EntityHandle, position: Position) -> bool {
        let previous = if let Some(entity) = self.external.get_mut(&handle) {
            let previous = entity.clone();
            entity.position = position;
            previous
        } else if let Some(&owner) = self.owners.get(&handle) {
            match self.spawners[owner].record_move(handle, position) {
                Some(previous) => previous,
                None => return false,
            }
        } else {
            return false;
        };

        let moved = previous.moved_to(position);
        self.index.relocate(&previous, moved)
    }

    /// A spawned entity died or was removed by the host.
    ///
    /// Returns the owning spawner, or `None` for handles no spawner here
    /// created.
    pub fn despawn(&mut self, handle: EntityHandle) -> Option<SpawnerId> {
        let owner = self.owners.remove(&handle)?;
        let spawner = &mut self.spawners[owner];
        let entity = spawner.notify_despawned(handle, self.time.total_time())?;
        self.index.remove(&entity);
        tracing::debug!(zone = %self.name, spawner = spawner.name(), entity = %handle, "despawned");
        Some(spawner.id())
    }

    /// Advance simulation time by one tick and evaluate every spawner once,
    /// in registration order.
    pub fn tick(
        &mut self,
        clock: &dyn ClockSource,
        stats: &dyn PlayerStatsLookup,
        factory: &mut dyn EntityFactory,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnReport> {
        self.time.advance_tick();
        let now = self.time.total_time();

        let mut reports = Vec::with_capacity(self.spawners.len());
        for (slot, spawner) in self.spawners.iter_mut().enumerate() {
            let mut ctx = SpawnContext {
                index: &mut self.index,
                clock,
                stats,
                factory: &mut *factory,
                rng: &mut *rng,
                now,
            };
            let result = spawner.evaluate(&mut ctx);
            if let Some(handle) = result.spawned() {
                self.owners.insert(handle, slot);
            }
            brood_metrics::metrics! {
                self.outcomes.increment(result.label(), 1);
            }
            reports.push(SpawnReport {
                spawner: spawner.id(),
                result,
            });
        }

        tracing::trace!(
            zone = %self.name,
            tick = self.time.tick_count(),
            tracked = self.index.len(),
            "zone tick"
        );
        reports
    }

    /// Tear the zone down. Spawned entities are detached, not destroyed; the
    /// host decides what happens to the returned handles.
    pub fn unload(mut self) -> Vec<EntityHandle> {
        let handles: Vec<EntityHandle> = self
            .spawners
            .iter_mut()
            .flat_map(|spawner| spawner.detach_all())
            .map(|entity| entity.handle)
            .collect();
        tracing::info!(zone = %self.name, detached = handles.len(), "zone unloaded");
        handles
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn spawner(&self, id: SpawnerId) -> Option<&Spawner> {
        self.spawners.get(id.0 as usize)
    }

    /// Owner of a spawned entity.
    pub fn spawner_for(&self, handle: EntityHandle) -> Option<&Spawner> {
        self.owners.get(&handle).map(|&slot| &self.spawners[slot])
    }

    pub fn spawners(&self) -> &[Spawner] {
        &self.spawners
    }

    pub fn index(&self) -> &SpatialGrid<TrackedEntity> {
        &self.index
    }

    pub fn time(&self) -> &SimulationTime {
        &self.time
    }

    pub fn outcomes(&self) -> &Counter {
        &self.outcomes
    }
}
