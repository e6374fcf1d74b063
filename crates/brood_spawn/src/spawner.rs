//! Spawner lifecycle.
//!
//! A spawner ties an area, optional gates and an entity template together and
//! keeps the bookkeeping that decides when the next entity may appear:
//!
//! ```text
//! Idle -> Evaluating -> Spawning -> Active
//!   ^                                  |
//!   +---- entity despawned / died -----+
//! ```
//!
//! Each call to [`Spawner::evaluate`] makes at most one spawn attempt. Misses
//! (cooldown, failed gate, crowded candidate) are reported as
//! [`SpawnAttemptResult::Deferred`] and retried on a later tick.

use crate::area::{AreaConfig, SpawnArea};
use crate::conditions::{evaluate_gates, GateFailure, SpawnConditions, SpawnerView, WorldView};
use crate::SpawnConfigError;
use brood_core::math::Position;
use brood_core::{
    ClockSource, CreateEntityError, EntityFactory, EntityHandle, PlayerStatsLookup, SpatialGrid,
    SpawnTemplate, TrackedEntity,
};
use brood_loot::{LootDrop, LootRegistry};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Spawner identity, assigned in registration order by the owning zone.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpawnerId(pub u32);

impl fmt::Display for SpawnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spawner-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpawnerState {
    /// Below capacity, waiting for conditions or the respawn timer.
    Idle,
    /// Gates are being checked this tick.
    Evaluating,
    /// A candidate point is being validated.
    Spawning,
    /// Last attempt produced an entity, or the spawner is at capacity.
    Active,
}

/// Why a spawner skipped this tick.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum DeferReason {
    #[error("respawn timer has {remaining:?} left")]
    Cooldown { remaining: Duration },

    #[error("gate failed: {0}")]
    Conditions(GateFailure),

    #[error("candidate has {neighbours} entities within spacing")]
    Crowded { neighbours: usize },

    #[error("entity creation rejected: {0}")]
    CreationRejected(CreateEntityError),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpawnAttemptResult {
    /// At capacity; nothing to do.
    NoAction,
    Spawned(EntityHandle),
    Deferred(DeferReason),
}

impl SpawnAttemptResult {
    /// Short label for counters and logs.
    pub fn label(&self) -> &'static str {
        match self {
            SpawnAttemptResult::NoAction => "no_action",
            SpawnAttemptResult::Spawned(_) => "spawned",
            SpawnAttemptResult::Deferred(DeferReason::Cooldown { .. }) => "deferred_cooldown",
            SpawnAttemptResult::Deferred(DeferReason::Conditions(_)) => "deferred_conditions",
            SpawnAttemptResult::Deferred(DeferReason::Crowded { .. }) => "deferred_crowded",
            SpawnAttemptResult::Deferred(DeferReason::CreationRejected(_)) => "deferred_rejected",
        }
    }

    pub fn spawned(&self) -> Option<EntityHandle> {
        match self {
            SpawnAttemptResult::Spawned(handle) => Some(*handle),
            _ => None,
        }
    }
}

/// Everything a spawner needs from the world for one evaluation.
///
/// The index doubles as the range query for the player gates and is where
/// new entities get registered.
pub struct SpawnContext<'a> {
    pub index: &'a mut SpatialGrid<TrackedEntity>,
    pub clock: &'a dyn ClockSource,
    pub stats: &'a dyn PlayerStatsLookup,
    pub factory: &'a mut dyn EntityFactory,
    pub rng: &'a mut dyn RngCore,
    pub now: Duration,
}

fn one() -> usize {
    1
}

fn default_activation_range() -> f32 {
    32.0
}

/// Serialized form of a spawner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpawnerConfig {
    pub name: String,
    /// Defaults to the area's center.
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default = "default_activation_range")]
    pub activation_range: f32,
    pub area: AreaConfig,
    pub template: SpawnTemplate,
    #[serde(default)]
    pub conditions: Option<SpawnConditions>,
    #[serde(default = "one")]
    pub max_active: usize,
    #[serde(default)]
    pub respawn_seconds: f32,
}

/// Validating builder for [`Spawner`].
pub struct SpawnerBuilder {
    id: SpawnerId,
    name: String,
    area: Box<dyn SpawnArea>,
    template: SpawnTemplate,
    position: Option<Position>,
    activation_range: f32,
    conditions: Option<SpawnConditions>,
    max_active: usize,
    respawn_interval: Duration,
}

impl SpawnerBuilder {
    /// Replace the id the builder was created with; used by the owning zone.
    pub(crate) fn assign_id(mut self, id: SpawnerId) -> Self {
        self.id = id;
        self
    }

    pub fn position(mut self, position: Position) -> Self {
        self.position = Some(position);
        self
    }

    pub fn activation_range(mut self, range: f32) -> Self {
        self.activation_range = range;
        self
    }

    pub fn conditions(mut self, conditions: SpawnConditions) -> Self {
        self.conditions = Some(conditions);
        self
    }

    pub fn max_active(mut self, max_active: usize) -> Self {
        self.max_active = max_active;
        self
    }

    pub fn respawn_interval(mut self, interval: Duration) -> Self {
        self.respawn_interval = interval;
        self
    }

    pub fn build(self) -> Result<Spawner, SpawnConfigError> {
        if !(self.activation_range.is_finite() && self.activation_range >= 0.0) {
            return Err(SpawnConfigError::InvalidActivationRange {
                range: self.activation_range,
            });
        }
        if self.max_active == 0 {
            return Err(SpawnConfigError::ZeroMaxActive { name: self.name });
        }
        if let Some(conditions) = &self.conditions {
            conditions.validate()?;
        }

        Ok(Spawner {
            id: self.id,
            position: self.position.unwrap_or_else(|| self.area.center()),
            name: self.name,
            area: self.area,
            template: self.template,
            activation_range: self.activation_range,
            conditions: self.conditions,
            max_active: self.max_active,
            respawn_interval: self.respawn_interval,
            state: SpawnerState::Idle,
            active: Vec::new(),
            last_event: None,
        })
    }
}

/// A configured source of entities bound to an area.
pub struct Spawner {
    id: SpawnerId,
    name: String,
    position: Position,
    activation_range: f32,
    area: Box<dyn SpawnArea>,
    template: SpawnTemplate,
    conditions: Option<SpawnConditions>,
    max_active: usize,
    respawn_interval: Duration,
    state: SpawnerState,
    /// Entities this spawner created that are still alive, in spawn order.
    active: Vec<TrackedEntity>,
    /// Time of the latest spawn or despawn; the respawn timer runs from here.
    last_event: Option<Duration>,
}

impl Spawner {
    pub fn builder(
        id: SpawnerId,
        name: impl Into<String>,
        area: Box<dyn SpawnArea>,
        template: SpawnTemplate,
    ) -> SpawnerBuilder {
        SpawnerBuilder {
            id,
            name: name.into(),
            area,
            template,
            position: None,
            activation_range: default_activation_range(),
            conditions: None,
            max_active: 1,
            respawn_interval: Duration::ZERO,
        }
    }

    pub fn from_config(id: SpawnerId, config: SpawnerConfig) -> Result<Self, SpawnConfigError> {
        let respawn_interval = Duration::try_from_secs_f32(config.respawn_seconds).map_err(|_| {
            SpawnConfigError::InvalidRespawnInterval {
                seconds: config.respawn_seconds,
            }
        })?;

        let mut builder = Spawner::builder(id, config.name, config.area.build()?, config.template)
            .activation_range(config.activation_range)
            .max_active(config.max_active)
            .respawn_interval(respawn_interval);
        if let Some(position) = config.position {
            builder = builder.position(position);
        }
        if let Some(conditions) = config.conditions {
            builder = builder.conditions(conditions);
        }
        builder.build()
    }

    pub fn id(&self) -> SpawnerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn position(&self) -> Position {
        self.position
    }

    pub fn area(&self) -> &dyn SpawnArea {
        self.area.as_ref()
    }

    pub fn template(&self) -> &SpawnTemplate {
        &self.template
    }

    pub fn state(&self) -> SpawnerState {
        self.state
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn active_entities(&self) -> &[TrackedEntity] {
        &self.active
    }

    pub fn find(&self, handle: EntityHandle) -> Option<&TrackedEntity> {
        self.active.iter().find(|entity| entity.handle == handle)
    }

    pub fn is_full(&self) -> bool {
        self.active.len() >= self.max_active
    }

    pub fn view(&self) -> SpawnerView<'_> {
        SpawnerView {
            id: self.id,
            name: &self.name,
            position: self.position,
            activation_range: self.activation_range,
            active_count: self.active.len(),
            max_active: self.max_active,
        }
    }

    /// Time left before the next spawn is allowed, if any.
    pub fn cooldown_remaining(&self, now: Duration) -> Option<Duration> {
        let ready_at = self.last_event? + self.respawn_interval;
        (now < ready_at).then(|| ready_at - now)
    }

    /// Make at most one spawn attempt.
    pub fn evaluate(&mut self, ctx: &mut SpawnContext<'_>) -> SpawnAttemptResult {
        if self.is_full() {
            self.state = SpawnerState::Active;
            return SpawnAttemptResult::NoAction;
        }

        if let Some(remaining) = self.cooldown_remaining(ctx.now) {
            self.state = SpawnerState::Idle;
            return SpawnAttemptResult::Deferred(DeferReason::Cooldown { remaining });
        }

        self.state = SpawnerState::Evaluating;
        if let Some(conditions) = &self.conditions {
            let world = WorldView {
                clock: ctx.clock,
                entities: &*ctx.index,
                stats: ctx.stats,
                now: ctx.now,
            };
            if let Err(failure) = evaluate_gates(conditions, &self.view(), &world) {
                tracing::debug!(spawner = %self.name, %failure, "spawn gated");
                self.state = SpawnerState::Idle;
                return SpawnAttemptResult::Deferred(DeferReason::Conditions(failure));
            }
        }

        self.state = SpawnerState::Spawning;
        let candidate = self.area.random_position(&mut *ctx.rng);
        debug_assert!(self.area.contains(candidate));

        let spacing = self.area.spacing();
        if spacing.avoid_overlap() {
            let neighbours = ctx.index.get_in_range(candidate, spacing.min_spacing()).len();
            if neighbours > 0 {
                tracing::debug!(spawner = %self.name, neighbours, "spawn candidate crowded");
                self.state = SpawnerState::Idle;
                return SpawnAttemptResult::Deferred(DeferReason::Crowded { neighbours });
            }
        }

        match ctx
            .factory
            .create_entity(&self.template.kind, candidate, &self.template)
        {
            Ok(handle) => {
                let entity = TrackedEntity::new(handle, self.template.kind.clone(), candidate);
                ctx.index.add(entity.clone());
                self.active.push(entity);
                self.last_event = Some(ctx.now);
                self.state = SpawnerState::Active;
                tracing::debug!(
                    spawner = %self.name,
                    entity = %handle,
                    active = self.active.len(),
                    "spawned {}",
                    self.template.name
                );
                SpawnAttemptResult::Spawned(handle)
            }
            Err(error) => {
                tracing::warn!(spawner = %self.name, %error, "entity creation failed");
                self.state = SpawnerState::Idle;
                SpawnAttemptResult::Deferred(DeferReason::CreationRejected(error))
            }
        }
    }

    /// One of this spawner's entities died or despawned.
    ///
    /// Returns the forgotten record (so the caller can drop it from the
    /// index), or `None` if the handle is not tracked here. Restarts the
    /// respawn timer.
    pub fn notify_despawned(&mut self, handle: EntityHandle, now: Duration) -> Option<TrackedEntity> {
        let index = self.active.iter().position(|entity| entity.handle == handle)?;
        let entity = self.active.remove(index);
        self.last_event = Some(now);
        self.state = SpawnerState::Idle;
        Some(entity)
    }

    /// Keep the tracked position of a spawned entity in step with the world.
    /// Returns the previous record.
    pub fn record_move(&mut self, handle: EntityHandle, position: Position) -> Option<TrackedEntity> {
        let entity = self.active.iter_mut().find(|entity| entity.handle == handle)?;
        let previous = entity.clone();
        entity.position = position;
        Some(previous)
    }

    /// Forget every tracked entity without touching the entities themselves.
    pub fn detach_all(&mut self) -> Vec<TrackedEntity> {
        self.state = SpawnerState::Idle;
        std::mem::take(&mut self.active)
    }

    /// Roll this spawner's loot table, looked up by id on every call.
    pub fn roll_loot(&self, registry: &LootRegistry, rng: &mut dyn RngCore) -> Vec<LootDrop> {
        match &self.template.loot_table {
            Some(id) => registry.roll(id, rng),
            None => Vec::new(),
        }
    }
}

impl fmt::Debug for Spawner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Spawner")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("state", &self.state)
            .field("active", &self.active.len())
            .field("max_active", &self.max_active)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::area::{CircularArea, SpacingRule};
    use crate::conditions::{GateFailure, TimeWindow};
    use brood_core::math::deterministic_rng;
    use brood_core::{EntityKind, FixedClock, NoStats};
    use brood_loot::{LootEntry, LootTable};
    use rand::rngs::StdRng;

    #[derive(Default)]
    struct TestHost {
        next_id: u64,
        created: Vec<(EntityKind, Position)>,
        reject: bool,
    }

    impl EntityFactory for TestHost {
        fn create_entity(
            &mut self,
            kind: &EntityKind,
            position: Position,
            template: &SpawnTemplate,
        ) -> Result<EntityHandle, CreateEntityError> {
            if self.reject {
                return Err(CreateEntityError::UnknownArchetype(template.name.clone()));
            }
            self.next_id += 1;
            self.created.push((kind.clone(), position));
            Ok(EntityHandle::from_raw(1000 + self.next_id))
        }
    }

    struct Fixture {
        index: SpatialGrid<TrackedEntity>,
        host: TestHost,
        rng: StdRng,
        clock: FixedClock,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                index: SpatialGrid::new(8.0).unwrap(),
                host: TestHost::default(),
                rng: deterministic_rng(77),
                clock: FixedClock(12.0),
            }
        }

        fn evaluate(&mut self, spawner: &mut Spawner, now_secs: u64) -> SpawnAttemptResult {
            let mut ctx = SpawnContext {
                index: &mut self.index,
                clock: &self.clock,
                stats: &NoStats,
                factory: &mut self.host,
                rng: &mut self.rng,
                now: Duration::from_secs(now_secs),
            };
            spawner.evaluate(&mut ctx)
        }
    }

    fn wolf_spawner() -> SpawnerBuilder {
        let area = CircularArea::new(Position::ZERO, 10.0).unwrap();
        Spawner::builder(
            SpawnerId(0),
            "wolves",
            Box::new(area),
            SpawnTemplate::new(EntityKind::Mob, "tundra_wolf").with_loot_table("wolf"),
        )
    }

    #[test]
    fn spawns_until_capacity() {
        let mut fixture = Fixture::new();
        let mut spawner = wolf_spawner().max_active(2).build().unwrap();

        assert!(fixture.evaluate(&mut spawner, 0).spawned().is_some());
        assert_eq!(spawner.state(), SpawnerState::Active);
        assert!(fixture.evaluate(&mut spawner, 1).spawned().is_some());
        assert_eq!(fixture.evaluate(&mut spawner, 2), SpawnAttemptResult::NoAction);

        assert_eq!(spawner.active_count(), 2);
        assert_eq!(fixture.index.len(), 2);
        for (kind, position) in &fixture.host.created {
            assert_eq!(*kind, EntityKind::Mob);
            assert!(spawner.area().contains(*position));
        }
    }

    #[test]
    fn despawn_frees_slot_and_restarts_timer() {
        let mut fixture = Fixture::new();
        let mut spawner = wolf_spawner()
            .respawn_interval(Duration::from_secs(30))
            .build()
            .unwrap();

        let handle = fixture.evaluate(&mut spawner, 0).spawned().unwrap();
        assert_eq!(fixture.evaluate(&mut spawner, 40), SpawnAttemptResult::NoAction);

        let record = spawner.notify_despawned(handle, Duration::from_secs(50)).unwrap();
        assert_eq!(record.handle, handle);
        assert_eq!(spawner.state(), SpawnerState::Idle);
        assert!(spawner.notify_despawned(handle, Duration::from_secs(50)).is_none());

        assert_eq!(
            fixture.evaluate(&mut spawner, 60),
            SpawnAttemptResult::Deferred(DeferReason::Cooldown {
                remaining: Duration::from_secs(20)
            })
        );
        assert!(fixture.evaluate(&mut spawner, 80).spawned().is_some());
    }

    #[test]
    fn failed_gate_defers() {
        let mut fixture = Fixture::new();
        let mut spawner = wolf_spawner()
            .conditions(
                SpawnConditions::new().with_time_of_day(TimeWindow::new(22.0, 4.0).unwrap()),
            )
            .build()
            .unwrap();

        match fixture.evaluate(&mut spawner, 0) {
            SpawnAttemptResult::Deferred(DeferReason::Conditions(
                GateFailure::OutsideTimeWindow { .. },
            )) => {}
            other => panic!("expected time gate deferral, got {other:?}"),
        }
        assert_eq!(spawner.state(), SpawnerState::Idle);

        fixture.clock = FixedClock(23.0);
        assert!(fixture.evaluate(&mut spawner, 1).spawned().is_some());
    }

    #[test]
    fn crowded_candidate_defers_without_retry() {
        let mut fixture = Fixture::new();
        // Spacing larger than the whole area: any indexed entity inside blocks
        let area = CircularArea::new(Position::ZERO, 3.0)
            .unwrap()
            .with_spacing(SpacingRule::new(10.0, true).unwrap());
        let mut spawner = Spawner::builder(
            SpawnerId(1),
            "crabs",
            Box::new(area),
            SpawnTemplate::new(EntityKind::Mob, "beach_crab"),
        )
        .max_active(5)
        .build()
        .unwrap();

        assert!(fixture.evaluate(&mut spawner, 0).spawned().is_some());
        assert_eq!(
            fixture.evaluate(&mut spawner, 1),
            SpawnAttemptResult::Deferred(DeferReason::Crowded { neighbours: 1 })
        );
        assert_eq!(fixture.host.created.len(), 1);
    }

    #[test]
    fn zero_spacing_blocks_only_exact_coincidence() {
        fn crab_spawner() -> Spawner {
            let area = CircularArea::new(Position::ZERO, 5.0)
                .unwrap()
                .with_spacing(SpacingRule::new(0.0, true).unwrap());
            Spawner::builder(
                SpawnerId(2),
                "crabs",
                Box::new(area),
                SpawnTemplate::new(EntityKind::Mob, "beach_crab"),
            )
            .max_active(5)
            .build()
            .unwrap()
        }

        // No gates, so the area sample is the first draw from the rng
        let mut fixture = Fixture::new();
        let mut spawner = crab_spawner();
        let candidate = spawner.area().random_position(&mut fixture.rng.clone());

        fixture.index.add(TrackedEntity::new(
            EntityHandle::from_raw(1),
            EntityKind::Resource,
            candidate,
        ));
        assert_eq!(
            fixture.evaluate(&mut spawner, 0),
            SpawnAttemptResult::Deferred(DeferReason::Crowded { neighbours: 1 })
        );

        let mut fixture = Fixture::new();
        let mut spawner = crab_spawner();
        fixture.index.add(TrackedEntity::new(
            EntityHandle::from_raw(1),
            EntityKind::Resource,
            candidate + Position::new(0.01, 0.0, 0.0),
        ));
        assert!(fixture.evaluate(&mut spawner, 0).spawned().is_some());
    }

    #[test]
    fn spacing_ignored_without_avoid_overlap() {
        let mut fixture = Fixture::new();
        let area = CircularArea::new(Position::ZERO, 3.0)
            .unwrap()
            .with_spacing(SpacingRule::new(10.0, false).unwrap());
        let mut spawner = Spawner::builder(
            SpawnerId(1),
            "crabs",
            Box::new(area),
            SpawnTemplate::new(EntityKind::Mob, "beach_crab"),
        )
        .max_active(5)
        .build()
        .unwrap();

        for tick in 0..5 {
            assert!(fixture.evaluate(&mut spawner, tick).spawned().is_some());
        }
    }

    #[test]
    fn rejected_creation_defers() {
        let mut fixture = Fixture::new();
        fixture.host.reject = true;
        let mut spawner = wolf_spawner().build().unwrap();
        assert!(matches!(
            fixture.evaluate(&mut spawner, 0),
            SpawnAttemptResult::Deferred(DeferReason::CreationRejected(_))
        ));
        assert_eq!(spawner.active_count(), 0);
        assert!(fixture.index.is_empty());
    }

    #[test]
    fn detach_keeps_entities_alive() {
        let mut fixture = Fixture::new();
        let mut spawner = wolf_spawner().max_active(3).build().unwrap();
        for tick in 0..3 {
            fixture.evaluate(&mut spawner, tick);
        }
        let detached = spawner.detach_all();
        assert_eq!(detached.len(), 3);
        assert_eq!(spawner.active_count(), 0);
        // Still indexed: the world owns them
        assert_eq!(fixture.index.len(), 3);
    }

    #[test]
    fn loot_follows_registry_hot_reload() {
        let spawner = wolf_spawner().build().unwrap();
        let mut registry = LootRegistry::new();
        let mut rng = deterministic_rng(3);
        assert!(spawner.roll_loot(&registry, &mut rng).is_empty());

        registry.register(
            LootTable::new("wolf", "Wolf", vec![LootEntry::new("pelt", 1.0)]).unwrap(),
        );
        assert_eq!(spawner.roll_loot(&registry, &mut rng)[0].item_id, "pelt");

        registry.register(
            LootTable::new("wolf", "Wolf v2", vec![LootEntry::new("fang", 1.0)]).unwrap(),
        );
        assert_eq!(spawner.roll_loot(&registry, &mut rng)[0].item_id, "fang");
    }

    #[test]
    fn builder_validates() {
        assert!(matches!(
            wolf_spawner().max_active(0).build(),
            Err(SpawnConfigError::ZeroMaxActive { .. })
        ));
        assert!(wolf_spawner().activation_range(-1.0).build().is_err());
        assert!(wolf_spawner()
            .conditions(SpawnConditions::new().with_min_players(4).with_max_players(2))
            .build()
            .is_err());
    }

    #[test]
    fn from_config_defaults_position_to_area_center() {
        let config: SpawnerConfig = serde_json::from_str(
            r#"{
                "name": "foxes",
                "area": { "shape": "circle", "center": [5.0, 0.0, 5.0], "radius": 4.0 },
                "template": { "kind": "mob", "name": "cinder_fox" },
                "respawn_seconds": 12.5
            }"#,
        )
        .unwrap();
        let spawner = Spawner::from_config(SpawnerId(3), config).unwrap();
        assert_eq!(spawner.position(), Position::new(5.0, 0.0, 5.0));
        assert_eq!(spawner.view().max_active, 1);
        assert_eq!(spawner.template().name, "cinder_fox");
    }

    #[test]
    fn from_config_rejects_negative_respawn() {
        let config: SpawnerConfig = serde_json::from_str(
            r#"{
                "name": "foxes",
                "area": { "shape": "circle", "center": [0.0, 0.0, 0.0], "radius": 4.0 },
                "template": { "kind": "mob", "name": "cinder_fox" },
                "respawn_seconds": -3
            }"#,
        )
        .unwrap();
        assert!(matches!(
            Spawner::from_config(SpawnerId(0), config),
            Err(SpawnConfigError::InvalidRespawnInterval { .. })
        ));
    }
}
