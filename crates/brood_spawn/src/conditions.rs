//! Spawn condition gates.
//!
//! A spawner may carry a [`SpawnConditions`]; every configured gate must pass
//! before it is allowed to spawn. Gates are independent and run cheapest
//! first, stopping at the first failure:
//!
//! 1. time of day
//! 2. nearby player count
//! 3. average combat level of nearby players
//! 4. custom predicate

use crate::{SpawnConfigError, SpawnerId};
use brood_core::math::Position;
use brood_core::time::HOURS_PER_DAY;
use brood_core::{ClockSource, PlayerStatsLookup, RangeQuery, TrackedEntity};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Hours of day during which a spawner is active.
///
/// `start > end` wraps past midnight (22 → 4). `start == end` means always
/// active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: f32,
    pub end: f32,
}

impl TimeWindow {
    pub fn new(start: f32, end: f32) -> Result<Self, SpawnConfigError> {
        let window = Self { start, end };
        window.validate()?;
        Ok(window)
    }

    pub fn validate(&self) -> Result<(), SpawnConfigError> {
        for hour in [self.start, self.end] {
            if !(0.0..=HOURS_PER_DAY).contains(&hour) {
                return Err(SpawnConfigError::HourOutOfRange { hour });
            }
        }
        Ok(())
    }

    pub fn contains(&self, hour: f32) -> bool {
        if self.start == self.end {
            true
        } else if self.start < self.end {
            self.start <= hour && hour <= self.end
        } else {
            hour >= self.start || hour <= self.end
        }
    }
}

/// Bounds on the average combat level of nearby players. Either side may be
/// left open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct LevelRange {
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl LevelRange {
    pub fn at_least(min: u32) -> Self {
        Self {
            min: Some(min),
            max: None,
        }
    }

    pub fn between(min: u32, max: u32) -> Self {
        Self {
            min: Some(min),
            max: Some(max),
        }
    }

    pub fn contains(&self, level: f64) -> bool {
        self.min.map_or(true, |min| level >= min as f64)
            && self.max.map_or(true, |max| level <= max as f64)
    }
}

/// Error type custom predicates may return.
pub type PredicateError = Box<dyn std::error::Error + Send + Sync>;

/// Host-supplied gate. Returning `Err` (or panicking) counts as `false`.
pub type CustomCondition =
    Arc<dyn Fn(&SpawnerView<'_>, &WorldView<'_>) -> Result<bool, PredicateError> + Send + Sync>;

/// Optional gates attached to a spawner. Absent fields are skipped.
#[derive(Clone, Default, Serialize, Deserialize)]
pub struct SpawnConditions {
    #[serde(default)]
    pub time_of_day: Option<TimeWindow>,
    #[serde(default)]
    pub min_players: Option<usize>,
    #[serde(default)]
    pub max_players: Option<usize>,
    #[serde(default)]
    pub player_level: Option<LevelRange>,
    /// Not serializable; attach in code with [`SpawnConditions::with_custom`].
    #[serde(skip)]
    pub custom: Option<CustomCondition>,
}

impl SpawnConditions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_time_of_day(mut self, window: TimeWindow) -> Self {
        self.time_of_day = Some(window);
        self
    }

    pub fn with_min_players(mut self, min: usize) -> Self {
        self.min_players = Some(min);
        self
    }

    pub fn with_max_players(mut self, max: usize) -> Self {
        self.max_players = Some(max);
        self
    }

    pub fn with_player_level(mut self, range: LevelRange) -> Self {
        self.player_level = Some(range);
        self
    }

    pub fn with_custom<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&SpawnerView<'_>, &WorldView<'_>) -> Result<bool, PredicateError>
            + Send
            + Sync
            + 'static,
    {
        self.custom = Some(Arc::new(predicate));
        self
    }

    pub fn validate(&self) -> Result<(), SpawnConfigError> {
        if let Some(window) = &self.time_of_day {
            window.validate()?;
        }
        if let (Some(min), Some(max)) = (self.min_players, self.max_players) {
            if min > max {
                return Err(SpawnConfigError::PlayerBoundsInverted { min, max });
            }
        }
        if let Some(LevelRange {
            min: Some(min),
            max: Some(max),
        }) = self.player_level
        {
            if min > max {
                return Err(SpawnConfigError::LevelBoundsInverted { min, max });
            }
        }
        Ok(())
    }

    fn needs_players(&self) -> bool {
        self.min_players.is_some() || self.max_players.is_some() || self.player_level.is_some()
    }
}

impl fmt::Debug for SpawnConditions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SpawnConditions")
            .field("time_of_day", &self.time_of_day)
            .field("min_players", &self.min_players)
            .field("max_players", &self.max_players)
            .field("player_level", &self.player_level)
            .field("custom", &self.custom.as_ref().map(|_| "<predicate>"))
            .finish()
    }
}

/// What a gate (and a custom predicate) may see of the spawner.
#[derive(Debug, Clone, Copy)]
pub struct SpawnerView<'a> {
    pub id: SpawnerId,
    pub name: &'a str,
    pub position: Position,
    pub activation_range: f32,
    pub active_count: usize,
    pub max_active: usize,
}

/// Read-only slice of the world the gates depend on.
#[derive(Clone, Copy)]
pub struct WorldView<'a> {
    pub clock: &'a dyn ClockSource,
    pub entities: &'a dyn RangeQuery,
    pub stats: &'a dyn PlayerStatsLookup,
    pub now: Duration,
}

/// The gate that stopped a spawner.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GateFailure {
    #[error("no clock source reported the hour")]
    ClockUnavailable,

    #[error("hour {hour:.2} is outside {start}..{end}")]
    OutsideTimeWindow { hour: f32, start: f32, end: f32 },

    #[error("{nearby} players nearby, need at least {min}")]
    TooFewPlayers { nearby: usize, min: usize },

    #[error("{nearby} players nearby, allow at most {max}")]
    TooManyPlayers { nearby: usize, max: usize },

    #[error("level condition needs players in range")]
    NoPlayersForLevel,

    #[error("average player level {average:.1} is out of range")]
    LevelOutOfRange { average: f64 },

    #[error("custom condition rejected")]
    Custom,
}

/// Run every configured gate in order, stopping at the first failure.
pub fn evaluate_gates(
    conditions: &SpawnConditions,
    spawner: &SpawnerView<'_>,
    world: &WorldView<'_>,
) -> Result<(), GateFailure> {
    if let Some(window) = &conditions.time_of_day {
        check_time(window, world.clock)?;
    }

    if conditions.needs_players() {
        let players: Vec<TrackedEntity> = world
            .entities
            .entities_near(spawner.position, spawner.activation_range)
            .into_iter()
            .filter(|entity| entity.kind.is_player())
            .collect();
        check_player_count(conditions, players.len())?;
        if let Some(range) = &conditions.player_level {
            check_player_level(range, &players, world.stats)?;
        }
    }

    if let Some(predicate) = &conditions.custom {
        if !run_custom(predicate, spawner, world) {
            return Err(GateFailure::Custom);
        }
    }

    Ok(())
}

/// Boolean form of [`evaluate_gates`]; no conditions means always permitted.
pub fn check_conditions(
    conditions: Option<&SpawnConditions>,
    spawner: &SpawnerView<'_>,
    world: &WorldView<'_>,
) -> bool {
    conditions.map_or(true, |conditions| evaluate_gates(conditions, spawner, world).is_ok())
}

fn check_time(window: &TimeWindow, clock: &dyn ClockSource) -> Result<(), GateFailure> {
    let hour = clock.current_hour().ok_or(GateFailure::ClockUnavailable)?;
    if window.contains(hour) {
        Ok(())
    } else {
        Err(GateFailure::OutsideTimeWindow {
            hour,
            start: window.start,
            end: window.end,
        })
    }
}

fn check_player_count(conditions: &SpawnConditions, nearby: usize) -> Result<(), GateFailure> {
    if let Some(min) = conditions.min_players {
        if nearby < min {
            return Err(GateFailure::TooFewPlayers { nearby, min });
        }
    }
    if let Some(max) = conditions.max_players {
        if nearby > max {
            return Err(GateFailure::TooManyPlayers { nearby, max });
        }
    }
    Ok(())
}

fn check_player_level(
    range: &LevelRange,
    players: &[TrackedEntity],
    stats: &dyn PlayerStatsLookup,
) -> Result<(), GateFailure> {
    if players.is_empty() {
        return Err(GateFailure::NoPlayersForLevel);
    }
    let total: u64 = players
        .iter()
        .map(|player| stats.combat_level(player.handle).unwrap_or(0) as u64)
        .sum();
    let average = total as f64 / players.len() as f64;
    if range.contains(average) {
        Ok(())
    } else {
        Err(GateFailure::LevelOutOfRange { average })
    }
}

fn run_custom(predicate: &CustomCondition, spawner: &SpawnerView<'_>, world: &WorldView<'_>) -> bool {
    match panic::catch_unwind(AssertUnwindSafe(|| predicate(spawner, world))) {
        Ok(Ok(passed)) => passed,
        Ok(Err(error)) => {
            tracing::warn!(spawner = spawner.name, %error, "custom spawn condition failed");
            false
        }
        Err(_) => {
            tracing::warn!(spawner = spawner.name, "custom spawn condition panicked");
            false
        }
    }
}
