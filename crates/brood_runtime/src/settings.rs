//! Runtime settings and zone content files

use brood_core::math::Position;
use brood_loot::LootTable;
use brood_spawn::SpawnerConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Simulation settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeSettings {
    pub seed: u64,
    pub ticks: u32,
    pub tick_millis: u64,
    pub cell_size: f32,
    /// Real seconds per in-game day; 0 falls back to the wall clock.
    pub day_length_secs: f32,
    pub start_hour: f32,
    /// Chance per tick that a living spawned entity dies.
    pub death_chance: f64,
}

impl RuntimeSettings {
    pub fn tick_duration(&self) -> Duration {
        Duration::from_millis(self.tick_millis)
    }

    pub fn day_length(&self) -> Duration {
        Duration::try_from_secs_f32(self.day_length_secs).unwrap_or(Duration::ZERO)
    }
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            seed: 0x5eed,
            ticks: 600,
            tick_millis: 100,
            cell_size: 16.0,
            day_length_secs: 60.0,
            start_hour: 20.0,
            death_chance: 0.02,
        }
    }
}

/// A player placed in the zone at startup.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSeed {
    pub name: String,
    pub position: Position,
    #[serde(default)]
    pub level: Option<u32>,
}

/// Everything needed to run one zone
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneFile {
    pub name: String,
    #[serde(default)]
    pub settings: RuntimeSettings,
    #[serde(default)]
    pub loot_tables: Vec<LootTable>,
    #[serde(default)]
    pub spawners: Vec<SpawnerConfig>,
    #[serde(default)]
    pub players: Vec<PlayerSeed>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sample_zone_parses() {
        let zone: ZoneFile = serde_json::from_str(crate::SAMPLE_ZONE).unwrap();
        assert!(!zone.loot_tables.is_empty());
        assert!(!zone.spawners.is_empty());
        assert!(!zone.players.is_empty());
    }

    #[test]
    fn missing_settings_use_defaults() {
        let zone: ZoneFile =
            serde_json::from_str(r#"{ "name": "empty", "settings": { "seed": 9 } }"#).unwrap();
        assert_eq!(zone.settings.seed, 9);
        assert_eq!(zone.settings.tick_duration(), Duration::from_millis(100));
        assert!(zone.spawners.is_empty());
    }

    #[test]
    fn negative_day_length_disables_game_clock() {
        let settings = RuntimeSettings {
            day_length_secs: -1.0,
            ..RuntimeSettings::default()
        };
        assert_eq!(settings.day_length(), Duration::ZERO);
    }
}
