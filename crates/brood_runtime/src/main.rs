//! Brood Runtime
//!
//! Headless driver that loads a zone file, runs its spawners against an
//! in-memory world and resolves loot for whatever dies.

mod host;
mod settings;

use anyhow::{Context, Result};
use brood_core::math::deterministic_rng;
use brood_core::{ClockChain, EntityKind, GameClock, TrackedEntity};
use brood_loot::LootRegistry;
use brood_metrics::TickTimer;
use brood_spawn::Zone;
use host::{Population, Roster};
use settings::ZoneFile;
use tracing_subscriber::EnvFilter;

/// Zone used when no file is given on the command line.
pub(crate) const SAMPLE_ZONE: &str = include_str!("../content/frostmarch.json");

fn load_zone_file() -> Result<ZoneFile> {
    match std::env::args().nth(1) {
        Some(path) => {
            let json = std::fs::read_to_string(&path)
                .with_context(|| format!("reading zone file {path}"))?;
            serde_json::from_str(&json).with_context(|| format!("parsing zone file {path}"))
        }
        None => serde_json::from_str(SAMPLE_ZONE).context("parsing built-in sample zone"),
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    tracing::info!("Brood v{}", brood_core::VERSION);

    let file = load_zone_file()?;
    let settings = file.settings.clone();

    let mut registry = LootRegistry::new();
    for table in file.loot_tables {
        registry.register(table);
    }

    let mut zone = Zone::new(&file.name, settings.cell_size, settings.tick_duration())
        .context("creating zone")?;
    for config in file.spawners {
        let name = config.name.clone();
        zone.add_spawner_config(config)
            .with_context(|| format!("spawner '{name}'"))?;
    }

    let mut roster = Roster::new();
    let mut population = Population::new();
    for player in &file.players {
        let handle = roster.join(&player.name, player.position, player.level);
        zone.track(TrackedEntity::new(handle, EntityKind::Player, player.position));
    }

    tracing::info!(
        zone = zone.name(),
        spawners = zone.spawners().len(),
        loot_tables = registry.len(),
        players = roster.len(),
        "zone loaded"
    );

    let mut rng = deterministic_rng(settings.seed);
    let mut game_clock = GameClock::new(settings.day_length()).starting_at(settings.start_hour);
    let mut timer = TickTimer::new(120);
    let mut spawned = 0usize;
    let mut deaths = 0usize;
    let mut drops = 0u32;

    for _ in 0..settings.ticks {
        timer.begin();

        game_clock.sync(zone.time());
        let clock = ClockChain::new().with(&game_clock).with_wall_clock();

        for report in zone.tick(&clock, &roster, &mut population, &mut rng) {
            if let Some(handle) = report.result.spawned() {
                spawned += 1;
                if let Some(entity) = population.get(handle) {
                    tracing::debug!(
                        spawner = %report.spawner,
                        entity = %handle,
                        position = ?entity.position,
                        "{} appeared",
                        entity.name
                    );
                }
            }
        }

        for handle in population.roll_deaths(&mut rng, settings.death_chance) {
            let loot = zone
                .spawner_for(handle)
                .map(|spawner| spawner.roll_loot(&registry, &mut rng))
                .unwrap_or_default();
            zone.despawn(handle);
            if let Some(entity) = population.remove(handle) {
                deaths += 1;
                drops += loot.iter().map(|drop| drop.quantity).sum::<u32>();
                tracing::info!(entity = %handle, kind = %entity.kind, ?loot, "{} died", entity.name);
            }
        }

        timer.end();
    }

    for spawner in zone.spawners() {
        tracing::info!(
            spawner = spawner.name(),
            active = spawner.active_count(),
            state = ?spawner.state(),
            "spawner summary"
        );
    }
    for (outcome, count) in zone.outcomes().snapshot() {
        tracing::info!(outcome, count, "spawn outcomes");
    }

    let (fastest, slowest) = timer.tick_time_range_ms();
    tracing::info!(
        ticks = zone.time().tick_count(),
        spawned,
        deaths,
        drops,
        avg_ms = timer.tick_time_ms(),
        fastest_ms = fastest,
        slowest_ms = slowest,
        "run complete"
    );

    let leftover = zone.unload();
    tracing::info!(detached = leftover.len(), alive = population.len(), "shutdown");

    Ok(())
}
