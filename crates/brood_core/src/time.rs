//! Deterministic time system
//!
//! Fixed-step simulation time plus the read-only clock sources the spawn
//! gates consult for the current hour of day.

use chrono::Timelike;
use std::time::Duration;

/// Default simulation tick rate (10 Hz; spawning does not need render rate)
pub const TICK_RATE_HZ: u32 = 10;
pub const TICK_DURATION: Duration = Duration::from_millis(100);

/// Hours in a day. Hour values are always reported in `[0, HOURS_PER_DAY)`.
pub const HOURS_PER_DAY: f32 = 24.0;

/// Simulation time tracker
#[derive(Debug, Clone)]
pub struct SimulationTime {
    tick_count: u64,
    tick_duration: Duration,
    accumulated_time: Duration,
}

impl SimulationTime {
    pub fn new() -> Self {
        Self::with_tick_duration(TICK_DURATION)
    }

    pub fn with_tick_duration(tick_duration: Duration) -> Self {
        Self {
            tick_count: 0,
            tick_duration,
            accumulated_time: Duration::ZERO,
        }
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    pub fn tick_duration(&self) -> Duration {
        self.tick_duration
    }

    pub fn advance_tick(&mut self) {
        self.tick_count += 1;
        self.accumulated_time += self.tick_duration;
    }

    pub fn total_time(&self) -> Duration {
        self.accumulated_time
    }
}

impl Default for SimulationTime {
    fn default() -> Self {
        Self::new()
    }
}

/// Read-only provider of the current hour of day.
///
/// Returns `None` when the provider is not available (e.g. a time system
/// that has not been initialised yet), letting a [`ClockChain`] fall through
/// to the next provider.
pub trait ClockSource {
    fn current_hour(&self) -> Option<f32>;
}

/// Clock pinned to a single hour. Used by tests and by hosts that drive
/// time of day themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedClock(pub f32);

impl ClockSource for FixedClock {
    fn current_hour(&self) -> Option<f32> {
        Some(normalize_hour(self.0))
    }
}

/// Local wall-clock time. Always available, so it terminates a chain.
#[derive(Debug, Clone, Copy, Default)]
pub struct WallClock;

impl ClockSource for WallClock {
    fn current_hour(&self) -> Option<f32> {
        let now = chrono::Local::now();
        let hour = now.hour() as f32 + now.minute() as f32 / 60.0 + now.second() as f32 / 3600.0;
        Some(normalize_hour(hour))
    }
}

/// In-game day/night cycle driven by elapsed simulation time.
#[derive(Debug, Clone)]
pub struct GameClock {
    day_length: Duration,
    start_hour: f32,
    elapsed: Duration,
}

impl GameClock {
    /// A zero-length day has no meaningful hour; such a clock reports
    /// unavailable and the chain falls through.
    pub fn new(day_length: Duration) -> Self {
        Self {
            day_length,
            start_hour: 0.0,
            elapsed: Duration::ZERO,
        }
    }

    pub fn starting_at(mut self, hour: f32) -> Self {
        self.start_hour = normalize_hour(hour);
        self
    }

    /// Follow the simulation's elapsed time.
    pub fn sync(&mut self, time: &SimulationTime) {
        self.elapsed = time.total_time();
    }

    pub fn set_elapsed(&mut self, elapsed: Duration) {
        self.elapsed = elapsed;
    }
}

impl ClockSource for GameClock {
    fn current_hour(&self) -> Option<f32> {
        if self.day_length.is_zero() {
            return None;
        }
        let day_fraction = self.elapsed.as_secs_f64() / self.day_length.as_secs_f64();
        let hour = self.start_hour as f64 + day_fraction.fract() * HOURS_PER_DAY as f64;
        Some(normalize_hour(hour as f32))
    }
}

/// Ordered list of clock providers; the first one that reports an hour wins.
#[derive(Default)]
pub struct ClockChain<'a> {
    sources: Vec<&'a dyn ClockSource>,
}

impl<'a> ClockChain<'a> {
    pub fn new() -> Self {
        Self {
            sources: Vec::new(),
        }
    }

    pub fn with(mut self, source: &'a dyn ClockSource) -> Self {
        self.sources.push(source);
        self
    }

    /// Append the wall clock as the last resort.
    pub fn with_wall_clock(self) -> Self {
        self.with(&WallClock)
    }
}

impl ClockSource for ClockChain<'_> {
    fn current_hour(&self) -> Option<f32> {
        self.sources.iter().find_map(|source| source.current_hour())
    }
}

/// Wrap any hour into `[0, 24)`.
pub fn normalize_hour(hour: f32) -> f32 {
    let wrapped = hour.rem_euclid(HOURS_PER_DAY);
    // rem_euclid can round up to exactly 24.0 for tiny negative inputs
    if wrapped >= HOURS_PER_DAY {
        0.0
    } else {
        wrapped
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Unavailable;

    impl ClockSource for Unavailable {
        fn current_hour(&self) -> Option<f32> {
            None
        }
    }

    #[test]
    fn advance_tick_accumulates() {
        let mut time = SimulationTime::with_tick_duration(Duration::from_millis(250));
        for _ in 0..4 {
            time.advance_tick();
        }
        assert_eq!(time.tick_count(), 4);
        assert_eq!(time.total_time(), Duration::from_secs(1));
    }

    #[test]
    fn chain_takes_first_available() {
        let evening = FixedClock(19.0);
        let chain = ClockChain::new().with(&Unavailable).with(&evening).with_wall_clock();
        assert_eq!(chain.current_hour(), Some(19.0));
    }

    #[test]
    fn wall_clock_terminates_chain() {
        let chain = ClockChain::new().with(&Unavailable).with_wall_clock();
        let hour = chain.current_hour().unwrap();
        assert!((0.0..24.0).contains(&hour));
    }

    #[test]
    fn empty_chain_has_no_hour() {
        assert_eq!(ClockChain::new().current_hour(), None);
    }

    #[test]
    fn game_clock_wraps_days() {
        let mut time = SimulationTime::with_tick_duration(Duration::from_secs(1));
        let mut clock = GameClock::new(Duration::from_secs(24)).starting_at(6.0);
        for _ in 0..30 {
            time.advance_tick();
        }
        clock.sync(&time);
        // 30s into a 24s day: one full day plus 6 hours, on top of a 06:00 start
        let hour = clock.current_hour().unwrap();
        assert!((hour - 12.0).abs() < 1e-3, "hour was {hour}");
    }

    #[test]
    fn zero_length_day_is_unavailable() {
        assert_eq!(GameClock::new(Duration::ZERO).current_hour(), None);
    }

    #[test]
    fn normalize_wraps_negative_and_large() {
        assert_eq!(normalize_hour(-2.0), 22.0);
        assert_eq!(normalize_hour(26.0), 2.0);
        assert_eq!(normalize_hour(24.0), 0.0);
    }
}
