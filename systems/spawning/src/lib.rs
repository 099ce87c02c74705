#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Deterministic spawning system responsible for emitting hostile spawn commands.

use std::time::Duration;

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use realmwalk_core::{Command, Event, HostileStats, OccupancyView, TileCoord, Walkability};
use serde::{Deserialize, Serialize};

/// Configuration parameters required to construct the spawning system.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawningConfig {
    /// Milliseconds between two spawns; zero disables spawning.
    pub spawn_interval_ms: u64,
    /// Hostile population above which nothing spawns.
    pub max_hostiles: usize,
    /// Random tiles tried per spawn before giving up.
    pub placement_attempts: u32,
    /// Seed of the placement generator.
    pub seed: u64,
    /// Archetypes spawned in turn; the default archetype when empty.
    pub roster: Vec<HostileStats>,
}

impl SpawningConfig {
    fn spawn_interval(&self) -> Duration {
        Duration::from_millis(self.spawn_interval_ms)
    }
}

impl Default for SpawningConfig {
    fn default() -> Self {
        Self {
            spawn_interval_ms: 5_000,
            max_hostiles: 20,
            placement_attempts: 50,
            seed: 0x5eed_1e55,
            roster: Vec::new(),
        }
    }
}

/// Pure system that emits spawn commands on a fixed cadence.
#[derive(Debug)]
pub struct Spawning {
    spawn_interval: Duration,
    max_hostiles: usize,
    placement_attempts: u32,
    roster: Vec<HostileStats>,
    accumulator: Duration,
    rng: ChaCha8Rng,
    roster_index: usize,
    claimed: Vec<TileCoord>,
}

impl Spawning {
    /// Creates a new spawning system using the supplied configuration.
    #[must_use]
    pub fn new(config: SpawningConfig) -> Self {
        Self {
            spawn_interval: config.spawn_interval(),
            max_hostiles: config.max_hostiles,
            placement_attempts: config.placement_attempts,
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            roster: config.roster,
            accumulator: Duration::ZERO,
            roster_index: 0,
            claimed: Vec::new(),
        }
    }

    /// Consumes `TimeAdvanced` events and emits a spawn per elapsed interval
    /// while the population stays under the cap.
    pub fn handle<W: Walkability + ?Sized>(
        &mut self,
        events: &[Event],
        map: &W,
        occupancy: &OccupancyView<'_>,
        hostile_count: usize,
        out: &mut Vec<Command>,
    ) {
        if self.spawn_interval.is_zero() {
            return;
        }

        let mut accumulated = Duration::ZERO;
        for event in events {
            if let Event::TimeAdvanced { dt } = event {
                accumulated = accumulated.saturating_add(*dt);
            }
        }
        if accumulated.is_zero() {
            return;
        }

        self.accumulator = self.accumulator.saturating_add(accumulated);
        let due = self.resolve_spawn_attempts();
        let room = self.max_hostiles.saturating_sub(hostile_count);
        self.populate(due.min(room), map, occupancy, out);
    }

    /// Emits up to `count` spawns on random free tiles, regardless of cadence.
    pub fn populate<W: Walkability + ?Sized>(
        &mut self,
        count: usize,
        map: &W,
        occupancy: &OccupancyView<'_>,
        out: &mut Vec<Command>,
    ) {
        self.claimed.clear();
        for _ in 0..count {
            let Some(tile) = self.place(map, occupancy) else {
                tracing::debug!(
                    target: "realmwalk::spawning",
                    attempts = self.placement_attempts,
                    "no free tile found for a spawn"
                );
                continue;
            };
            self.claimed.push(tile);
            let stats = self.next_stats();
            out.push(Command::SpawnHostile { stats, tile });
        }
    }

    /// Picks a random walkable, unoccupied tile, trying at most
    /// `placement_attempts` candidates.
    pub fn place<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        occupancy: &OccupancyView<'_>,
    ) -> Option<TileCoord> {
        let dimensions = map.dimensions();
        if dimensions.width() == 0 || dimensions.height() == 0 {
            return None;
        }
        (0..self.placement_attempts)
            .map(|_| {
                TileCoord::new(
                    self.rng.gen_range(0..dimensions.width()),
                    self.rng.gen_range(0..dimensions.height()),
                )
            })
            .find(|tile| {
                map.is_walkable(*tile)
                    && !occupancy.is_occupied(*tile, None)
                    && !self.claimed.contains(tile)
            })
    }

    fn resolve_spawn_attempts(&mut self) -> usize {
        if self.spawn_interval.is_zero() {
            return 0;
        }

        let mut attempts = 0;
        while self.accumulator >= self.spawn_interval {
            self.accumulator -= self.spawn_interval;
            attempts += 1;
        }
        attempts
    }

    fn next_stats(&mut self) -> HostileStats {
        if self.roster.is_empty() {
            return HostileStats::default();
        }
        let stats = self.roster[self.roster_index % self.roster.len()].clone();
        self.roster_index = (self.roster_index + 1) % self.roster.len();
        stats
    }
}
