#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Command-line entry point that runs a headless Realmwalk session.
//!
//! An autopilot stands in for the player: it wanders to random tiles, focuses
//! the nearest hostile and respawns after death.

use std::{path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use clap::Parser;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use realmwalk_cli::{load_map, EventTally, Simulation, SimulationConfig};
use realmwalk_core::{Event, TileCoord, Walkability};
use realmwalk_world::{query, TileMap};
use tracing_subscriber::EnvFilter;

/// Run a headless Realmwalk session
#[derive(Parser, Debug)]
#[command(name = "realmwalk", version)]
struct CliArgs {
    /// Text map of `.` (open) and `#` (blocked) tiles; an open grid when omitted
    #[arg(long)]
    map: Option<PathBuf>,

    /// Width of the open grid used without a map
    #[arg(long, default_value = "64")]
    width: u32,

    /// Height of the open grid used without a map
    #[arg(long, default_value = "64")]
    height: u32,

    /// TOML settings file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Seed overriding the spawn and combat seeds
    #[arg(long)]
    seed: Option<u64>,

    /// Number of frames to simulate
    #[arg(long, default_value = "1200")]
    frames: u32,

    /// Simulated milliseconds per frame
    #[arg(long, default_value = "50")]
    frame_ms: u64,

    /// Frames a dead player waits before respawning
    #[arg(long, default_value = "40")]
    respawn_delay: u32,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("realmwalk=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = CliArgs::parse();

    let mut config = match &args.config {
        Some(path) => SimulationConfig::load(path)
            .with_context(|| format!("failed to load settings from {}", path.display()))?,
        None => SimulationConfig::default(),
    };
    if let Some(seed) = args.seed {
        config.spawning.seed = seed;
        config.session.combat_seed = seed.rotate_left(32);
    }
    let attack_range = config.combat.attack_range;
    let wander_seed = config.spawning.seed ^ config.session.combat_seed;

    let map = match &args.map {
        Some(path) => {
            load_map(path).with_context(|| format!("failed to load map {}", path.display()))?
        }
        None => TileMap::open(args.width, args.height),
    };

    let mut simulation = Simulation::new(map, config).context("failed to build the world")?;
    let mut autopilot = Autopilot::new(wander_seed, attack_range, args.respawn_delay);
    let mut tally = EventTally::default();
    let frame = Duration::from_millis(args.frame_ms);

    for _ in 0..args.frames {
        autopilot.drive(&mut simulation);
        let events = simulation.step(frame);
        autopilot.observe(&events);
        tally.record(&events);
    }

    let world = simulation.world();
    let player = query::player(world);
    println!(
        "simulated {:.1}s over {} frames",
        query::elapsed(world).as_secs_f32(),
        args.frames
    );
    println!(
        "player at ({}, {}) with {}/{} hp",
        player.tile.x(),
        player.tile.y(),
        player.health.current(),
        player.health.max()
    );
    println!(
        "hostiles: {} alive, {} spawned, {} killed, {} despawned",
        query::hostile_count(world),
        tally.spawns,
        tally.kills,
        tally.despawns
    );
    println!(
        "movement: {} tile changes, {} routes, {} blocked",
        tally.moves, tally.routes_assigned, tally.routes_blocked
    );
    println!("combat: {} hits, {} deaths", tally.attacks, tally.deaths);
    for (skill, total) in simulation.experience().iter() {
        println!("experience {skill:?}: {total}");
    }
    Ok(())
}

/// Scripted stand-in for a human player.
#[derive(Debug)]
struct Autopilot {
    rng: ChaCha8Rng,
    attack_range: u32,
    respawn_delay: u32,
    dead_for: Option<u32>,
}

impl Autopilot {
    const WANDER_RADIUS: i64 = 8;

    fn new(seed: u64, attack_range: u32, respawn_delay: u32) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            attack_range,
            respawn_delay,
            dead_for: None,
        }
    }

    fn drive(&mut self, simulation: &mut Simulation) {
        if let Some(frames) = self.dead_for.as_mut() {
            *frames += 1;
            if *frames >= self.respawn_delay {
                simulation.respawn_player();
                self.dead_for = None;
            }
            return;
        }

        let player = query::player(simulation.world());
        if player.target.is_none() {
            let _ = simulation.target_nearest(self.attack_range);
        }
        if player.route_len == 0 && simulation.player_control().goal().is_none() {
            if let Some(tile) = self.wander_tile(simulation) {
                let _ = simulation.move_to(tile);
            }
        }
    }

    fn observe(&mut self, events: &[Event]) {
        if events
            .iter()
            .any(|event| matches!(event, Event::PlayerDied { .. }))
        {
            self.dead_for = Some(0);
        }
    }

    fn wander_tile(&mut self, simulation: &Simulation) -> Option<TileCoord> {
        let world = simulation.world();
        let map = query::tile_map(world);
        let dimensions = map.dimensions();
        let origin = query::player(world).tile;
        let x = i64::from(origin.x())
            + self
                .rng
                .gen_range(-Self::WANDER_RADIUS..=Self::WANDER_RADIUS);
        let y = i64::from(origin.y())
            + self
                .rng
                .gen_range(-Self::WANDER_RADIUS..=Self::WANDER_RADIUS);
        let tile = TileCoord::new(u32::try_from(x).ok()?, u32::try_from(y).ok()?);
        (dimensions.contains(tile) && map.is_walkable(tile) && tile != origin).then_some(tile)
    }
}
