//! Frame driver that wires every system to the world.
//!
//! A frame runs in a fixed order: hostile timers, hostile planning under the
//! pathfinding budget, movement, the player's reaction to movement outcomes,
//! hostile attacks, the player's attack and finally spawning. Systems only
//! emit commands; the world applies them between phases so each phase sees
//! the state the previous one produced.

use std::{collections::BTreeMap, time::Duration};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use realmwalk_core::{
    AgentId, Command, Event, ExperienceSink, PlayerSnapshot, Skill, TileCoord, TileRect,
};
use realmwalk_system_combat::PlayerCombat;
use realmwalk_system_hostile_ai::HostileAi;
use realmwalk_system_player_control::{PlayerControl, Surroundings};
use realmwalk_system_spawning::Spawning;
use realmwalk_world::{self as world, query, MapError, TileMap, World};

use crate::config::SimulationConfig;

/// Experience credited per skill over a session.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ExperienceLedger {
    totals: BTreeMap<Skill, u64>,
}

impl ExperienceLedger {
    /// Experience credited to `skill` so far.
    #[must_use]
    pub fn total(&self, skill: Skill) -> u64 {
        self.totals.get(&skill).copied().unwrap_or(0)
    }

    /// Skills with credited experience, in skill order.
    pub fn iter(&self) -> impl Iterator<Item = (Skill, u64)> + '_ {
        self.totals.iter().map(|(skill, total)| (*skill, *total))
    }
}

impl ExperienceSink for ExperienceLedger {
    fn add_experience(&mut self, skill: Skill, amount: u32) {
        let total = self.totals.entry(skill).or_default();
        *total = total.saturating_add(u64::from(amount));
    }
}

/// Running counts of notable events.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct EventTally {
    /// Tile changes of any agent.
    pub moves: u64,
    /// Routes installed.
    pub routes_assigned: u64,
    /// Routes dropped because a waypoint became unavailable.
    pub routes_blocked: u64,
    /// Attacks that connected, from either side.
    pub attacks: u64,
    /// Hostiles killed by the player.
    pub kills: u64,
    /// Times the player died.
    pub deaths: u64,
    /// Hostiles that entered the world.
    pub spawns: u64,
    /// Hostiles removed for straying from their spawn.
    pub despawns: u64,
}

impl EventTally {
    /// Adds `events` to the counts.
    pub fn record(&mut self, events: &[Event]) {
        for event in events {
            let counter = match event {
                Event::AgentMoved { .. } => &mut self.moves,
                Event::RouteAssigned { .. } => &mut self.routes_assigned,
                Event::RouteBlocked { .. } => &mut self.routes_blocked,
                Event::AttackLanded { .. } => &mut self.attacks,
                Event::AgentDied { .. } => &mut self.kills,
                Event::PlayerDied { .. } => &mut self.deaths,
                Event::HostileSpawned { .. } => &mut self.spawns,
                Event::HostileDespawned { .. } => &mut self.despawns,
                _ => continue,
            };
            *counter += 1;
        }
    }
}

/// Headless session owning the world and every system.
#[derive(Debug)]
pub struct Simulation {
    world: World,
    hostile_ai: HostileAi,
    player_control: PlayerControl,
    player_combat: PlayerCombat,
    spawning: Spawning,
    rng: ChaCha8Rng,
    experience: ExperienceLedger,
    view_radius: u32,
    pending: Vec<Event>,
    unseen_by_control: Vec<Event>,
}

impl Simulation {
    /// Builds the world on `map` and places the initial hostiles.
    pub fn new(map: TileMap, config: SimulationConfig) -> Result<Self, MapError> {
        let world = World::new(map, config.world.clone())?;
        let mut simulation = Self {
            world,
            hostile_ai: HostileAi::new(config.hostile_ai, config.pathfinder, config.combat),
            player_control: PlayerControl::new(config.player_control, config.pathfinder),
            player_combat: PlayerCombat::new(config.combat),
            spawning: Spawning::new(config.spawning.clone()),
            rng: ChaCha8Rng::seed_from_u64(config.session.combat_seed),
            experience: ExperienceLedger::default(),
            view_radius: config.session.view_radius,
            pending: Vec::new(),
            unseen_by_control: Vec::new(),
        };

        let mut commands = Vec::new();
        simulation.spawning.populate(
            config.session.initial_hostiles,
            query::tile_map(&simulation.world),
            &query::occupancy_view(&simulation.world),
            &mut commands,
        );
        let mut events = Vec::new();
        simulation.apply(&mut commands, &mut events);
        simulation.pending = events;

        tracing::info!(
            target: "realmwalk::simulation",
            hostiles = query::hostile_count(&simulation.world),
            player = ?query::player(&simulation.world).tile,
            "simulation ready"
        );
        Ok(simulation)
    }

    /// Authoritative world state.
    #[must_use]
    pub fn world(&self) -> &World {
        &self.world
    }

    /// Hostile scheduler, exposing the latest frame's planning count.
    #[must_use]
    pub fn hostile_ai(&self) -> &HostileAi {
        &self.hostile_ai
    }

    /// Player input controller.
    #[must_use]
    pub fn player_control(&self) -> &PlayerControl {
        &self.player_control
    }

    /// Experience credited so far.
    #[must_use]
    pub fn experience(&self) -> &ExperienceLedger {
        &self.experience
    }

    /// Sends the player toward `tile`. Returns `false` when no route exists.
    pub fn move_to(&mut self, tile: TileCoord) -> bool {
        let mut commands = Vec::new();
        let player = query::player(&self.world);
        let accepted = self.player_control.request_move_to(
            &surroundings(&self.world, &player),
            tile,
            &mut commands,
        );
        self.apply_pending(commands);
        accepted
    }

    /// Steps the player once, or keeps stepping while `continuous` is held.
    pub fn move_direction(&mut self, dx: i32, dy: i32, continuous: bool) -> bool {
        let mut commands = Vec::new();
        let player = query::player(&self.world);
        let accepted = self.player_control.request_move_direction(
            &surroundings(&self.world, &player),
            dx,
            dy,
            continuous,
            &mut commands,
        );
        self.apply_pending(commands);
        accepted
    }

    /// Focuses the player's attacks on `target`, or clears the focus.
    pub fn set_target(&mut self, target: Option<AgentId>) {
        self.apply_pending(vec![Command::SetPlayerTarget { target }]);
    }

    /// Focuses the nearest hostile within `radius`, returning it.
    pub fn target_nearest(&mut self, radius: u32) -> Option<AgentId> {
        let nearest = query::nearby_hostiles(&self.world, radius).first().copied();
        if nearest.is_some() {
            self.set_target(nearest);
        }
        nearest
    }

    /// Brings a dead player back at the spawn tile.
    pub fn respawn_player(&mut self) {
        self.apply_pending(vec![Command::RespawnPlayer]);
    }

    /// Runs one frame of `dt` and returns every event it produced, preceded by
    /// the events of input requests made since the previous frame.
    pub fn step(&mut self, dt: Duration) -> Vec<Event> {
        let mut events = std::mem::take(&mut self.pending);
        let mut commands = Vec::new();

        let player = query::player(&self.world);
        let active = self.hostile_ai.active_set(
            &query::occupancy_view(&self.world),
            query::dimensions(&self.world),
            TileRect::around(player.tile, self.view_radius),
        );

        self.hostile_ai.advance_timers(dt, &active, &mut commands);
        self.apply(&mut commands, &mut events);

        let player = query::player(&self.world);
        self.hostile_ai.plan(
            query::tile_map(&self.world),
            &query::occupancy_view(&self.world),
            &query::agent_view(&self.world),
            &active,
            &player,
            query::elapsed(&self.world),
            &mut commands,
        );
        self.apply(&mut commands, &mut events);

        commands.push(Command::AdvanceMovement {
            dt,
            agents: active.clone(),
        });
        self.apply(&mut commands, &mut events);

        let mut unseen = std::mem::take(&mut self.unseen_by_control);
        unseen.extend_from_slice(&events);
        let player = query::player(&self.world);
        self.player_control
            .handle(&unseen, &surroundings(&self.world, &player), &mut commands);
        self.apply(&mut commands, &mut events);
        let control_seen = events.len();

        let player = query::player(&self.world);
        self.hostile_ai.resolve_attacks(
            &query::agent_view(&self.world),
            &active,
            &player,
            &mut self.rng,
            &mut self.experience,
            &mut commands,
        );
        self.apply(&mut commands, &mut events);

        let player = query::player(&self.world);
        let target = player
            .target
            .and_then(|target| query::hostile(&self.world, target));
        self.player_combat.handle(
            &events,
            &player,
            target.as_ref(),
            &mut self.rng,
            &mut self.experience,
            &mut commands,
        );
        self.apply(&mut commands, &mut events);

        self.spawning.handle(
            &events,
            query::tile_map(&self.world),
            &query::occupancy_view(&self.world),
            query::hostile_count(&self.world),
            &mut commands,
        );
        self.apply(&mut commands, &mut events);

        self.hostile_ai.observe(&events);
        self.unseen_by_control = events[control_seen..].to_vec();

        tracing::trace!(
            target: "realmwalk::simulation",
            elapsed_ms = query::elapsed(&self.world).as_millis() as u64,
            active = active.len(),
            paths = self.hostile_ai.paths_planned(),
            events = events.len(),
            "frame complete"
        );
        events
    }

    fn apply(&mut self, commands: &mut Vec<Command>, events: &mut Vec<Event>) {
        for command in commands.drain(..) {
            world::apply(&mut self.world, command, events);
        }
    }

    fn apply_pending(&mut self, mut commands: Vec<Command>) {
        let mut events = std::mem::take(&mut self.pending);
        self.apply(&mut commands, &mut events);
        self.pending = events;
    }
}

fn surroundings<'a>(world: &'a World, player: &'a PlayerSnapshot) -> Surroundings<'a, TileMap> {
    Surroundings {
        map: query::tile_map(world),
        occupancy: query::occupancy_view(world),
        player,
        now: query::elapsed(world),
    }
}
