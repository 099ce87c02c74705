#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative world state for the Realmwalk simulation.
//!
//! The world owns the player, every hostile, the static [`TileMap`] and the
//! [`OccupancyIndex`]. All mutation flows through [`apply`], which reports
//! every change as an [`Event`]; systems read state through [`query`].

use std::{collections::BTreeMap, time::Duration};

use realmwalk_core::{
    AgentId, AgentSnapshot, CombatStats, Command, Event, Health, HostileStats, PlayerSnapshot,
    Route, TileCoord, TileRect, Vec2, Walkability,
};
use realmwalk_system_movement::{self as movement, Advance, Mover};
use serde::{Deserialize, Serialize};

mod map;
mod occupancy;

pub use map::{MapError, TileMap, BLOCKED_SYMBOL, OPEN_SYMBOL};
pub use occupancy::OccupancyIndex;

/// Tunables of the authoritative world.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Edge length of an occupancy cluster in tiles.
    pub cluster_size: u32,
    /// Side length of a tile in world units, for presentation layers.
    pub tile_length: f32,
    /// Player movement speed in tiles per second.
    pub player_speed: f32,
    /// Player hit points.
    pub player_max_health: u32,
    /// Player combat stats.
    pub player_stats: CombatStats,
    /// Preferred spawn and respawn tile; the map centre when absent.
    pub player_spawn: Option<TileCoord>,
    /// Invulnerability after dying or respawning, in milliseconds.
    pub immunity_ms: u64,
    /// Duration of the player's under-attack indicator, in milliseconds.
    pub under_attack_ms: u64,
    /// Duration of hit and critical flashes, in milliseconds.
    pub flash_ms: u64,
}

impl WorldConfig {
    fn immunity(&self) -> Duration {
        Duration::from_millis(self.immunity_ms)
    }

    fn under_attack(&self) -> Duration {
        Duration::from_millis(self.under_attack_ms)
    }

    fn flash(&self) -> Duration {
        Duration::from_millis(self.flash_ms)
    }
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            cluster_size: 16,
            tile_length: 32.0,
            player_speed: 2.0,
            player_max_health: 100,
            player_stats: CombatStats::default(),
            player_spawn: None,
            immunity_ms: 2_000,
            under_attack_ms: 1_000,
            flash_ms: 500,
        }
    }
}

/// Represents the authoritative Realmwalk world state.
#[derive(Debug)]
pub struct World {
    config: WorldConfig,
    map: TileMap,
    occupancy: OccupancyIndex,
    player: Player,
    hostiles: BTreeMap<AgentId, Hostile>,
    next_hostile: u32,
    elapsed: Duration,
}

impl World {
    /// Creates a world on `map`, placing the player on the configured spawn
    /// tile or the nearest walkable tile to it.
    pub fn new(map: TileMap, config: WorldConfig) -> Result<Self, MapError> {
        let mut occupancy = OccupancyIndex::new(config.cluster_size);
        let preferred = config
            .player_spawn
            .unwrap_or_else(|| map.dimensions().center());
        let tile =
            nearest_open_tile(&map, &occupancy, preferred).ok_or(MapError::NoWalkableTile)?;
        occupancy.insert(AgentId::PLAYER, tile);

        let player = Player {
            body: Body::on(tile),
            route: Route::empty(),
            health: Health::full(config.player_max_health),
            stats: config.player_stats,
            speed: config.player_speed,
            dead: false,
            immune_for: Duration::ZERO,
            under_attack_for: Duration::ZERO,
            critical_flash: Duration::ZERO,
            target: None,
        };

        Ok(Self {
            config,
            map,
            occupancy,
            player,
            hostiles: BTreeMap::new(),
            next_hostile: 1,
            elapsed: Duration::ZERO,
        })
    }

    fn advance_player(&mut self, dt: Duration, out_events: &mut Vec<Event>) {
        if self.player.dead {
            return;
        }
        let Self {
            map,
            occupancy,
            player,
            ..
        } = self;

        let outcome = movement::advance(
            &mut player.body,
            &mut player.route,
            dt,
            player.speed,
            |tile| map.is_walkable(tile) && !occupancy.is_occupied(tile, Some(AgentId::PLAYER)),
        );
        let _ = record_advance(occupancy, AgentId::PLAYER, outcome, out_events);
    }

    fn advance_hostile(&mut self, agent: AgentId, dt: Duration, out_events: &mut Vec<Event>) {
        let Self {
            map,
            occupancy,
            hostiles,
            ..
        } = self;
        let Some(hostile) = hostiles.get_mut(&agent) else {
            return;
        };

        let outcome = movement::advance(
            &mut hostile.body,
            &mut hostile.route,
            dt,
            hostile.stats.speed,
            |tile| map.is_walkable(tile) && !occupancy.is_occupied(tile, Some(agent)),
        );
        if record_advance(occupancy, agent, outcome, out_events) {
            hostile.planning_in = Duration::ZERO;
        }
    }

    fn route_slot(&mut self, agent: AgentId) -> Option<(TileCoord, &mut Route)> {
        if agent.is_player() {
            let player = &mut self.player;
            (!player.dead).then_some((player.body.tile, &mut player.route))
        } else {
            self.hostiles
                .get_mut(&agent)
                .map(|hostile| (hostile.body.tile, &mut hostile.route))
        }
    }

    fn assign_route(
        &mut self,
        agent: AgentId,
        route: Route,
        retry_after: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let Some((tile, slot)) = self.route_slot(agent) else {
            return;
        };
        let Some(goal) = route.goal().filter(|_| route.is_chain_from(tile)) else {
            tracing::debug!(
                target: "realmwalk::world",
                agent = agent.get(),
                ?tile,
                first = ?route.front(),
                "rejected route that does not start next to the agent"
            );
            out_events.push(Event::RouteRejected { agent });
            return;
        };

        let waypoints = route.len();
        *slot = route;
        if let Some(hostile) = self.hostiles.get_mut(&agent) {
            hostile.planning_in = retry_after;
        }
        out_events.push(Event::RouteAssigned {
            agent,
            goal,
            waypoints,
        });
    }

    fn step_toward(
        &mut self,
        agent: AgentId,
        toward: TileCoord,
        retry_after: Duration,
        out_events: &mut Vec<Event>,
    ) {
        let Self {
            map,
            occupancy,
            hostiles,
            ..
        } = self;
        let Some(hostile) = hostiles.get_mut(&agent) else {
            return;
        };
        hostile.planning_in = retry_after;

        let from = hostile.body.tile;
        let dx = axis_step(from.x(), toward.x());
        let dy = axis_step(from.y(), toward.y());
        let candidates = [(dx, dy), (dx, 0), (0, dy)];
        let dimensions = map.dimensions();

        let step = candidates
            .into_iter()
            .filter(|offset| *offset != (0, 0))
            .filter_map(|(cx, cy)| from.offset(cx, cy, dimensions))
            .find(|tile| map.is_walkable(*tile) && !occupancy.is_occupied(*tile, Some(agent)));

        if let Some(step) = step {
            hostile.route = Route::from(vec![step]);
            out_events.push(Event::RouteAssigned {
                agent,
                goal: step,
                waypoints: 1,
            });
        }
    }

    fn resolve_hostile_attack(
        &mut self,
        attacker: AgentId,
        damage: u32,
        critical: bool,
        cooldown: Duration,
        out_events: &mut Vec<Event>,
    ) {
        if self.player.dead || !self.player.immune_for.is_zero() {
            tracing::debug!(
                target: "realmwalk::world",
                attacker = attacker.get(),
                "hostile attack ignored while the player is dead or immune"
            );
            return;
        }
        let Some(hostile) = self.hostiles.get_mut(&attacker) else {
            return;
        };
        hostile.attack_ready_in = cooldown;

        let flash = self.config.flash();
        let under_attack = self.config.under_attack();
        let player = &mut self.player;
        player.health = player.health.damaged(damage);
        player.critical_flash = if critical { flash } else { Duration::ZERO };
        player.under_attack_for = under_attack;

        out_events.push(Event::AttackLanded {
            attacker,
            target: AgentId::PLAYER,
            critical,
        });
        out_events.push(Event::DamageDealt {
            attacker,
            target: AgentId::PLAYER,
            amount: damage,
            critical,
        });

        if player.health.is_depleted() {
            self.kill_player(attacker, out_events);
        }
    }

    fn kill_player(&mut self, killer: AgentId, out_events: &mut Vec<Event>) {
        let immunity = self.config.immunity();
        let player = &mut self.player;
        player.dead = true;
        player.immune_for = immunity;
        player.route.clear();
        let tile = player.body.tile;
        if player.target.take().is_some() {
            out_events.push(Event::TargetChanged { target: None });
        }
        self.occupancy.remove(AgentId::PLAYER, tile);

        tracing::info!(
            target: "realmwalk::world",
            killer = killer.get(),
            ?tile,
            "player died"
        );
        out_events.push(Event::PlayerDied { killer });
    }

    fn resolve_player_attack(
        &mut self,
        target: AgentId,
        damage: u32,
        critical: bool,
        out_events: &mut Vec<Event>,
    ) {
        if self.player.dead {
            return;
        }
        let flash = self.config.flash();
        let Some(hostile) = self.hostiles.get_mut(&target) else {
            return;
        };
        hostile.health = hostile.health.damaged(damage);
        hostile.hit_flash = flash;
        hostile.critical_flash = if critical { flash } else { Duration::ZERO };
        let killed = hostile.health.is_depleted();
        let tile = hostile.body.tile;

        out_events.push(Event::AttackLanded {
            attacker: AgentId::PLAYER,
            target,
            critical,
        });
        out_events.push(Event::DamageDealt {
            attacker: AgentId::PLAYER,
            target,
            amount: damage,
            critical,
        });

        if killed {
            if let Some(hostile) = self.remove_hostile(target, out_events) {
                tracing::info!(
                    target: "realmwalk::world",
                    agent = target.get(),
                    name = %hostile.stats.name,
                    ?tile,
                    "hostile killed"
                );
            }
            out_events.push(Event::AgentDied { agent: target, tile });
        }
    }

    fn set_player_target(&mut self, target: Option<AgentId>, out_events: &mut Vec<Event>) {
        if let Some(agent) = target {
            if !self.hostiles.contains_key(&agent) {
                tracing::debug!(
                    target: "realmwalk::world",
                    agent = agent.get(),
                    "ignored target that is not a hostile"
                );
                return;
            }
        }
        if self.player.target != target {
            self.player.target = target;
            out_events.push(Event::TargetChanged { target });
        }
    }

    fn spawn_hostile(&mut self, stats: HostileStats, tile: TileCoord, out_events: &mut Vec<Event>) {
        if !self.map.is_walkable(tile) || self.occupancy.is_occupied(tile, None) {
            tracing::debug!(target: "realmwalk::world", ?tile, "spawn rejected");
            out_events.push(Event::SpawnRejected { tile });
            return;
        }

        let agent = AgentId::new(self.next_hostile);
        self.next_hostile = self.next_hostile.saturating_add(1);
        tracing::info!(
            target: "realmwalk::world",
            agent = agent.get(),
            name = %stats.name,
            ?tile,
            "hostile spawned"
        );
        self.occupancy.insert(agent, tile);
        let _ = self.hostiles.insert(agent, Hostile::new(agent, stats, tile));
        out_events.push(Event::HostileSpawned { agent, tile });
    }

    fn despawn_hostile(&mut self, agent: AgentId, out_events: &mut Vec<Event>) {
        if let Some(hostile) = self.remove_hostile(agent, out_events) {
            let tile = hostile.body.tile;
            tracing::info!(
                target: "realmwalk::world",
                agent = agent.get(),
                name = %hostile.stats.name,
                ?tile,
                spawn = ?hostile.spawn,
                "hostile despawned"
            );
            out_events.push(Event::HostileDespawned { agent, tile });
        }
    }

    fn remove_hostile(&mut self, agent: AgentId, out_events: &mut Vec<Event>) -> Option<Hostile> {
        let hostile = self.hostiles.remove(&agent)?;
        self.occupancy.remove(agent, hostile.body.tile);
        if self.player.target == Some(agent) {
            self.player.target = None;
            out_events.push(Event::TargetChanged { target: None });
        }
        Some(hostile)
    }

    fn respawn_player(&mut self, out_events: &mut Vec<Event>) {
        if !self.player.dead {
            return;
        }
        let preferred = self
            .config
            .player_spawn
            .unwrap_or_else(|| self.map.dimensions().center());
        let Some(tile) = nearest_open_tile(&self.map, &self.occupancy, preferred) else {
            tracing::debug!(target: "realmwalk::world", "no free tile to respawn the player on");
            return;
        };

        let immunity = self.config.immunity();
        let player = &mut self.player;
        player.health = player.health.restored();
        player.dead = false;
        player.immune_for = immunity;
        player.under_attack_for = Duration::ZERO;
        player.critical_flash = Duration::ZERO;
        player.route.clear();
        player.body = Body::on(tile);
        self.occupancy.insert(AgentId::PLAYER, tile);

        tracing::info!(target: "realmwalk::world", ?tile, "player respawned");
        out_events.push(Event::PlayerRespawned { tile });
    }
}

/// Applies the provided command to the world, mutating state deterministically.
pub fn apply(world: &mut World, command: Command, out_events: &mut Vec<Event>) {
    match command {
        Command::AdvanceTimers { dt, agents } => {
            world.elapsed = world.elapsed.saturating_add(dt);
            world.player.tick(dt);
            for agent in agents {
                if let Some(hostile) = world.hostiles.get_mut(&agent) {
                    hostile.tick(dt);
                }
            }
            out_events.push(Event::TimeAdvanced { dt });
        }
        Command::AdvanceMovement { dt, agents } => {
            world.advance_player(dt, out_events);
            for agent in agents {
                if !agent.is_player() {
                    world.advance_hostile(agent, dt, out_events);
                }
            }
        }
        Command::AssignRoute {
            agent,
            route,
            retry_after,
        } => world.assign_route(agent, route, retry_after, out_events),
        Command::ClearRoute { agent } => {
            if let Some((_, route)) = world.route_slot(agent) {
                route.clear();
            }
        }
        Command::DeferPlanning { agent, retry_after } => {
            if let Some(hostile) = world.hostiles.get_mut(&agent) {
                hostile.planning_in = retry_after;
            }
        }
        Command::StepToward {
            agent,
            toward,
            retry_after,
        } => world.step_toward(agent, toward, retry_after, out_events),
        Command::ResolveHostileAttack {
            attacker,
            damage,
            critical,
            cooldown,
        } => world.resolve_hostile_attack(attacker, damage, critical, cooldown, out_events),
        Command::ResolvePlayerAttack {
            target,
            damage,
            critical,
        } => world.resolve_player_attack(target, damage, critical, out_events),
        Command::SetPlayerTarget { target } => world.set_player_target(target, out_events),
        Command::SpawnHostile { stats, tile } => world.spawn_hostile(stats, tile, out_events),
        Command::DespawnHostile { agent } => world.despawn_hostile(agent, out_events),
        Command::RespawnPlayer => world.respawn_player(out_events),
    }
}

/// Query functions that provide read-only access to the world state.
pub mod query {
    use std::{collections::BTreeSet, time::Duration};

    use realmwalk_core::{
        AgentId, AgentSnapshot, AgentView, ClusterId, GridDimensions, OccupancyView,
        PlayerSnapshot, Route, TileCoord, TileRect, Walkability,
    };

    use super::{OccupancyIndex, TileMap, World, WorldConfig};

    /// Captures a read-only view of every hostile.
    #[must_use]
    pub fn agent_view(world: &World) -> AgentView {
        AgentView::from_snapshots(
            world
                .hostiles
                .values()
                .map(|hostile| hostile.snapshot(world.player.target))
                .collect(),
        )
    }

    /// Snapshot of a single hostile.
    #[must_use]
    pub fn hostile(world: &World, agent: AgentId) -> Option<AgentSnapshot> {
        world
            .hostiles
            .get(&agent)
            .map(|hostile| hostile.snapshot(world.player.target))
    }

    /// Number of hostiles alive.
    #[must_use]
    pub fn hostile_count(world: &World) -> usize {
        world.hostiles.len()
    }

    /// Snapshot of the player.
    #[must_use]
    pub fn player(world: &World) -> PlayerSnapshot {
        world.player.snapshot()
    }

    /// Route the agent is following, for path previews.
    #[must_use]
    pub fn route(world: &World, agent: AgentId) -> Option<&Route> {
        if agent.is_player() {
            Some(&world.player.route)
        } else {
            world.hostiles.get(&agent).map(|hostile| &hostile.route)
        }
    }

    /// Read-only view into the occupancy index.
    #[must_use]
    pub fn occupancy_view(world: &World) -> OccupancyView<'_> {
        world.occupancy.view(!world.player.dead)
    }

    /// Direct access to the occupancy index, for consistency checks.
    #[must_use]
    pub fn occupancy_index(world: &World) -> &OccupancyIndex {
        &world.occupancy
    }

    /// Reports whether any live agent stands on the tile.
    #[must_use]
    pub fn is_tile_occupied(world: &World, tile: TileCoord) -> bool {
        occupancy_view(world).is_occupied(tile, None)
    }

    /// Agents registered to the clusters, sorted by id.
    #[must_use]
    pub fn agents_in(world: &World, clusters: &BTreeSet<ClusterId>) -> Vec<AgentId> {
        occupancy_view(world).agents_in(clusters)
    }

    /// Cluster an agent is registered in.
    #[must_use]
    pub fn cluster_of_agent(world: &World, agent: AgentId) -> Option<ClusterId> {
        world.occupancy.cluster_of_agent(agent)
    }

    /// Hostiles in the clusters overlapping `bounds` grown by `margin`, sorted by id.
    #[must_use]
    pub fn active_agents(world: &World, bounds: TileRect, margin: u32) -> Vec<AgentId> {
        let view = occupancy_view(world);
        let clusters = view.clusters_overlapping(bounds, margin, world.map.dimensions());
        view.agents_in(&clusters)
            .into_iter()
            .filter(|agent| !agent.is_player())
            .collect()
    }

    /// Hostiles within `radius` tiles of the player, nearest first.
    #[must_use]
    pub fn nearby_hostiles(world: &World, radius: u32) -> Vec<AgentId> {
        let origin = world.player.body.tile;
        let mut nearby: Vec<(u32, AgentId)> = world
            .hostiles
            .values()
            .map(|hostile| (hostile.body.tile.chebyshev_distance(origin), hostile.id))
            .filter(|(distance, _)| *distance <= radius)
            .collect();
        nearby.sort_unstable();
        nearby.into_iter().map(|(_, agent)| agent).collect()
    }

    /// Static tile map.
    #[must_use]
    pub fn tile_map(world: &World) -> &TileMap {
        &world.map
    }

    /// Dimensions of the grid.
    #[must_use]
    pub fn dimensions(world: &World) -> GridDimensions {
        world.map.dimensions()
    }

    /// Side length of a tile in world units.
    #[must_use]
    pub fn tile_length(world: &World) -> f32 {
        world.config.tile_length
    }

    /// Simulated time accumulated by timer advances.
    #[must_use]
    pub fn elapsed(world: &World) -> Duration {
        world.elapsed
    }

    /// Configuration the world was created with.
    #[must_use]
    pub fn config(world: &World) -> &WorldConfig {
        &world.config
    }
}

fn record_advance(
    occupancy: &mut OccupancyIndex,
    agent: AgentId,
    outcome: Advance,
    out_events: &mut Vec<Event>,
) -> bool {
    if let Some((from, to)) = outcome.tile_change() {
        occupancy.on_agent_moved(agent, from, to);
        out_events.push(Event::AgentMoved { agent, from, to });
    }

    match outcome {
        Advance::Arrived { to, .. } => {
            out_events.push(Event::RouteCompleted { agent, tile: to });
            false
        }
        Advance::Blocked { at, .. } => {
            tracing::debug!(
                target: "realmwalk::world",
                agent = agent.get(),
                ?at,
                "route blocked"
            );
            out_events.push(Event::RouteBlocked { agent, at });
            true
        }
        Advance::Idle | Advance::Moved { .. } => false,
    }
}

fn axis_step(from: u32, to: u32) -> i32 {
    match to.cmp(&from) {
        std::cmp::Ordering::Greater => 1,
        std::cmp::Ordering::Less => -1,
        std::cmp::Ordering::Equal => 0,
    }
}

/// Walkable, unoccupied tile nearest to `preferred`, scanning square rings outward.
fn nearest_open_tile(
    map: &TileMap,
    occupancy: &OccupancyIndex,
    preferred: TileCoord,
) -> Option<TileCoord> {
    let dimensions = map.dimensions();
    if dimensions.width() == 0 || dimensions.height() == 0 {
        return None;
    }
    let center = TileCoord::new(
        preferred.x().min(dimensions.width() - 1),
        preferred.y().min(dimensions.height() - 1),
    );
    let reach = dimensions.width().max(dimensions.height());

    for radius in 0..=reach {
        let ring = TileRect::around(center, radius).expanded(0, dimensions);
        for y in ring.min().y()..=ring.max().y() {
            for x in ring.min().x()..=ring.max().x() {
                let tile = TileCoord::new(x, y);
                if tile.chebyshev_distance(center) != radius {
                    continue;
                }
                if map.is_walkable(tile) && !occupancy.is_occupied(tile, None) {
                    return Some(tile);
                }
            }
        }
    }
    None
}

#[derive(Clone, Copy, Debug)]
struct Body {
    tile: TileCoord,
    position: Vec2,
}

impl Body {
    fn on(tile: TileCoord) -> Self {
        Self {
            tile,
            position: tile.to_position(),
        }
    }
}

impl Mover for Body {
    fn tile(&self) -> TileCoord {
        self.tile
    }

    fn set_tile(&mut self, tile: TileCoord) {
        self.tile = tile;
    }

    fn position(&self) -> Vec2 {
        self.position
    }

    fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }
}

#[derive(Clone, Debug)]
struct Player {
    body: Body,
    route: Route,
    health: Health,
    stats: CombatStats,
    speed: f32,
    dead: bool,
    immune_for: Duration,
    under_attack_for: Duration,
    critical_flash: Duration,
    target: Option<AgentId>,
}

impl Player {
    fn tick(&mut self, dt: Duration) {
        self.immune_for = self.immune_for.saturating_sub(dt);
        self.under_attack_for = self.under_attack_for.saturating_sub(dt);
        self.critical_flash = self.critical_flash.saturating_sub(dt);
    }

    fn snapshot(&self) -> PlayerSnapshot {
        PlayerSnapshot {
            tile: self.body.tile,
            position: self.body.position,
            health: self.health,
            stats: self.stats,
            speed: self.speed,
            dead: self.dead,
            immune_for: self.immune_for,
            under_attack_for: self.under_attack_for,
            critical_flash: self.critical_flash,
            target: self.target,
            route_len: self.route.len(),
        }
    }
}

#[derive(Clone, Debug)]
struct Hostile {
    id: AgentId,
    stats: HostileStats,
    body: Body,
    spawn: TileCoord,
    health: Health,
    route: Route,
    planning_in: Duration,
    attack_ready_in: Duration,
    hit_flash: Duration,
    critical_flash: Duration,
}

impl Hostile {
    fn new(id: AgentId, stats: HostileStats, tile: TileCoord) -> Self {
        Self {
            id,
            health: Health::full(stats.max_health),
            stats,
            body: Body::on(tile),
            spawn: tile,
            route: Route::empty(),
            planning_in: Duration::ZERO,
            attack_ready_in: Duration::ZERO,
            hit_flash: Duration::ZERO,
            critical_flash: Duration::ZERO,
        }
    }

    fn tick(&mut self, dt: Duration) {
        self.planning_in = self.planning_in.saturating_sub(dt);
        self.attack_ready_in = self.attack_ready_in.saturating_sub(dt);
        self.hit_flash = self.hit_flash.saturating_sub(dt);
        self.critical_flash = self.critical_flash.saturating_sub(dt);
    }

    fn snapshot(&self, player_target: Option<AgentId>) -> AgentSnapshot {
        AgentSnapshot {
            id: self.id,
            tile: self.body.tile,
            position: self.body.position,
            spawn: self.spawn,
            health: self.health,
            speed: self.stats.speed,
            attack: self.stats.attack,
            experience: self.stats.experience,
            planning_in: self.planning_in,
            attack_ready_in: self.attack_ready_in,
            hit_flash: self.hit_flash,
            critical_flash: self.critical_flash,
            route_len: self.route.len(),
            targeted: player_target == Some(self.id),
        }
    }
}
