#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Rate-limited scheduler that drives every hostile near the viewer.
//!
//! Each tick the scheduler selects the hostiles in clusters overlapping the
//! view, counts down their timers, pursues the player within aggro range
//! (full routes up close, straight steps farther out), resolves attacks and
//! sends strays home by despawning them. Pathfinder calls are capped per tick;
//! a hostile that misses out keeps its timer and tries again next tick.

use std::{collections::BTreeMap, time::Duration};

use rand::Rng;
use realmwalk_core::{
    AgentId, AgentSnapshot, AgentView, Command, Event, ExperienceSink, GridDimensions,
    OccupancyView, PlayerSnapshot, Route, TileCoord, TileRect, Walkability,
};
use realmwalk_system_combat::{hostile_attack, CombatTuning};
use realmwalk_system_pathfinding::{Pathfinder, PathfinderConfig, PlanRequest, PlanningFailure};
use serde::{Deserialize, Serialize};

/// Tunables of the hostile scheduler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostileAiConfig {
    /// Chebyshev distance within which hostiles pursue the player.
    pub aggro_radius: u32,
    /// Distance within which pursuit uses full routes instead of straight steps.
    pub full_path_radius: u32,
    /// Pathfinder calls allowed per tick.
    pub max_paths_per_tick: usize,
    /// Delay before re-planning after a route was assigned, in milliseconds.
    pub path_retry_ms: u64,
    /// Delay between straight steps toward a distant player, in milliseconds.
    pub coarse_retry_ms: u64,
    /// Delay before retrying after planning failed, in milliseconds.
    pub failure_retry_ms: u64,
    /// Distance from its spawn beyond which a hostile is despawned.
    pub despawn_radius: u32,
    /// Tiles added around the view bounds when selecting active clusters.
    pub view_margin: u32,
    /// Distance the player may move away from the tile a hostile last aimed
    /// at before that hostile re-plans regardless of its timer.
    pub goal_drift_tolerance: u32,
}

impl HostileAiConfig {
    fn path_retry(&self) -> Duration {
        Duration::from_millis(self.path_retry_ms)
    }

    fn coarse_retry(&self) -> Duration {
        Duration::from_millis(self.coarse_retry_ms)
    }

    fn failure_retry(&self) -> Duration {
        Duration::from_millis(self.failure_retry_ms)
    }
}

impl Default for HostileAiConfig {
    fn default() -> Self {
        Self {
            aggro_radius: 10,
            full_path_radius: 6,
            max_paths_per_tick: 5,
            path_retry_ms: 500,
            coarse_retry_ms: 1_000,
            failure_retry_ms: 250,
            despawn_radius: 15,
            view_margin: 2,
            goal_drift_tolerance: 0,
        }
    }
}

/// Hostile scheduler owning the pathfinder its hostiles plan with.
#[derive(Debug)]
pub struct HostileAi {
    config: HostileAiConfig,
    combat: CombatTuning,
    pathfinder: Pathfinder,
    paths_planned: usize,
    aims: BTreeMap<AgentId, TileCoord>,
}

impl HostileAi {
    /// Creates a scheduler with its own pathfinder.
    #[must_use]
    pub fn new(config: HostileAiConfig, pathfinder: PathfinderConfig, combat: CombatTuning) -> Self {
        Self {
            config,
            combat,
            pathfinder: Pathfinder::new(pathfinder),
            paths_planned: 0,
            aims: BTreeMap::new(),
        }
    }

    /// Configuration the scheduler was created with.
    #[must_use]
    pub fn config(&self) -> &HostileAiConfig {
        &self.config
    }

    /// Pathfinder used for full routes.
    #[must_use]
    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Pathfinder calls made by the latest [`HostileAi::plan`].
    #[must_use]
    pub fn paths_planned(&self) -> usize {
        self.paths_planned
    }

    /// Hostiles registered to clusters overlapping `bounds` grown by the view margin.
    #[must_use]
    pub fn active_set(
        &self,
        occupancy: &OccupancyView<'_>,
        dimensions: GridDimensions,
        bounds: TileRect,
    ) -> Vec<AgentId> {
        let clusters = occupancy.clusters_overlapping(bounds, self.config.view_margin, dimensions);
        occupancy
            .agents_in(&clusters)
            .into_iter()
            .filter(|agent| !agent.is_player())
            .collect()
    }

    /// Counts down the timers of the active hostiles and the player.
    pub fn advance_timers(&self, dt: Duration, active: &[AgentId], out: &mut Vec<Command>) {
        out.push(Command::AdvanceTimers {
            dt,
            agents: active.to_vec(),
        });
    }

    /// Player tile `agent` last planned or stepped toward.
    #[must_use]
    pub fn aim(&self, agent: AgentId) -> Option<TileCoord> {
        self.aims.get(&agent).copied()
    }

    /// Drops debounce history and aims of hostiles that left the world.
    pub fn observe(&mut self, events: &[Event]) {
        for event in events {
            match event {
                Event::AgentDied { agent, .. } | Event::HostileDespawned { agent, .. } => {
                    self.pathfinder.forget(*agent);
                    let _ = self.aims.remove(agent);
                }
                _ => {}
            }
        }
    }

    /// Emits pursuit and despawn commands for the active hostiles, in id order.
    ///
    /// A hostile plans once its timer has run out, or earlier when the player
    /// moved more than `goal_drift_tolerance` away from the tile it last aimed at.
    pub fn plan<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        occupancy: &OccupancyView<'_>,
        agents: &AgentView,
        active: &[AgentId],
        player: &PlayerSnapshot,
        now: Duration,
        out: &mut Vec<Command>,
    ) {
        self.paths_planned = 0;
        let mut deferred = 0_usize;

        for snapshot in active.iter().filter_map(|agent| agents.get(*agent)) {
            if snapshot.tile.chebyshev_distance(snapshot.spawn) > self.config.despawn_radius {
                tracing::debug!(
                    target: "realmwalk::hostile_ai",
                    agent = snapshot.id.get(),
                    tile = ?snapshot.tile,
                    spawn = ?snapshot.spawn,
                    "hostile strayed too far from its spawn"
                );
                out.push(Command::DespawnHostile { agent: snapshot.id });
                continue;
            }

            if player.dead {
                continue;
            }
            let drifted = self.aims.get(&snapshot.id).is_some_and(|aim| {
                aim.chebyshev_distance(player.tile) > self.config.goal_drift_tolerance
            });
            if !snapshot.planning_in.is_zero() && !drifted {
                continue;
            }
            let distance = snapshot.tile.chebyshev_distance(player.tile);
            if distance > self.config.aggro_radius {
                continue;
            }

            if distance > self.config.full_path_radius {
                let _ = self.aims.insert(snapshot.id, player.tile);
                out.push(Command::StepToward {
                    agent: snapshot.id,
                    toward: player.tile,
                    retry_after: self.config.coarse_retry(),
                });
                continue;
            }

            if in_attack_position(snapshot.tile, player.tile, self.combat.attack_range) {
                let _ = self.aims.insert(snapshot.id, player.tile);
                if snapshot.route_len > 0 {
                    out.push(Command::ClearRoute { agent: snapshot.id });
                }
                out.push(Command::DeferPlanning {
                    agent: snapshot.id,
                    retry_after: self.config.path_retry(),
                });
                continue;
            }

            if self.paths_planned >= self.config.max_paths_per_tick {
                deferred += 1;
                continue;
            }
            self.paths_planned += 1;
            if let Some(command) = self.pursue(map, occupancy, snapshot, player.tile, now) {
                let _ = self.aims.insert(snapshot.id, player.tile);
                out.push(command);
            }
        }

        if deferred > 0 {
            tracing::trace!(
                target: "realmwalk::hostile_ai",
                deferred,
                budget = self.config.max_paths_per_tick,
                "pathfinding budget exhausted"
            );
        }
    }

    fn pursue<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        occupancy: &OccupancyView<'_>,
        hostile: &AgentSnapshot,
        player: TileCoord,
        now: Duration,
    ) -> Option<Command> {
        let request = PlanRequest {
            requester: Some(hostile.id),
            start: hostile.tile,
            goal: player,
            now,
        };

        let command = match self.pathfinder.plan(map, occupancy, request) {
            Ok(route) => {
                let route = trim_route(route, hostile.tile, player, self.combat.attack_range);
                if route.is_empty() {
                    Command::DeferPlanning {
                        agent: hostile.id,
                        retry_after: self.config.failure_retry(),
                    }
                } else {
                    Command::AssignRoute {
                        agent: hostile.id,
                        route,
                        retry_after: self.config.path_retry(),
                    }
                }
            }
            Err(PlanningFailure::Debounced) => return None,
            Err(failure) => {
                tracing::debug!(
                    target: "realmwalk::hostile_ai",
                    agent = hostile.id.get(),
                    %failure,
                    "pursuit planning failed"
                );
                Command::DeferPlanning {
                    agent: hostile.id,
                    retry_after: self.config.failure_retry(),
                }
            }
        };
        Some(command)
    }

    /// Emits attacks of active hostiles lined up with the player.
    ///
    /// Any aggroed hostile may attack, whether or not the player targets it,
    /// and each hostile tracks its own cooldown. Damage rolled earlier in the
    /// pass counts against the player, so no hostile attacks a player an
    /// earlier attack already killed.
    pub fn resolve_attacks<R, X>(
        &self,
        agents: &AgentView,
        active: &[AgentId],
        player: &PlayerSnapshot,
        rng: &mut R,
        experience: &mut X,
        out: &mut Vec<Command>,
    ) where
        R: Rng + ?Sized,
        X: ExperienceSink + ?Sized,
    {
        let mut target = *player;
        for snapshot in active.iter().filter_map(|agent| agents.get(*agent)) {
            if !target.is_vulnerable() {
                break;
            }
            if snapshot.tile.chebyshev_distance(target.tile) > self.config.aggro_radius {
                continue;
            }
            let Some(command) = hostile_attack(snapshot, &target, rng, &self.combat, experience)
            else {
                continue;
            };
            if let Command::ResolveHostileAttack { damage, .. } = command {
                target.health = target.health.damaged(damage);
                target.dead = target.health.is_depleted();
            }
            out.push(command);
        }
    }
}

fn in_attack_position(tile: TileCoord, player: TileCoord, range: u32) -> bool {
    tile != player && tile.is_aligned_with(player) && tile.chebyshev_distance(player) <= range
}

/// Drops waypoints equal to `from` and everything past the first tile the
/// hostile could attack from.
fn trim_route(mut route: Route, from: TileCoord, player: TileCoord, range: u32) -> Route {
    while route.front() == Some(from) {
        let _ = route.pop_front();
    }
    let first_attack = route
        .iter()
        .position(|tile| in_attack_position(*tile, player, range));
    if let Some(index) = first_attack {
        route.truncate(index + 1);
    }
    route
}
