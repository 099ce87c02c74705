#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Player input entry points.
//!
//! Turns "walk to this tile" and "step in this direction" requests into
//! player routes, and re-plans when the world reports the route blocked.

use std::time::Duration;

use realmwalk_core::{
    AgentId, Command, Event, OccupancyView, PlayerSnapshot, Route, TileCoord, Walkability,
};
use realmwalk_system_pathfinding::{Pathfinder, PathfinderConfig, PlanRequest, PlanningFailure};
use serde::{Deserialize, Serialize};

/// Tunables of the player controller.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerControlConfig {
    /// A repeated move request within this many tiles of the current goal
    /// keeps the active route instead of re-planning.
    pub goal_tolerance: u32,
}

/// Unit step requested by directional input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Direction {
    dx: i32,
    dy: i32,
}

impl Direction {
    /// Creates a direction, clamping each axis to `-1..=1`.
    #[must_use]
    pub fn new(dx: i32, dy: i32) -> Self {
        Self {
            dx: dx.signum(),
            dy: dy.signum(),
        }
    }

    /// Reports whether the direction asks for no movement.
    #[must_use]
    pub const fn is_zero(&self) -> bool {
        self.dx == 0 && self.dy == 0
    }
}

/// Read-only state the controller plans against.
pub struct Surroundings<'a, W: ?Sized> {
    /// Static walkability of the grid.
    pub map: &'a W,
    /// Live occupancy.
    pub occupancy: OccupancyView<'a>,
    /// Current player state.
    pub player: &'a PlayerSnapshot,
    /// Simulation time of the request.
    pub now: Duration,
}

/// Translates player input into routes.
#[derive(Debug)]
pub struct PlayerControl {
    config: PlayerControlConfig,
    pathfinder: Pathfinder,
    goal: Option<TileCoord>,
    direction: Option<Direction>,
}

impl PlayerControl {
    /// Creates a controller with its own pathfinder.
    #[must_use]
    pub fn new(config: PlayerControlConfig, pathfinder: PathfinderConfig) -> Self {
        Self {
            config,
            pathfinder: Pathfinder::new(pathfinder),
            goal: None,
            direction: None,
        }
    }

    /// Tile the player is walking toward, if any.
    #[must_use]
    pub fn goal(&self) -> Option<TileCoord> {
        self.goal
    }

    /// Direction held for continuous movement, if any.
    #[must_use]
    pub fn direction(&self) -> Option<Direction> {
        self.direction
    }

    /// Pathfinder used for player routes.
    #[must_use]
    pub fn pathfinder(&self) -> &Pathfinder {
        &self.pathfinder
    }

    /// Plans a route to `tile` and assigns it to the player.
    ///
    /// Returns `false` when no route could be planned. A request whose tile
    /// lies within the goal tolerance of the route being followed keeps that
    /// route.
    pub fn request_move_to<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        tile: TileCoord,
        out: &mut Vec<Command>,
    ) -> bool {
        if at.player.dead {
            return false;
        }
        self.direction = None;

        if let Some(goal) = self.goal {
            if at.player.route_len > 0 && goal.chebyshev_distance(tile) <= self.config.goal_tolerance
            {
                return true;
            }
        }

        self.goal = Some(tile);
        self.plan_to_goal(at, tile, out)
    }

    /// Moves the player one tile in the direction of `dx`, `dy`.
    ///
    /// A single step needs the adjacent tile to be walkable and free. A
    /// continuous request plans toward the adjacent tile, falling back to the
    /// nearest free one, and keeps stepping while the direction is held. A
    /// zero direction stops the player.
    pub fn request_move_direction<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        dx: i32,
        dy: i32,
        continuous: bool,
        out: &mut Vec<Command>,
    ) -> bool {
        if at.player.dead {
            return false;
        }
        self.goal = None;

        let direction = Direction::new(dx, dy);
        if direction.is_zero() {
            self.direction = None;
            out.push(Command::ClearRoute {
                agent: AgentId::PLAYER,
            });
            return true;
        }

        if !continuous {
            self.direction = None;
            return self.single_step(at, direction, out);
        }

        let changed = self.direction != Some(direction);
        self.direction = Some(direction);
        if changed || at.player.route_len == 0 {
            self.continuous_step(at, direction, out)
        } else {
            true
        }
    }

    /// Reacts to world events and keeps held or interrupted movement going.
    pub fn handle<W: Walkability + ?Sized>(
        &mut self,
        events: &[Event],
        at: &Surroundings<'_, W>,
        out: &mut Vec<Command>,
    ) {
        for event in events {
            match event {
                Event::RouteCompleted { agent, .. } if agent.is_player() => self.goal = None,
                Event::PlayerDied { .. } => {
                    self.goal = None;
                    self.direction = None;
                }
                _ => {}
            }
        }

        if at.player.dead || at.player.route_len > 0 {
            return;
        }

        if let Some(direction) = self.direction {
            let _ = self.continuous_step(at, direction, out);
        } else if let Some(goal) = self.goal {
            tracing::debug!(
                target: "realmwalk::player_control",
                ?goal,
                tile = ?at.player.tile,
                "re-planning interrupted route"
            );
            let _ = self.plan_to_goal(at, goal, out);
        }
    }

    fn single_step<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        direction: Direction,
        out: &mut Vec<Command>,
    ) -> bool {
        let target = at
            .player
            .tile
            .offset(direction.dx, direction.dy, at.map.dimensions())
            .filter(|tile| {
                at.map.is_walkable(*tile) && !at.occupancy.is_occupied(*tile, Some(AgentId::PLAYER))
            });

        match target {
            Some(tile) => {
                out.push(Command::AssignRoute {
                    agent: AgentId::PLAYER,
                    route: Route::from(vec![tile]),
                    retry_after: Duration::ZERO,
                });
                true
            }
            None => {
                tracing::debug!(
                    target: "realmwalk::player_control",
                    ?direction,
                    tile = ?at.player.tile,
                    "step blocked"
                );
                false
            }
        }
    }

    fn continuous_step<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        direction: Direction,
        out: &mut Vec<Command>,
    ) -> bool {
        let dimensions = at.map.dimensions();
        let tile = at.player.tile;
        let target = TileCoord::new(
            clamp_axis(tile.x(), direction.dx, dimensions.width()),
            clamp_axis(tile.y(), direction.dy, dimensions.height()),
        );

        match self.plan(at, target) {
            Ok(route) => {
                out.push(Command::AssignRoute {
                    agent: AgentId::PLAYER,
                    route,
                    retry_after: Duration::ZERO,
                });
                true
            }
            Err(_) => false,
        }
    }

    fn plan_to_goal<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        goal: TileCoord,
        out: &mut Vec<Command>,
    ) -> bool {
        match self.plan(at, goal) {
            Ok(route) => {
                out.push(Command::AssignRoute {
                    agent: AgentId::PLAYER,
                    route,
                    retry_after: Duration::ZERO,
                });
                true
            }
            Err(PlanningFailure::Debounced) => false,
            Err(_) => {
                self.goal = None;
                out.push(Command::ClearRoute {
                    agent: AgentId::PLAYER,
                });
                false
            }
        }
    }

    fn plan<W: Walkability + ?Sized>(
        &mut self,
        at: &Surroundings<'_, W>,
        goal: TileCoord,
    ) -> Result<Route, PlanningFailure> {
        let request = PlanRequest {
            requester: Some(AgentId::PLAYER),
            start: at.player.tile,
            goal,
            now: at.now,
        };
        self.pathfinder
            .plan(at.map, &at.occupancy, request)
            .map_err(|failure| {
                tracing::debug!(
                    target: "realmwalk::player_control",
                    ?goal,
                    %failure,
                    "no route for the player"
                );
                failure
            })
    }
}

fn clamp_axis(value: u32, delta: i32, length: u32) -> u32 {
    value
        .saturating_add_signed(delta)
        .min(length.saturating_sub(1))
}
