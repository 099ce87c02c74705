#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Waypoint-following movement controller shared by the player and hostiles.
//!
//! The controller moves an agent's continuous position toward the front
//! waypoint of its [`Route`], re-validating that waypoint every tick. An
//! agent's tile only changes when it lands on a waypoint, so it always
//! occupies either the tile it left or the tile it validated.

use std::time::Duration;

use realmwalk_core::{Route, TileCoord, Vec2};

/// Distance in tiles under which an agent counts as standing on a waypoint.
pub const ARRIVAL_TOLERANCE: f32 = 0.05;

/// Capability shared by every agent the controller can move.
pub trait Mover {
    /// Tile the agent currently occupies.
    fn tile(&self) -> TileCoord;

    /// Records the tile the agent now occupies.
    fn set_tile(&mut self, tile: TileCoord);

    /// Continuous position in tile units.
    fn position(&self) -> Vec2;

    /// Replaces the continuous position.
    fn set_position(&mut self, position: Vec2);
}

/// Coarse state of an agent's route.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MotionState {
    /// No waypoints remain.
    Idle,
    /// Waypoints remain to be reached.
    Following,
}

impl MotionState {
    /// State implied by the route.
    #[must_use]
    pub fn of(route: &Route) -> Self {
        if route.is_empty() {
            Self::Idle
        } else {
            Self::Following
        }
    }
}

/// Outcome of advancing an agent for one tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Advance {
    /// The agent had no route.
    Idle,
    /// The agent is still following its route.
    Moved {
        /// Tile occupied before the tick.
        from: TileCoord,
        /// Tile occupied after the tick.
        to: TileCoord,
    },
    /// The agent consumed the last waypoint of its route.
    Arrived {
        /// Tile occupied before the tick.
        from: TileCoord,
        /// Tile the agent arrived on.
        to: TileCoord,
    },
    /// The next waypoint was unavailable; the route was cleared and the agent
    /// stopped on its current tile.
    Blocked {
        /// Tile occupied before the tick.
        from: TileCoord,
        /// Tile the agent stopped on.
        to: TileCoord,
        /// Waypoint that could not be entered.
        at: TileCoord,
    },
}

impl Advance {
    /// Tile change the occupancy index must be told about, if any.
    #[must_use]
    pub fn tile_change(&self) -> Option<(TileCoord, TileCoord)> {
        match *self {
            Self::Moved { from, to } | Self::Arrived { from, to } | Self::Blocked { from, to, .. }
                if from != to =>
            {
                Some((from, to))
            }
            _ => None,
        }
    }
}

/// Advances `mover` along `route` by `speed * dt` tiles.
///
/// Waypoints already within [`ARRIVAL_TOLERANCE`] are snapped onto and popped,
/// possibly several in one tick. Every waypoint is checked with `is_free`
/// before the mover heads for it and again before it lands there; when the
/// check fails the route is cleared and the mover stays put.
/// Movement is clamped so the mover never passes the waypoint it heads for.
pub fn advance<M, F>(
    mover: &mut M,
    route: &mut Route,
    dt: Duration,
    speed: f32,
    is_free: F,
) -> Advance
where
    M: Mover + ?Sized,
    F: Fn(TileCoord) -> bool,
{
    if route.is_empty() {
        return Advance::Idle;
    }

    let from = mover.tile();
    let mut budget = speed.max(0.0) * dt.as_secs_f32();

    loop {
        let Some(next) = route.front() else {
            return Advance::Arrived {
                from,
                to: mover.tile(),
            };
        };

        let target = next.to_position();
        let offset = target - mover.position();
        let distance = offset.length();

        if distance <= ARRIVAL_TOLERANCE {
            if next != mover.tile() && !is_free(next) {
                route.clear();
                return Advance::Blocked {
                    from,
                    to: mover.tile(),
                    at: next,
                };
            }
            land_on(mover, route, next);
            continue;
        }

        if budget <= 0.0 {
            break;
        }

        if !is_free(next) {
            route.clear();
            return Advance::Blocked {
                from,
                to: mover.tile(),
                at: next,
            };
        }

        if budget >= distance {
            land_on(mover, route, next);
            budget = 0.0;
            continue;
        }

        mover.set_position(mover.position() + offset / distance * budget);
        break;
    }

    if route.is_empty() {
        Advance::Arrived {
            from,
            to: mover.tile(),
        }
    } else {
        Advance::Moved {
            from,
            to: mover.tile(),
        }
    }
}

fn land_on<M: Mover + ?Sized>(mover: &mut M, route: &mut Route, waypoint: TileCoord) {
    mover.set_position(waypoint.to_position());
    mover.set_tile(waypoint);
    let _ = route.pop_front();
}
