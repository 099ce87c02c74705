#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Hierarchical grid pathfinder.
//!
//! Short hops run a best-first search directly over the tile grid. Long hops
//! between different clusters first route over a coarse [`ClusterGraph`] and
//! stitch fine searches between entrance tiles, falling back to one full
//! search when stitching fails. Every call works against an
//! [`OccupancySnapshot`] captured once, so the same inputs always produce the
//! same [`Route`].

use std::{collections::BTreeMap, time::Duration};

use realmwalk_core::{
    AgentId, ClusterId, GridDimensions, OccupancyView, Route, TileCoord, Walkability,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

mod cluster;
mod search;
mod smoothing;
mod snapshot;

pub use cluster::ClusterGraph;
pub use smoothing::{has_line_of_sight, smooth};
pub use snapshot::OccupancySnapshot;

use search::SearchScratch;
use snapshot::PlanningGrid;

/// Tuning knobs for the pathfinder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PathfinderConfig {
    /// Edge length of a cluster in tiles.
    pub cluster_size: u32,
    /// Rings searched around a blocked goal for a free substitute.
    pub search_radius: u32,
    /// Chebyshev distance above which hops in different clusters go through the cluster graph.
    pub hierarchical_threshold: u32,
    /// Minimum milliseconds between two plans for the same requester.
    pub debounce_ms: u64,
}

impl PathfinderConfig {
    /// Debounce window as a duration.
    #[must_use]
    pub const fn debounce(&self) -> Duration {
        Duration::from_millis(self.debounce_ms)
    }
}

impl Default for PathfinderConfig {
    fn default() -> Self {
        Self {
            cluster_size: 16,
            search_radius: 10,
            hierarchical_threshold: 24,
            debounce_ms: 100,
        }
    }
}

/// Single planning request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PlanRequest {
    /// Agent asking for the route. Its own tile never counts as occupied.
    /// Anonymous requests are never debounced.
    pub requester: Option<AgentId>,
    /// Tile the route starts from, excluded from the result.
    pub start: TileCoord,
    /// Tile the caller wants to reach.
    pub goal: TileCoord,
    /// Simulation time the request is issued at.
    pub now: Duration,
}

/// Reasons a planning call produced no route.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
pub enum PlanningFailure {
    /// The start or goal lies outside the grid.
    #[error("tile {tile:?} lies outside the grid")]
    OutOfBounds {
        /// Offending tile.
        tile: TileCoord,
    },
    /// The requester planned too recently.
    #[error("planning request arrived inside the debounce window")]
    Debounced,
    /// No free tile exists close enough to the requested goal.
    #[error("no free tile within {radius} rings of {goal:?}")]
    NoFreeTileNearGoal {
        /// Requested goal.
        goal: TileCoord,
        /// Rings that were searched.
        radius: u32,
    },
    /// The requester already stands on the adjusted goal.
    #[error("start already equals the goal")]
    AlreadyAtGoal,
    /// The search exhausted every reachable tile.
    #[error("goal {goal:?} is unreachable from {start:?}")]
    Unreachable {
        /// Start tile of the search.
        start: TileCoord,
        /// Adjusted goal of the search.
        goal: TileCoord,
    },
}

/// Stateful pathfinder owning search buffers, the cached cluster graph and
/// per-requester debounce bookkeeping.
#[derive(Debug, Default)]
pub struct Pathfinder {
    config: PathfinderConfig,
    scratch: SearchScratch,
    graph: Option<ClusterGraph>,
    last_planned: BTreeMap<AgentId, Duration>,
    invocations: u64,
}

impl Pathfinder {
    /// Creates a pathfinder with the provided configuration.
    #[must_use]
    pub fn new(config: PathfinderConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Configuration the pathfinder was created with.
    #[must_use]
    pub const fn config(&self) -> &PathfinderConfig {
        &self.config
    }

    /// Number of planning calls made so far, debounced calls included.
    #[must_use]
    pub const fn invocations(&self) -> u64 {
        self.invocations
    }

    /// Drops the cached cluster graph so the next long hop rebuilds it.
    pub fn invalidate(&mut self) {
        self.graph = None;
    }

    /// Forgets the debounce history of an agent that left the world.
    pub fn forget(&mut self, agent: AgentId) {
        let _ = self.last_planned.remove(&agent);
    }

    /// Plans a route, collapsing every failure into an empty route.
    pub fn find_path<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        occupancy: &OccupancyView<'_>,
        request: PlanRequest,
    ) -> Route {
        match self.plan(map, occupancy, request) {
            Ok(route) => route,
            Err(failure) => {
                tracing::debug!(
                    target: "realmwalk::pathfinding",
                    requester = ?request.requester,
                    start = ?request.start,
                    goal = ?request.goal,
                    %failure,
                    "planning produced no route"
                );
                Route::empty()
            }
        }
    }

    /// Plans a route from `request.start` toward `request.goal`.
    ///
    /// A blocked goal is replaced by the nearest free tile within
    /// `search_radius` rings. The returned route starts adjacent to the start
    /// tile, every step is 8-adjacent, and every waypoint was free in the
    /// occupancy snapshot taken at the beginning of the call.
    pub fn plan<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        occupancy: &OccupancyView<'_>,
        request: PlanRequest,
    ) -> Result<Route, PlanningFailure> {
        self.invocations += 1;
        let dimensions = map.dimensions();
        for tile in [request.start, request.goal] {
            if !dimensions.contains(tile) {
                return Err(PlanningFailure::OutOfBounds { tile });
            }
        }

        if let Some(requester) = request.requester {
            if let Some(previous) = self.last_planned.get(&requester) {
                if request.now.saturating_sub(*previous) < self.config.debounce() {
                    return Err(PlanningFailure::Debounced);
                }
            }
            let _ = self.last_planned.insert(requester, request.now);
        }

        let snapshot = OccupancySnapshot::capture(occupancy, request.requester);
        let grid = PlanningGrid::new(map, &snapshot);

        let goal = nearest_free_tile(
            dimensions,
            request.goal,
            self.config.search_radius,
            request.start,
            |tile| tile == request.start || grid.is_passable(tile),
        )
        .ok_or(PlanningFailure::NoFreeTileNearGoal {
            goal: request.goal,
            radius: self.config.search_radius,
        })?;

        if goal == request.start {
            return Err(PlanningFailure::AlreadyAtGoal);
        }

        let raw = self
            .search(map, &grid, request.start, goal)
            .ok_or(PlanningFailure::Unreachable {
                start: request.start,
                goal,
            })?;

        let waypoints = smooth(request.start, raw, |tile| grid.is_passable(tile));
        Ok(Route::from(waypoints))
    }

    fn search<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        grid: &PlanningGrid<'_, W>,
        start: TileCoord,
        goal: TileCoord,
    ) -> Option<Vec<TileCoord>> {
        let size = self.config.cluster_size;
        let same_cluster = ClusterId::of(start, size) == ClusterId::of(goal, size);
        if same_cluster || start.chebyshev_distance(goal) <= self.config.hierarchical_threshold {
            return self.scratch.search(grid, start, goal);
        }

        if let Some(stitched) = self.stitched_search(map, grid, start, goal) {
            return Some(stitched);
        }

        tracing::trace!(
            target: "realmwalk::pathfinding",
            ?start,
            ?goal,
            "hierarchical search failed, falling back to full search"
        );
        self.scratch.search(grid, start, goal)
    }

    fn stitched_search<W: Walkability + ?Sized>(
        &mut self,
        map: &W,
        grid: &PlanningGrid<'_, W>,
        start: TileCoord,
        goal: TileCoord,
    ) -> Option<Vec<TileCoord>> {
        let size = self.config.cluster_size;
        let graph_is_current = self.graph.as_ref().is_some_and(|graph| {
            graph.cluster_size() == size.max(1) && graph.dimensions() == map.dimensions()
        });
        if !graph_is_current {
            self.graph = Some(ClusterGraph::build(map, size));
        }

        let Self { graph, scratch, .. } = self;
        let graph = graph.as_ref()?;
        let clusters = graph.coarse_route(ClusterId::of(start, size), ClusterId::of(goal, size))?;

        let mut route = Vec::new();
        let mut cursor = start;
        for pair in clusters.windows(2) {
            let hop = graph
                .entrances(pair[0], pair[1])
                .iter()
                .copied()
                .filter(|tile| *tile == cursor || grid.is_passable(*tile))
                .min_by(|a, b| {
                    cursor
                        .euclidean_distance(*a)
                        .total_cmp(&cursor.euclidean_distance(*b))
                        .then_with(|| {
                            goal.euclidean_distance(*a)
                                .total_cmp(&goal.euclidean_distance(*b))
                        })
                })?;
            route.extend(scratch.search(grid, cursor, hop)?);
            cursor = hop;
        }
        route.extend(scratch.search(grid, cursor, goal)?);

        Some(remove_loops(start, route))
    }
}

/// Cuts any detour that returns to a tile already on the route.
fn remove_loops(start: TileCoord, waypoints: Vec<TileCoord>) -> Vec<TileCoord> {
    let mut kept: Vec<TileCoord> = Vec::with_capacity(waypoints.len());
    for tile in waypoints {
        if tile == start {
            kept.clear();
            continue;
        }
        if let Some(index) = kept.iter().position(|seen| *seen == tile) {
            kept.truncate(index + 1);
            continue;
        }
        kept.push(tile);
    }
    kept
}

/// Finds the free tile closest to `goal`, expanding ring by ring.
///
/// Rings grow breadth-first over the 8-neighbourhood, passing through blocked
/// tiles. Within the first ring that holds any free tile, the one nearest to
/// `prefer_near` wins; ties keep expansion order. `goal` itself is returned
/// when it is free. Nothing is returned when no ring up to `radius` holds a
/// free tile.
#[must_use]
pub fn nearest_free_tile<F>(
    dimensions: GridDimensions,
    goal: TileCoord,
    radius: u32,
    prefer_near: TileCoord,
    is_free: F,
) -> Option<TileCoord>
where
    F: Fn(TileCoord) -> bool,
{
    if !dimensions.contains(goal) {
        return None;
    }
    if is_free(goal) {
        return Some(goal);
    }

    let mut visited = std::collections::BTreeSet::from([goal]);
    let mut frontier = vec![goal];
    for _ in 0..radius {
        let mut ring = Vec::new();
        for tile in &frontier {
            for neighbor in tile.neighbors(dimensions) {
                if visited.insert(neighbor) {
                    ring.push(neighbor);
                }
            }
        }
        if ring.is_empty() {
            return None;
        }

        let best = ring
            .iter()
            .copied()
            .filter(|tile| is_free(*tile))
            .fold(None::<TileCoord>, |best, tile| match best {
                Some(current)
                    if prefer_near.euclidean_distance(current)
                        <= prefer_near.euclidean_distance(tile) =>
                {
                    Some(current)
                }
                _ => Some(tile),
            });
        if best.is_some() {
            return best;
        }
        frontier = ring;
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loops_are_cut_back_to_the_first_visit() {
        let start = TileCoord::new(0, 0);
        let raw = vec![
            TileCoord::new(1, 0),
            TileCoord::new(2, 0),
            TileCoord::new(2, 1),
            TileCoord::new(1, 0),
            TileCoord::new(1, 1),
        ];
        assert_eq!(
            remove_loops(start, raw),
            vec![TileCoord::new(1, 0), TileCoord::new(1, 1)]
        );
    }

    #[test]
    fn route_through_start_restarts_from_there() {
        let start = TileCoord::new(2, 2);
        let raw = vec![TileCoord::new(3, 2), start, TileCoord::new(1, 2)];
        assert_eq!(remove_loops(start, raw), vec![TileCoord::new(1, 2)]);
    }

    #[test]
    fn nearest_free_tile_prefers_tiles_near_the_start() {
        let dimensions = GridDimensions::new(9, 9);
        let goal = TileCoord::new(4, 4);
        let start = TileCoord::new(0, 4);

        let substitute = nearest_free_tile(dimensions, goal, 3, start, |tile| tile != goal);

        assert_eq!(substitute, Some(TileCoord::new(3, 4)));
    }

    #[test]
    fn nearest_free_tile_respects_radius() {
        let dimensions = GridDimensions::new(9, 9);
        let goal = TileCoord::new(4, 4);
        let free = TileCoord::new(8, 4);

        let near = nearest_free_tile(dimensions, goal, 3, goal, |tile| tile == free);
        let far = nearest_free_tile(dimensions, goal, 4, goal, |tile| tile == free);

        assert_eq!(near, None);
        assert_eq!(far, Some(free));
    }

    #[test]
    fn default_config_matches_documented_constants() {
        let config = PathfinderConfig::default();
        assert_eq!(config.cluster_size, 16);
        assert_eq!(config.search_radius, 10);
        assert_eq!(config.debounce(), Duration::from_millis(100));
    }
}
