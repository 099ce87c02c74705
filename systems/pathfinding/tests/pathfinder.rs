use std::{
    collections::{BTreeMap, BTreeSet},
    time::Duration,
};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use realmwalk_core::{AgentId, ClusterId, GridDimensions, OccupancyView, Route, TileCoord, Walkability};
use realmwalk_system_pathfinding::{
    smooth, PathfinderConfig, Pathfinder, PlanRequest, PlanningFailure,
};

struct Grid {
    dimensions: GridDimensions,
    blocked: BTreeSet<TileCoord>,
}

impl Grid {
    fn open(width: u32, height: u32) -> Self {
        Self {
            dimensions: GridDimensions::new(width, height),
            blocked: BTreeSet::new(),
        }
    }

    fn block(mut self, tiles: impl IntoIterator<Item = TileCoord>) -> Self {
        self.blocked.extend(tiles);
        self
    }

    fn random(rng: &mut ChaCha8Rng, width: u32, height: u32, density: f64) -> Self {
        let mut blocked = BTreeSet::new();
        for y in 0..height {
            for x in 0..width {
                if rng.gen_bool(density) {
                    let _ = blocked.insert(TileCoord::new(x, y));
                }
            }
        }
        Self {
            dimensions: GridDimensions::new(width, height),
            blocked,
        }
    }
}

impl Walkability for Grid {
    fn dimensions(&self) -> GridDimensions {
        self.dimensions
    }

    fn is_walkable(&self, tile: TileCoord) -> bool {
        self.dimensions.contains(tile) && !self.blocked.contains(&tile)
    }
}

#[derive(Default)]
struct Occupants {
    tiles: BTreeMap<TileCoord, AgentId>,
    clusters: BTreeMap<ClusterId, BTreeSet<AgentId>>,
}

impl Occupants {
    fn with(mut self, agent: AgentId, tile: TileCoord) -> Self {
        let _ = self.tiles.insert(tile, agent);
        let _ = self
            .clusters
            .entry(ClusterId::of(tile, 16))
            .or_default()
            .insert(agent);
        self
    }

    fn view(&self) -> OccupancyView<'_> {
        OccupancyView::new(&self.tiles, &self.clusters, 16, true)
    }
}

fn request(start: TileCoord, goal: TileCoord) -> PlanRequest {
    PlanRequest {
        requester: None,
        start,
        goal,
        now: Duration::ZERO,
    }
}

fn assert_valid(route: &Route, start: TileCoord, map: &Grid, occupants: &Occupants, requester: Option<AgentId>) {
    assert!(route.is_chain_from(start), "route {route:?} is not a chain from {start:?}");
    for waypoint in route.iter() {
        assert!(map.is_walkable(*waypoint), "{waypoint:?} is not walkable");
        assert!(
            !occupants.view().is_occupied(*waypoint, requester),
            "{waypoint:?} was occupied"
        );
    }
}

#[test]
fn open_grid_route_runs_along_the_diagonal() {
    let map = Grid::open(10, 10);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::default();

    let route = pathfinder.find_path(
        &map,
        &occupants.view(),
        request(TileCoord::new(0, 0), TileCoord::new(9, 9)),
    );

    assert_eq!(route.len(), 9);
    assert_eq!(route.goal(), Some(TileCoord::new(9, 9)));
    assert_valid(&route, TileCoord::new(0, 0), &map, &occupants, None);
}

#[test]
fn occupied_goal_is_replaced_by_adjacent_free_tile() {
    let map = Grid::open(12, 12);
    let goal = TileCoord::new(8, 8);
    let occupants = Occupants::default().with(AgentId::new(5), goal);
    let mut pathfinder = Pathfinder::default();

    let route = pathfinder.find_path(
        &map,
        &occupants.view(),
        request(TileCoord::new(1, 1), goal),
    );

    let last = route.goal().expect("route to a tile next to the goal");
    assert_ne!(last, goal);
    assert!(last.is_adjacent(goal));
    assert_valid(&route, TileCoord::new(1, 1), &map, &occupants, None);
}

#[test]
fn goal_buried_beyond_search_radius_yields_empty_route() {
    let goal = TileCoord::new(20, 20);
    let mut walls = Vec::new();
    for y in 0..41 {
        for x in 0..41 {
            let tile = TileCoord::new(x, y);
            if tile.chebyshev_distance(goal) <= 10 {
                walls.push(tile);
            }
        }
    }
    let map = Grid::open(41, 41).block(walls);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::default();

    let outcome = pathfinder.plan(
        &map,
        &occupants.view(),
        request(TileCoord::new(0, 0), goal),
    );
    assert_eq!(
        outcome,
        Err(PlanningFailure::NoFreeTileNearGoal { goal, radius: 10 })
    );

    let route = pathfinder.find_path(
        &map,
        &occupants.view(),
        request(TileCoord::new(0, 0), goal),
    );
    assert!(route.is_empty());
}

#[test]
fn walled_in_goal_is_unreachable() {
    let goal = TileCoord::new(10, 10);
    let ring: Vec<_> = (0..21)
        .flat_map(|y| (0..21).map(move |x| TileCoord::new(x, y)))
        .filter(|tile| tile.chebyshev_distance(goal) == 2)
        .collect();
    let map = Grid::open(21, 21).block(ring);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::default();

    let outcome = pathfinder.plan(
        &map,
        &occupants.view(),
        request(TileCoord::new(0, 0), goal),
    );

    assert_eq!(
        outcome,
        Err(PlanningFailure::Unreachable {
            start: TileCoord::new(0, 0),
            goal,
        })
    );
}

#[test]
fn out_of_bounds_requests_are_rejected() {
    let map = Grid::open(5, 5);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::default();

    let outcome = pathfinder.plan(
        &map,
        &occupants.view(),
        request(TileCoord::new(0, 0), TileCoord::new(5, 0)),
    );

    assert_eq!(
        outcome,
        Err(PlanningFailure::OutOfBounds {
            tile: TileCoord::new(5, 0)
        })
    );
}

#[test]
fn start_on_goal_returns_empty_route() {
    let map = Grid::open(5, 5);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::default();

    let outcome = pathfinder.plan(
        &map,
        &occupants.view(),
        request(TileCoord::new(2, 2), TileCoord::new(2, 2)),
    );

    assert_eq!(outcome, Err(PlanningFailure::AlreadyAtGoal));
}

#[test]
fn requester_does_not_block_itself() {
    let map = Grid::open(6, 6);
    let me = AgentId::new(3);
    let start = TileCoord::new(1, 1);
    let occupants = Occupants::default().with(me, start);
    let mut pathfinder = Pathfinder::default();

    let route = pathfinder.find_path(
        &map,
        &occupants.view(),
        PlanRequest {
            requester: Some(me),
            start,
            goal: TileCoord::new(4, 1),
            now: Duration::ZERO,
        },
    );

    assert_eq!(route.goal(), Some(TileCoord::new(4, 1)));
    assert_valid(&route, start, &map, &occupants, Some(me));
}

#[test]
fn repeated_requests_inside_debounce_window_are_dropped() {
    let map = Grid::open(8, 8);
    let occupants = Occupants::default();
    let mut pathfinder = Pathfinder::new(PathfinderConfig {
        debounce_ms: 100,
        ..PathfinderConfig::default()
    });
    let me = AgentId::new(1);
    let at = |millis| PlanRequest {
        requester: Some(me),
        start: TileCoord::new(0, 0),
        goal: TileCoord::new(6, 6),
        now: Duration::from_millis(millis),
    };

    assert!(pathfinder.plan(&map, &occupants.view(), at(1_000)).is_ok());
    assert_eq!(
        pathfinder.plan(&map, &occupants.view(), at(1_050)),
        Err(PlanningFailure::Debounced)
    );
    assert!(pathfinder.find_path(&map, &occupants.view(), at(1_060)).is_empty());
    assert!(pathfinder.plan(&map, &occupants.view(), at(1_100)).is_ok());

    // Anonymous callers are never debounced.
    assert!(pathfinder
        .plan(&map, &occupants.view(), request(TileCoord::new(0, 0), TileCoord::new(3, 3)))
        .is_ok());
    assert!(pathfinder
        .plan(&map, &occupants.view(), request(TileCoord::new(0, 0), TileCoord::new(3, 3)))
        .is_ok());
    assert_eq!(pathfinder.invocations(), 6);
}

#[test]
fn long_hops_are_stitched_through_the_cluster_graph() {
    let wall: Vec<_> = (0..16)
        .filter(|y| *y != 14)
        .map(|y| TileCoord::new(30, y))
        .collect();
    let map = Grid::open(64, 16).block(wall);
    let occupants = Occupants::default();
    let start = TileCoord::new(2, 2);
    let goal = TileCoord::new(60, 2);

    let mut hierarchical = Pathfinder::new(PathfinderConfig {
        cluster_size: 8,
        hierarchical_threshold: 12,
        ..PathfinderConfig::default()
    });
    let route = hierarchical.find_path(&map, &occupants.view(), request(start, goal));

    assert_eq!(route.goal(), Some(goal));
    assert_valid(&route, start, &map, &occupants, None);
    assert!(route.iter().any(|tile| tile.x() == 30 && tile.y() == 14));

    let mut direct = Pathfinder::new(PathfinderConfig {
        hierarchical_threshold: u32::MAX,
        ..PathfinderConfig::default()
    });
    let reference = direct.find_path(&map, &occupants.view(), request(start, goal));
    assert_eq!(reference.goal(), Some(goal));
}

#[test]
fn planning_is_deterministic_for_a_fixed_snapshot() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    for _ in 0..20 {
        let map = Grid::random(&mut rng, 40, 40, 0.25);
        let mut occupants = Occupants::default();
        for id in 1..8 {
            let tile = TileCoord::new(rng.gen_range(0..40), rng.gen_range(0..40));
            occupants = occupants.with(AgentId::new(id), tile);
        }
        let start = TileCoord::new(rng.gen_range(0..40), rng.gen_range(0..40));
        let goal = TileCoord::new(rng.gen_range(0..40), rng.gen_range(0..40));
        let config = PathfinderConfig {
            cluster_size: 10,
            hierarchical_threshold: 8,
            ..PathfinderConfig::default()
        };

        let mut shared = Pathfinder::new(config);
        let first = shared.find_path(&map, &occupants.view(), request(start, goal));
        let second = shared.find_path(&map, &occupants.view(), request(start, goal));
        let fresh = Pathfinder::new(config).find_path(&map, &occupants.view(), request(start, goal));

        assert_eq!(first, second);
        assert_eq!(first, fresh);
    }
}

#[test]
fn fuzzed_routes_are_valid_bounded_and_already_smooth() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let config = PathfinderConfig {
        cluster_size: 8,
        hierarchical_threshold: 10,
        ..PathfinderConfig::default()
    };

    for _ in 0..60 {
        let map = Grid::random(&mut rng, 32, 32, 0.3);
        let mut occupants = Occupants::default();
        for id in 1..12 {
            let tile = TileCoord::new(rng.gen_range(0..32), rng.gen_range(0..32));
            occupants = occupants.with(AgentId::new(id), tile);
        }
        let start = TileCoord::new(rng.gen_range(0..32), rng.gen_range(0..32));
        let goal = TileCoord::new(rng.gen_range(0..32), rng.gen_range(0..32));

        let mut pathfinder = Pathfinder::new(config);
        let route = pathfinder.find_path(&map, &occupants.view(), request(start, goal));
        if route.is_empty() {
            continue;
        }

        assert_valid(&route, start, &map, &occupants, None);
        let adjusted = route.goal().expect("non-empty route has a goal");
        assert!(adjusted.chebyshev_distance(goal) <= config.search_radius);

        let view = occupants.view();
        let resmoothed = smooth(start, route.to_vec(), |tile| {
            map.is_walkable(tile) && !view.is_occupied(tile, None)
        });
        assert_eq!(resmoothed, route.to_vec());
    }
}
