use std::time::Duration;

use realmwalk_core::{AgentId, Command, Event, HostileStats, Route, TileCoord};
use realmwalk_system_pathfinding::PathfinderConfig;
use realmwalk_system_player_control::{PlayerControl, PlayerControlConfig, Surroundings};
use realmwalk_world::{self as world, query, TileMap, World, WorldConfig};

const FRAME: Duration = Duration::from_millis(500);

fn open_world(width: u32, height: u32) -> World {
    World::new(TileMap::open(width, height), WorldConfig::default()).expect("open map")
}

fn control() -> PlayerControl {
    PlayerControl::new(PlayerControlConfig::default(), PathfinderConfig::default())
}

fn with_surroundings<T>(
    world: &World,
    now: Duration,
    f: impl FnOnce(&Surroundings<'_, TileMap>) -> T,
) -> T {
    let player = query::player(world);
    let at = Surroundings {
        map: query::tile_map(world),
        occupancy: query::occupancy_view(world),
        player: &player,
        now,
    };
    f(&at)
}

fn apply_all(world: &mut World, commands: Vec<Command>) -> Vec<Event> {
    let mut events = Vec::new();
    for command in commands {
        world::apply(world, command, &mut events);
    }
    events
}

fn frame(world: &mut World) -> Vec<Event> {
    apply_all(
        world,
        vec![
            Command::AdvanceTimers {
                dt: FRAME,
                agents: Vec::new(),
            },
            Command::AdvanceMovement {
                dt: FRAME,
                agents: Vec::new(),
            },
        ],
    )
}

fn run(world: &mut World, control: &mut PlayerControl, frames: u32, start: Duration) -> Vec<Event> {
    let mut log = Vec::new();
    for index in 0..frames {
        let events = frame(world);
        let now = start + FRAME * (index + 1);
        let commands = with_surroundings(world, now, |at| {
            let mut out = Vec::new();
            control.handle(&events, at, &mut out);
            out
        });
        log.extend(events);
        log.extend(apply_all(world, commands));
    }
    log
}

#[test]
fn move_to_walks_the_player_to_the_goal() {
    let mut world = open_world(20, 20);
    let mut control = control();
    let goal = TileCoord::new(15, 12);

    let commands = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        assert!(control.request_move_to(at, goal, &mut out));
        out
    });
    let _ = apply_all(&mut world, commands);
    assert_eq!(control.goal(), Some(goal));

    let log = run(&mut world, &mut control, 20, Duration::ZERO);

    assert!(log.contains(&Event::RouteCompleted {
        agent: AgentId::PLAYER,
        tile: goal
    }));
    assert_eq!(query::player(&world).tile, goal);
    assert_eq!(control.goal(), None);
}

#[test]
fn repeating_the_current_goal_keeps_the_route() {
    let mut world = open_world(20, 20);
    let mut control = control();
    let goal = TileCoord::new(16, 10);

    let commands = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        let _ = control.request_move_to(at, goal, &mut out);
        out
    });
    let _ = apply_all(&mut world, commands);

    let repeated = with_surroundings(&world, Duration::from_secs(1), |at| {
        let mut out = Vec::new();
        assert!(control.request_move_to(at, goal, &mut out));
        out
    });
    assert!(repeated.is_empty());
    assert_eq!(control.pathfinder().invocations(), 1);

    let drifted = with_surroundings(&world, Duration::from_secs(1), |at| {
        let mut out = Vec::new();
        assert!(control.request_move_to(at, TileCoord::new(16, 13), &mut out));
        out
    });
    assert_eq!(drifted.len(), 1);
    assert_eq!(control.pathfinder().invocations(), 2);
}

#[test]
fn single_steps_need_a_free_neighbor() {
    let mut world = open_world(20, 20);
    let mut control = control();
    let _ = apply_all(
        &mut world,
        vec![Command::SpawnHostile {
            stats: HostileStats::default(),
            tile: TileCoord::new(11, 10),
        }],
    );

    let blocked = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        assert!(!control.request_move_direction(at, 1, 0, false, &mut out));
        out
    });
    assert!(blocked.is_empty());

    let open = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        assert!(control.request_move_direction(at, 0, 3, false, &mut out));
        out
    });
    assert_eq!(
        open,
        vec![Command::AssignRoute {
            agent: AgentId::PLAYER,
            route: Route::from(vec![TileCoord::new(10, 11)]),
            retry_after: Duration::ZERO,
        }]
    );
}

#[test]
fn held_direction_keeps_walking_until_the_edge() {
    let mut world = open_world(8, 3);
    let mut control = control();
    assert_eq!(query::player(&world).tile, TileCoord::new(4, 1));

    let commands = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        assert!(control.request_move_direction(at, 1, 0, true, &mut out));
        out
    });
    let _ = apply_all(&mut world, commands);

    let _ = run(&mut world, &mut control, 12, Duration::ZERO);

    assert_eq!(query::player(&world).tile, TileCoord::new(7, 1));
    assert!(control.direction().is_some());

    let stop = with_surroundings(&world, Duration::from_secs(10), |at| {
        let mut out = Vec::new();
        let _ = control.request_move_direction(at, 0, 0, true, &mut out);
        out
    });
    assert_eq!(
        stop,
        vec![Command::ClearRoute {
            agent: AgentId::PLAYER
        }]
    );
    assert!(control.direction().is_none());
}

#[test]
fn blocked_routes_are_replanned_around_the_obstacle() {
    let mut world = open_world(20, 20);
    let mut control = control();
    let goal = TileCoord::new(16, 10);

    let commands = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        let _ = control.request_move_to(at, goal, &mut out);
        out
    });
    let _ = apply_all(&mut world, commands);
    let _ = apply_all(
        &mut world,
        vec![Command::SpawnHostile {
            stats: HostileStats::default(),
            tile: TileCoord::new(12, 10),
        }],
    );

    let log = run(&mut world, &mut control, 20, Duration::ZERO);

    assert!(log.contains(&Event::RouteBlocked {
        agent: AgentId::PLAYER,
        at: TileCoord::new(12, 10)
    }));
    assert!(!log.iter().any(|event| matches!(
        event,
        Event::AgentMoved { agent, to, .. } if agent.is_player() && *to == TileCoord::new(12, 10)
    )));
    assert_eq!(query::player(&world).tile, goal);
}

#[test]
fn dead_players_ignore_input() {
    let mut world = open_world(20, 20);
    let mut control = control();
    let events = apply_all(
        &mut world,
        vec![
            Command::SpawnHostile {
                stats: HostileStats::default(),
                tile: TileCoord::new(2, 2),
            },
            Command::ResolveHostileAttack {
                attacker: AgentId::new(1),
                damage: 1_000,
                critical: false,
                cooldown: Duration::from_secs(1),
            },
        ],
    );
    assert!(events.contains(&Event::PlayerDied {
        killer: AgentId::new(1)
    }));

    let commands = with_surroundings(&world, Duration::ZERO, |at| {
        let mut out = Vec::new();
        assert!(!control.request_move_to(at, TileCoord::new(3, 3), &mut out));
        assert!(!control.request_move_direction(at, 1, 0, true, &mut out));
        control.handle(&events, at, &mut out);
        out
    });
    assert!(commands.is_empty());
}
