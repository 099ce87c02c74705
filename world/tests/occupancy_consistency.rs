use std::{collections::BTreeSet, time::Duration};

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use realmwalk_core::{AgentId, Command, Event, HostileStats, Route, TileCoord, Walkability};
use realmwalk_world::{self as world, query, TileMap, World, WorldConfig};

const WIDTH: u32 = 24;
const HEIGHT: u32 = 24;

fn random_tile(rng: &mut ChaCha8Rng) -> TileCoord {
    TileCoord::new(rng.gen_range(0..WIDTH), rng.gen_range(0..HEIGHT))
}

fn random_chain(rng: &mut ChaCha8Rng, world: &World, from: TileCoord) -> Vec<TileCoord> {
    let dimensions = query::dimensions(world);
    let mut chain = Vec::new();
    let mut cursor = from;
    for _ in 0..rng.gen_range(1..6) {
        let dx = rng.gen_range(-1..=1);
        let dy = rng.gen_range(-1..=1);
        if let Some(next) = cursor.offset(dx, dy, dimensions) {
            if next != cursor {
                chain.push(next);
                cursor = next;
            }
        }
    }
    chain
}

fn assert_consistent(world: &World) {
    let index = query::occupancy_index(world);
    let player = query::player(world);
    let mut tiles = BTreeSet::new();

    let mut agents: Vec<(AgentId, TileCoord)> = query::agent_view(world)
        .iter()
        .map(|snapshot| (snapshot.id, snapshot.tile))
        .collect();
    if !player.dead {
        agents.push((AgentId::PLAYER, player.tile));
    }

    for (agent, tile) in agents {
        assert_eq!(
            index.cluster_of_agent(agent),
            Some(index.cluster_of(tile)),
            "agent {agent:?} on {tile:?} filed under the wrong cluster"
        );
        assert_eq!(query::occupancy_view(world).occupant(tile), Some(agent));
        assert!(tiles.insert(tile), "two agents share {tile:?}");
        assert!(query::tile_map(world).is_walkable(tile));
    }

    let registered = index.memberships().count();
    assert_eq!(registered, tiles.len(), "index tracks agents that left");
}

#[test]
fn cluster_membership_tracks_tiles_through_random_ticks() {
    for seed in 0..8_u64 {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let blocked: Vec<TileCoord> = (0..60).map(|_| random_tile(&mut rng)).collect();
        let map = TileMap::open(WIDTH, HEIGHT).with_blocked(blocked);
        let config = WorldConfig {
            cluster_size: 5,
            ..WorldConfig::default()
        };
        let mut world = World::new(map, config).expect("map keeps open tiles");
        let mut events = Vec::new();

        for _ in 0..200 {
            events.clear();
            match rng.gen_range(0..10) {
                0 | 1 => {
                    let stats = HostileStats {
                        speed: rng.gen_range(0.5..4.0),
                        ..HostileStats::default()
                    };
                    let tile = random_tile(&mut rng);
                    world::apply(&mut world, Command::SpawnHostile { stats, tile }, &mut events);
                }
                2 => {
                    let view = query::agent_view(&world);
                    if !view.is_empty() {
                        let index = rng.gen_range(0..view.len());
                        let agent = view.iter().nth(index).map(|snapshot| snapshot.id);
                        if let Some(agent) = agent {
                            world::apply(&mut world, Command::DespawnHostile { agent }, &mut events);
                        }
                    }
                }
                3 => {
                    let player = query::player(&world);
                    if player.dead {
                        world::apply(&mut world, Command::RespawnPlayer, &mut events);
                    } else if let Some(attacker) = query::agent_view(&world).iter().next() {
                        world::apply(
                            &mut world,
                            Command::ResolveHostileAttack {
                                attacker: attacker.id,
                                damage: rng.gen_range(0..60),
                                critical: false,
                                cooldown: Duration::from_secs(1),
                            },
                            &mut events,
                        );
                    }
                }
                _ => {
                    let snapshots = query::agent_view(&world).into_vec();
                    for snapshot in &snapshots {
                        if snapshot.route_len == 0 {
                            let chain = random_chain(&mut rng, &world, snapshot.tile);
                            world::apply(
                                &mut world,
                                Command::AssignRoute {
                                    agent: snapshot.id,
                                    route: Route::from(chain),
                                    retry_after: Duration::ZERO,
                                },
                                &mut events,
                            );
                        }
                    }
                    let player = query::player(&world);
                    if !player.dead && player.route_len == 0 {
                        let chain = random_chain(&mut rng, &world, player.tile);
                        world::apply(
                            &mut world,
                            Command::AssignRoute {
                                agent: AgentId::PLAYER,
                                route: Route::from(chain),
                                retry_after: Duration::ZERO,
                            },
                            &mut events,
                        );
                    }

                    let dt = Duration::from_millis(rng.gen_range(10..700));
                    let agents = snapshots.iter().map(|snapshot| snapshot.id).collect();
                    world::apply(&mut world, Command::AdvanceMovement { dt, agents }, &mut events);
                }
            }

            let died = events
                .iter()
                .any(|event| matches!(event, Event::PlayerDied { .. }));
            if died {
                assert!(query::player(&world).dead);
            }
            assert_consistent(&world);
        }
    }
}
