//! Built-in scenarios: a shared test map plus named spawn tables, from
//! single-behavior steering demos up to the full three-role hunt. Each
//! scenario hands the app a populated world, the NPC bodies (with a state
//! machine for the role spiders), and a script for the player bee.

use std::path::Path;

use glam::Vec2;
use thiserror::Error;

use crate::actor::{NpcBody, PlayerBody, Role};
use crate::hsm::{roles, Hsm, HsmBuildError};
use crate::nav::{self, NavMeshError, Region};
use crate::steering::{AlignTuning, ArriveTuning, Behavior, FollowPath, Target, Wander};
use crate::world::{Aabb, Jar, Obstacle, Web, WorldState};

pub const SCENARIOS: &[&str] = &[
    "seek", "flee", "arrive", "wander", "patrol", "priority", "showcase", "roles",
];

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error(
        "unknown scenario '{0}', expected one of: seek, flee, arrive, wander, patrol, priority, showcase, roles"
    )]
    Unknown(String),
    #[error("navigation mesh: {0}")]
    Nav(#[from] NavMeshError),
    #[error("state machine: {0}")]
    Hsm(#[from] HsmBuildError),
}

/// What the player bee does each tick. The demos park it or walk it in a
/// loop; the AI gets no say in it.
#[derive(Debug, Clone)]
pub enum PlayerScript {
    Idle,
    /// Walk the waypoint loop at `speed`, advancing when close to the
    /// current target.
    Patrol {
        waypoints: Vec<Vec2>,
        next: usize,
        speed: f32,
    },
}

pub struct Scenario {
    pub world: WorldState,
    pub npcs: Vec<(NpcBody, Option<Hsm>)>,
    pub script: PlayerScript,
}

const BOUNDS: Vec2 = Vec2::new(1280.0, 960.0);

fn rect_points(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Vec2> {
    vec![
        Vec2::new(x0, y0),
        Vec2::new(x1, y0),
        Vec2::new(x1, y1),
        Vec2::new(x0, y1),
    ]
}

/// The walkable layer of the test map: a west hall, north and south halls,
/// and a center room against an east hall, every neighboring pair sharing a
/// full boundary segment.
fn nav_regions() -> Vec<Region> {
    let nav = |name: &str, points| Region {
        name: name.into(),
        navigable: true,
        points,
    };
    vec![
        nav("west-hall", rect_points(0.0, 0.0, 320.0, 960.0)),
        nav("north-hall", rect_points(320.0, 0.0, 1280.0, 240.0)),
        nav("center-room", rect_points(320.0, 240.0, 800.0, 720.0)),
        nav("east-hall", rect_points(800.0, 240.0, 1280.0, 720.0)),
        nav("south-hall", rect_points(320.0, 720.0, 1280.0, 960.0)),
    ]
}

fn base_world(player_at: Vec2) -> WorldState {
    let mut world = WorldState::new(BOUNDS, PlayerBody::at(player_at));
    world.obstacles = vec![
        Obstacle::Rect(Aabb {
            min: Vec2::new(420.0, 300.0),
            max: Vec2::new(500.0, 380.0),
        }),
        Obstacle::Rect(Aabb {
            min: Vec2::new(1000.0, 100.0),
            max: Vec2::new(1100.0, 180.0),
        }),
        Obstacle::Polygon(vec![
            Vec2::new(900.0, 780.0),
            Vec2::new(1020.0, 780.0),
            Vec2::new(960.0, 900.0),
        ]),
    ];
    world
}

fn jitter(rng: &mut fastrand::Rng, position: Vec2) -> Vec2 {
    position + Vec2::new(rng.f32() * 40.0 - 20.0, rng.f32() * 40.0 - 20.0)
}

fn drone(id: u32, name: &str, position: Vec2, behavior: Behavior) -> (NpcBody, Option<Hsm>) {
    let mut body = NpcBody::new(id, name, Role::Drone, position);
    body.steering = Some(behavior);
    (body, None)
}

/// Build a named scenario. The nav mesh is only constructed (through the
/// cache) for the role scenario; the steering demos do not navigate.
pub fn build(
    name: &str,
    cache_dir: &Path,
    rng: &mut fastrand::Rng,
) -> Result<Scenario, ScenarioError> {
    match name {
        "seek" => {
            let world = base_world(Vec2::new(640.0, 480.0));
            let npcs = vec![drone(
                1,
                "seeker",
                Vec2::new(200.0, 200.0),
                Behavior::Seek {
                    target: Target::Tracked,
                    max_accel: 120.0,
                },
            )];
            Ok(Scenario {
                world,
                npcs,
                script: patrol_script(),
            })
        }
        "flee" => {
            let world = base_world(Vec2::new(640.0, 480.0));
            let npcs = vec![drone(
                1,
                "coward",
                Vec2::new(700.0, 480.0),
                Behavior::Flee {
                    target: Target::Tracked,
                    max_accel: 120.0,
                },
            )];
            Ok(Scenario {
                world,
                npcs,
                script: patrol_script(),
            })
        }
        "arrive" => {
            let world = base_world(Vec2::new(640.0, 240.0));
            let npcs = vec![drone(
                1,
                "arriver",
                Vec2::new(200.0, 200.0),
                Behavior::Arrive {
                    target: Target::Tracked,
                    tuning: ArriveTuning {
                        max_accel: 150.0,
                        max_speed: 80.0,
                        target_radius: 5.0,
                        slow_radius: 50.0,
                        time_to_target: 0.1,
                    },
                },
            )];
            Ok(Scenario {
                world,
                npcs,
                script: PlayerScript::Idle,
            })
        }
        "wander" => {
            let world = base_world(Vec2::new(640.0, 480.0));
            let npcs = (1..=3)
                .map(|id| {
                    drone(
                        id,
                        "wanderer",
                        jitter(rng, Vec2::new(400.0 + 160.0 * id as f32, 480.0)),
                        Behavior::Wander(Wander::new(100.0)),
                    )
                })
                .collect();
            Ok(Scenario {
                world,
                npcs,
                script: PlayerScript::Idle,
            })
        }
        "patrol" => {
            // Two sentries walking generated beat loops through FollowPath.
            let world = base_world(Vec2::new(640.0, 120.0));
            let square_beat = crate::path::Path::rectangular(Vec2::new(400.0, 760.0), 300.0, 140.0)
                .waypoints(48);
            let round_beat =
                crate::path::Path::circular(Vec2::new(900.0, 480.0), 150.0).waypoints(48);
            let npcs = vec![
                drone(
                    1,
                    "south-sentry",
                    Vec2::new(400.0, 760.0),
                    Behavior::FollowPath(FollowPath::new(square_beat)),
                ),
                drone(
                    2,
                    "east-sentry",
                    Vec2::new(900.0, 330.0),
                    Behavior::FollowPath(FollowPath::new(round_beat)),
                ),
            ];
            Ok(Scenario {
                world,
                npcs,
                script: PlayerScript::Idle,
            })
        }
        "priority" => {
            // Obstacle avoidance outranks the blended pursuit, so the drone
            // swerves around the map furniture while chasing the player.
            let world = base_world(Vec2::new(640.0, 480.0));
            let npcs = vec![drone(
                1,
                "chaser",
                Vec2::new(200.0, 200.0),
                Behavior::Priority {
                    behaviors: vec![
                        Behavior::ObstacleAvoidance {
                            avoid_distance: 100.0,
                            lookahead: 100.0,
                            max_accel: 80.0,
                        },
                        Behavior::BlendedMoveLwyg {
                            movement: Box::new(Behavior::Pursue {
                                target: Target::Tracked,
                                max_prediction: 0.5,
                                max_accel: 100.0,
                                max_speed: 90.0,
                            }),
                        },
                    ],
                },
            )];
            Ok(Scenario {
                world,
                npcs,
                script: patrol_script(),
            })
        }
        "showcase" => {
            // One drone per behavior family that has no dedicated scenario,
            // all reacting to the patrolling player.
            let world = base_world(Vec2::new(640.0, 120.0));
            let mut walker = NpcBody::new(8, "walker", Role::Drone, Vec2::new(100.0, 500.0));
            walker.kinematic.velocity = Vec2::new(60.0, -30.0);
            walker.steering = Some(Behavior::LookWhereYoureGoing);
            let npcs = vec![
                drone(
                    1,
                    "kin-seeker",
                    Vec2::new(150.0, 150.0),
                    Behavior::KinematicSeek {
                        target: Target::Tracked,
                        max_speed: 70.0,
                    },
                ),
                drone(
                    2,
                    "kin-coward",
                    Vec2::new(640.0, 600.0),
                    Behavior::KinematicFlee {
                        target: Target::Tracked,
                        max_speed: 70.0,
                    },
                ),
                drone(
                    3,
                    "kin-arriver",
                    Vec2::new(1150.0, 250.0),
                    Behavior::KinematicArrive {
                        target: Target::Tracked,
                        max_speed: 70.0,
                        target_radius: 8.0,
                        time_to_target: 0.25,
                    },
                ),
                drone(
                    4,
                    "kin-wanderer",
                    Vec2::new(250.0, 850.0),
                    Behavior::KinematicWander {
                        max_speed: 60.0,
                        max_rotation: 40.0,
                    },
                ),
                drone(
                    5,
                    "aligner",
                    Vec2::new(640.0, 900.0),
                    Behavior::Align {
                        target: Target::Tracked,
                        tuning: AlignTuning {
                            max_rotation: 60.0,
                            max_angular_accel: 120.0,
                            target_radius: 2.0,
                            slow_radius: 20.0,
                            time_to_target: 0.1,
                        },
                    },
                ),
                drone(
                    6,
                    "matcher",
                    Vec2::new(1150.0, 850.0),
                    Behavior::VelocityMatch {
                        target: Target::Tracked,
                        max_accel: 100.0,
                        time_to_target: 0.2,
                    },
                ),
                drone(
                    7,
                    "evader",
                    Vec2::new(900.0, 300.0),
                    Behavior::Evade {
                        target: Target::Tracked,
                        max_prediction: 0.5,
                        max_accel: 100.0,
                    },
                ),
                (walker, None),
                drone(
                    9,
                    "crosser-west",
                    Vec2::new(250.0, 480.0),
                    Behavior::Priority {
                        behaviors: vec![
                            Behavior::CollisionAvoidance {
                                radius: 24.0,
                                max_accel: 120.0,
                            },
                            Behavior::Seek {
                                target: Target::Point(Vec2::new(1150.0, 480.0)),
                                max_accel: 80.0,
                            },
                        ],
                    },
                ),
                drone(
                    10,
                    "crosser-east",
                    Vec2::new(1150.0, 480.0),
                    Behavior::Priority {
                        behaviors: vec![
                            Behavior::CollisionAvoidance {
                                radius: 24.0,
                                max_accel: 120.0,
                            },
                            Behavior::Seek {
                                target: Target::Point(Vec2::new(250.0, 480.0)),
                                max_accel: 80.0,
                            },
                        ],
                    },
                ),
            ];
            Ok(Scenario {
                world,
                npcs,
                script: patrol_script(),
            })
        }
        "roles" => {
            let mut world = base_world(Vec2::new(640.0, 120.0));
            world.nav = Some(nav::load_or_build(&nav_regions(), cache_dir)?);
            world.jars = vec![
                Jar {
                    position: Vec2::new(480.0, 560.0),
                    on_web: false,
                    collected: false,
                },
                Jar {
                    position: Vec2::new(1040.0, 400.0),
                    on_web: false,
                    collected: false,
                },
                Jar {
                    position: Vec2::new(200.0, 800.0),
                    on_web: false,
                    collected: false,
                },
            ];
            world.webs = vec![
                Web {
                    position: Vec2::new(160.0, 160.0),
                    has_pot: false,
                },
                Web {
                    position: Vec2::new(1120.0, 840.0),
                    has_pot: false,
                },
            ];
            let npcs = vec![
                (
                    NpcBody::new(1, "weaver", Role::Weaver, jitter(rng, Vec2::new(400.0, 600.0))),
                    Some(roles::build_weaver()?),
                ),
                (
                    NpcBody::new(2, "hunter", Role::Hunter, jitter(rng, Vec2::new(1100.0, 600.0))),
                    Some(roles::build_hunter()?),
                ),
                (
                    NpcBody::new(3, "brooder", Role::Brooder, jitter(rng, Vec2::new(640.0, 840.0))),
                    Some(roles::build_brooder()?),
                ),
            ];
            Ok(Scenario {
                world,
                npcs,
                script: patrol_script(),
            })
        }
        other => Err(ScenarioError::Unknown(other.to_string())),
    }
}

/// The player's jar-collection round: down through the halls and the center
/// room, past every jar site, steering clear of the map furniture.
fn patrol_script() -> PlayerScript {
    PlayerScript::Patrol {
        waypoints: vec![
            Vec2::new(640.0, 120.0),
            Vec2::new(1040.0, 400.0),
            Vec2::new(900.0, 600.0),
            Vec2::new(480.0, 560.0),
            Vec2::new(200.0, 800.0),
            Vec2::new(160.0, 160.0),
        ],
        next: 0,
        speed: 90.0,
    }
}
