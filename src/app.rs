//! Headless simulation driver: owns the ECS world of NPCs, the shared world
//! state, and the per-tick snapshot buffer, and steps everything at a fixed
//! timestep. Per tick: snapshot phase, scripted player step, then each NPC's
//! state machine (or bare steering demo behavior) against that consistent
//! frame.

use std::path::Path;

use glam::Vec2;

use crate::actor::{drive, ActionCtx, NpcBody};
use crate::hsm::Hsm;
use crate::kinematic::SteeringOutput;
use crate::scenario::{self, PlayerScript, ScenarioError};
use crate::steering::Behavior;
use crate::world::{KinSnapshot, WorldState};

/// Simulation tick length (seconds).
pub const TICK_RATE: f32 = 1.0 / 60.0;
/// Snapshot id reserved for the player.
const PLAYER_ID: u32 = 0;
/// How close the scripted player gets to a waypoint before moving on.
const WAYPOINT_RADIUS: f32 = 12.0;
/// Pickup range for jars on the player's route.
const PICKUP_RADIUS: f32 = 24.0;
/// How often to log a progress line (ticks).
const TRACE_INTERVAL: u64 = 300;

pub struct App {
    world: hecs::World,
    state: WorldState,
    script: PlayerScript,
    snapshots: Vec<KinSnapshot>,
    rng: fastrand::Rng,
    tick_count: u64,
}

impl App {
    pub fn new(scenario_name: &str, cache_dir: &Path, seed: u64) -> Result<Self, ScenarioError> {
        let mut rng = fastrand::Rng::with_seed(seed);
        let scenario = scenario::build(scenario_name, cache_dir, &mut rng)?;

        let mut world = hecs::World::new();
        let npc_count = scenario.npcs.len();
        for (body, hsm) in scenario.npcs {
            log::debug!("spawning {} as {:?}", body.name, body.role);
            match hsm {
                Some(hsm) => {
                    world.spawn((body, hsm));
                }
                None => {
                    world.spawn((body,));
                }
            }
        }
        log::info!("scenario '{scenario_name}' ready: {npc_count} NPCs");

        Ok(Self {
            world,
            state: scenario.world,
            script: scenario.script,
            snapshots: Vec::with_capacity(npc_count + 1),
            rng,
            tick_count: 0,
        })
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn run(&mut self, ticks: u64) {
        for _ in 0..ticks {
            self.tick(TICK_RATE);
        }
        log::info!(
            "ran {} ticks: player at ({:.0}, {:.0}) on {:.0} health holding {} jars, {} alerts, {} eggs",
            self.tick_count,
            self.state.player.kinematic.position.x,
            self.state.player.kinematic.position.y,
            self.state.player.health,
            self.state.player.honey_collected,
            self.state.alerts.len(),
            self.state.eggs.len(),
        );
    }

    /// One fixed step. Snapshots are taken before anything moves, so every
    /// actor steers against the same view of the frame.
    pub fn tick(&mut self, dt: f32) {
        self.tick_count += 1;

        self.snapshots.clear();
        self.snapshots.push(KinSnapshot {
            id: PLAYER_ID,
            position: self.state.player.kinematic.position,
            velocity: self.state.player.kinematic.velocity,
        });
        for (_, body) in self.world.query_mut::<&NpcBody>() {
            self.snapshots.push(KinSnapshot {
                id: body.id,
                position: body.kinematic.position,
                velocity: body.kinematic.velocity,
            });
        }

        step_player(&mut self.state, &mut self.script, dt);

        for (_, (body, hsm)) in self.world.query_mut::<(&mut NpcBody, Option<&mut Hsm>)>() {
            body.timers.tick(dt);
            let mut ctx = ActionCtx {
                npc: body,
                world: &mut self.state,
                others: &self.snapshots,
                rng: &mut self.rng,
            };
            match hsm {
                Some(hsm) => hsm.update(dt, &mut ctx),
                None => {
                    let rotation_driven = ctx
                        .npc
                        .steering
                        .as_ref()
                        .is_some_and(demo_uses_rotation);
                    drive(&mut ctx, dt, rotation_driven);
                }
            }
        }

        if self.tick_count % TRACE_INTERVAL == 0 {
            for (_, (body, hsm)) in self.world.query_mut::<(&NpcBody, Option<&Hsm>)>() {
                let pos = body.kinematic.position;
                match hsm {
                    Some(hsm) => log::debug!(
                        "{} at ({:.0}, {:.0}) in {}",
                        body.name,
                        pos.x,
                        pos.y,
                        hsm.active_path()
                    ),
                    None => log::debug!("{} at ({:.0}, {:.0})", body.name, pos.x, pos.y),
                }
            }
        }
    }
}

/// Demo behaviors that drive orientation through angular steering instead of
/// deriving it from velocity.
fn demo_uses_rotation(behavior: &Behavior) -> bool {
    matches!(
        behavior,
        Behavior::Align { .. }
            | Behavior::Face { .. }
            | Behavior::LookWhereYoureGoing
            | Behavior::Wander(_)
            | Behavior::KinematicWander { .. }
            | Behavior::BlendedMoveLwyg { .. }
            | Behavior::Priority { .. }
    )
}

/// Advance the scripted player: stand still while netted, otherwise follow
/// the script, collide with the map, and scoop up any jar in reach.
fn step_player(state: &mut WorldState, script: &mut PlayerScript, dt: f32) {
    if let Some(hold) = &mut state.player.trapped {
        *hold -= dt;
        if *hold <= 0.0 {
            state.player.trapped = None;
            log::debug!("player wriggles free of the net");
        }
        state.player.kinematic.velocity = Vec2::ZERO;
        return;
    }

    let max_speed = match script {
        PlayerScript::Idle => {
            state.player.kinematic.velocity = Vec2::ZERO;
            0.0
        }
        PlayerScript::Patrol {
            waypoints,
            next,
            speed,
        } => {
            let position = state.player.kinematic.position;
            let target = waypoints[*next];
            if position.distance(target) <= WAYPOINT_RADIUS {
                *next = (*next + 1) % waypoints.len();
            }
            let to_target = waypoints[*next] - position;
            state.player.kinematic.velocity = to_target.normalize_or_zero() * *speed;
            *speed
        }
    };

    let half = state.player.half_extents;
    state.player.kinematic.update_with_collisions(
        SteeringOutput::ZERO,
        dt,
        max_speed,
        half,
        &state.obstacles,
        false,
    );
    state.player.kinematic.clamp_to_bounds(state.bounds, half);

    let position = state.player.kinematic.position;
    for (id, jar) in state.jars.iter_mut().enumerate() {
        if !jar.collected && !jar.on_web && position.distance(jar.position) <= PICKUP_RADIUS {
            jar.collected = true;
            state.player.honey_collected += 1;
            state.claimed_jars.remove(&id);
            log::info!(
                "player collects jar {id}, now holding {}",
                state.player.honey_collected
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Obstacle;

    fn cache_dir(label: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("beegrove-app-{label}-{}", std::process::id()))
    }

    #[test]
    fn arrive_demo_converges_on_the_idle_player() {
        let dir = cache_dir("arrive");
        let mut app = App::new("arrive", &dir, 7).unwrap();
        app.run(900);
        let player = app.state().player.kinematic.position;
        let mut distances = Vec::new();
        for (_, body) in app.world.query_mut::<&NpcBody>() {
            distances.push(body.kinematic.position.distance(player));
        }
        assert_eq!(distances.len(), 1);
        // Arrived and idling inside the slow radius.
        assert!(distances[0] < 40.0, "still {:.0}px out", distances[0]);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn priority_demo_chases_without_entering_obstacles() {
        let dir = cache_dir("priority");
        let mut app = App::new("priority", &dir, 13).unwrap();
        for _ in 0..600 {
            app.tick(TICK_RATE);
            let obstacles: Vec<Obstacle> = app.state().obstacles.clone();
            for (_, body) in app.world.query_mut::<&NpcBody>() {
                let bounds = body.kinematic.bounds(body.half_extents);
                assert!(
                    !obstacles.iter().any(|o| o.intersects_aabb(&bounds)),
                    "drone ended up inside an obstacle at ({:.0}, {:.0})",
                    body.kinematic.position.x,
                    body.kinematic.position.y
                );
            }
        }
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn role_scenario_reaches_steady_activity() {
        let dir = cache_dir("roles");
        let mut app = App::new("roles", &dir, 21).unwrap();
        app.run(1800);

        let bounds = app.state().bounds;
        let mut leaves = Vec::new();
        for (_, (body, hsm)) in app.world.query_mut::<(&NpcBody, &Hsm)>() {
            let pos = body.kinematic.position;
            assert!(pos.x >= 0.0 && pos.x <= bounds.x);
            assert!(pos.y >= 0.0 && pos.y <= bounds.y);
            leaves.push(hsm.active_leaf());
        }
        assert_eq!(leaves.len(), 3);
        assert!(leaves.iter().all(|leaf| leaf.is_some()));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn trapped_player_stays_put_until_the_net_expires() {
        let dir = cache_dir("trap");
        let mut app = App::new("seek", &dir, 3).unwrap();
        app.state.player.trapped = Some(0.5);
        let before = app.state().player.kinematic.position;
        for _ in 0..12 {
            app.tick(TICK_RATE);
        }
        assert_eq!(app.state().player.kinematic.position, before);
        assert!(app.state().player.is_trapped());
        for _ in 0..30 {
            app.tick(TICK_RATE);
        }
        assert!(!app.state().player.is_trapped());
        assert_ne!(app.state().player.kinematic.position, before);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
