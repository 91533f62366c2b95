//! Concrete enter/exit/update actions for the role state machines. Actions
//! configure a steering behavior on the NPC (usually an A* path through the
//! nav mesh), run it through the collision-aware integrator, and keep the
//! timers and flags the condition predicates read.

use glam::Vec2;

use crate::actor::{drive, ActionCtx, Goal, NpcBody};
use crate::hsm::{Event, StateParams};
use crate::nav::a_star_search;
use crate::path::AStarPath;
use crate::steering::{ArriveTuning, Behavior, FollowPath, Target};
use crate::world::WorldState;

/// Distance at which goal-directed states consider themselves arrived. The
/// same value goes into their `ReachedGoal` checks.
pub const GOAL_RADIUS: f32 = 8.0;

/// How long a netted player stays stuck.
const NET_HOLD_DURATION: f32 = 3.0;

/// Route to a world position: an A* follow-path through the nav mesh when
/// both endpoints sit on it, else a straight arrive. The final waypoint is
/// the exact target, not its containing node's centroid.
fn steer_to(npc: &NpcBody, world: &WorldState, target: Vec2) -> Behavior {
    if let Some(nav) = &world.nav {
        let start = npc
            .current_node
            .or_else(|| nav.find_node_at_position(npc.kinematic.position, None));
        let goal = nav.find_node_at_position(target, start);
        if let (Some(start), Some(goal)) = (start, goal) {
            if let Some(node_path) = a_star_search(start, goal, nav) {
                let mut points: Vec<Vec2> = node_path
                    .iter()
                    .filter_map(|&id| nav.node_position(id))
                    .collect();
                points.push(target);
                return Behavior::FollowPath(FollowPath::new(AStarPath::new(points)));
            }
        }
        log::debug!(
            "{}: no nav route to ({:.0}, {:.0}), arriving directly",
            npc.name,
            target.x,
            target.y
        );
    }
    Behavior::Arrive {
        target: Target::Point(target),
        tuning: ArriveTuning::default(),
    }
}

/// Clone the state's behavior template onto the NPC, aiming it at `target`
/// when one is given.
fn set_behavior(ctx: &mut ActionCtx, params: &StateParams, target: Option<Target>) {
    let mut behavior = params.behavior.clone();
    if let (Some(behavior), Some(target)) = (&mut behavior, target) {
        behavior.set_target(target);
    }
    ctx.npc.steering = behavior;
}

/// Shared leaf update for every state that just moves: run the configured
/// behavior through the integrator.
pub fn update_move(ctx: &mut ActionCtx, dt: f32, params: &StateParams) {
    drive(ctx, dt, params.rotation_driven);
}

/// Shared exit: drop the steering behavior so the next state starts clean.
pub fn exit_clear_steering(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.steering = None;
}

// --- Weaver: search jars / protect / throw net / alert ---

pub fn enter_search_jars(ctx: &mut ActionCtx, _params: &StateParams) {
    // Release a stale claim from a previous protect stint.
    if let Some(jar) = ctx.npc.claimed_jar.take() {
        ctx.world.claimed_jars.remove(&jar);
    }
    let from = ctx.npc.kinematic.position;
    let Some(jar) = ctx.world.nearest_free_jar(from) else {
        log::debug!("{}: no free jars to search for", ctx.npc.name);
        ctx.npc.goal = None;
        ctx.npc.steering = None;
        return;
    };
    let jar_pos = ctx.world.jars[jar].position;
    ctx.npc.goal = Some(Goal::Jar(jar));
    ctx.npc.steering = Some(steer_to(ctx.npc, ctx.world, jar_pos));
}

pub fn enter_protect(ctx: &mut ActionCtx, params: &StateParams) {
    let Some(Goal::Jar(jar)) = ctx.npc.goal else {
        // Nothing to guard; stand still until a condition moves us on.
        ctx.npc.steering = None;
        return;
    };
    ctx.npc.claimed_jar = Some(jar);
    if ctx.world.jars.get(jar).is_some_and(|j| !j.collected) {
        ctx.world.claimed_jars.insert(jar);
        let jar_pos = ctx.world.jars[jar].position;
        set_behavior(ctx, params, Some(Target::Point(jar_pos)));
        log::debug!("{} guards jar {jar}", ctx.npc.name);
    } else {
        // The jar vanished while we were away; the stale claim trips the
        // lost-jar check and sends us back to searching.
        ctx.npc.steering = None;
    }
}

pub fn exit_protect(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.steering = None;
}

pub fn enter_throw_net(ctx: &mut ActionCtx, params: &StateParams) {
    ctx.npc.is_attacking = true;
    ctx.npc.timers.windup = Some(0.0);
    set_behavior(ctx, params, Some(Target::Tracked));
}

pub fn update_throw_net(ctx: &mut ActionCtx, dt: f32, params: &StateParams) {
    drive(ctx, dt, params.rotation_driven);

    let Some(windup) = ctx.npc.timers.windup else {
        return;
    };
    if windup < params.windup_duration {
        return;
    }
    ctx.npc.timers.windup = None;
    ctx.npc.timers.attack_age = Some(0.0);

    let distance = ctx
        .npc
        .kinematic
        .position
        .distance(ctx.world.player.kinematic.position);
    if distance <= params.net_range {
        ctx.world.player.trapped = Some(NET_HOLD_DURATION);
        log::info!("{} nets the player at {distance:.0}px", ctx.npc.name);
        ctx.npc.emit_event(Event::PlayerNetted);
    } else {
        log::debug!("{} throws wide, player {distance:.0}px away", ctx.npc.name);
    }
}

pub fn exit_throw_net(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.is_attacking = false;
    ctx.npc.timers.windup = None;
    ctx.npc.steering = None;
}

pub fn enter_alert(ctx: &mut ActionCtx, _params: &StateParams) {
    let position = ctx.npc.kinematic.position;
    ctx.world.push_alert(position);
    ctx.npc.timers.alert = Some(0.0);
    ctx.npc.steering = None;
}

pub fn exit_alert(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.timers.alert = None;
}

// --- Hunter: stalk / steal / stash the loot / flee ---

pub fn enter_stalk(ctx: &mut ActionCtx, params: &StateParams) {
    set_behavior(ctx, params, Some(Target::Tracked));
    ctx.npc.goal = None;
}

pub fn enter_steal(ctx: &mut ActionCtx, params: &StateParams) {
    ctx.npc.timers.steal = None;
    set_behavior(ctx, params, Some(Target::Tracked));
}

/// Face the player; once close enough, channel the steal and lift a jar off
/// them when the channel completes. Backing out of range rewinds the channel.
pub fn update_steal(ctx: &mut ActionCtx, dt: f32, params: &StateParams) {
    drive(ctx, dt, params.rotation_driven);

    let distance = ctx
        .npc
        .kinematic
        .position
        .distance(ctx.world.player.kinematic.position);
    if distance > params.steal_radius {
        ctx.npc.timers.steal = None;
        return;
    }

    match ctx.npc.timers.steal {
        None => ctx.npc.timers.steal = Some(0.0),
        Some(t) if t >= params.steal_duration => {
            ctx.npc.timers.steal = None;
            if ctx.world.player.honey_collected > 0 {
                ctx.world.player.honey_collected -= 1;
                ctx.npc.carrying_jar = true;
                log::info!(
                    "{} steals a jar, player has {} left",
                    ctx.npc.name,
                    ctx.world.player.honey_collected
                );
                ctx.npc.emit_event(Event::JarStolen);
            }
        }
        Some(_) => {}
    }
}

pub fn exit_steal(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.timers.steal = None;
    ctx.npc.steering = None;
}

pub fn enter_stash_jar(ctx: &mut ActionCtx, params: &StateParams) {
    let from = ctx.npc.kinematic.position;
    match ctx.world.nearest_free_web(from) {
        Some(web) => {
            let web_pos = ctx.world.webs[web].position;
            ctx.npc.goal = Some(Goal::Web(web));
            ctx.npc.steering = Some(steer_to(ctx.npc, ctx.world, web_pos));
        }
        None => {
            // Nowhere to stash: run from the player until the timer bails us
            // back out to stalking.
            ctx.npc.goal = None;
            ctx.npc.steering = Some(Behavior::Flee {
                target: Target::Tracked,
                max_accel: 80.0,
            });
            ctx.npc.timers.flee = Some(0.0);
            ctx.npc.timers.flee_duration = params.flee_duration;
        }
    }
}

pub fn update_stash_jar(ctx: &mut ActionCtx, dt: f32, params: &StateParams) {
    drive(ctx, dt, params.rotation_driven);

    if let Some(Goal::Web(web)) = ctx.npc.goal {
        if ctx.npc.carrying_jar {
            let web_pos = ctx.world.webs[web].position;
            if ctx.npc.kinematic.position.distance(web_pos) <= GOAL_RADIUS {
                ctx.world.webs[web].has_pot = true;
                ctx.npc.carrying_jar = false;
                log::info!("{} stashes the stolen jar on web {web}", ctx.npc.name);
            }
        }
    }

    if ctx.npc.timers.flee.is_some_and(|t| t >= ctx.npc.timers.flee_duration) {
        ctx.npc.timers.flee = None;
        ctx.npc.emit_event(Event::FleeTimeout);
    }
}

pub fn exit_stash_jar(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.timers.flee = None;
    ctx.npc.goal = None;
    ctx.npc.steering = None;
}

// --- Shared flee state ---

pub fn enter_flee(ctx: &mut ActionCtx, params: &StateParams) {
    ctx.npc.timers.flee = Some(0.0);
    ctx.npc.timers.flee_duration = params.flee_duration;
    set_behavior(ctx, params, Some(Target::Tracked));
}

pub fn exit_flee(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.timers.flee = None;
    ctx.npc.steering = None;
}

// --- Brooder: seek safe zone / lay egg / guard egg ---

/// Sort nav nodes farthest-from-player first, skip any closer than the
/// minimum safe distance, and take the first of the top candidates A* can
/// actually reach.
pub fn enter_seek_safe_zone(ctx: &mut ActionCtx, params: &StateParams) {
    ctx.npc.goal = None;
    ctx.npc.steering = None;
    let Some(nav) = &ctx.world.nav else {
        log::debug!("{}: no nav mesh, cannot pick a safe zone", ctx.npc.name);
        return;
    };

    let player_pos = ctx.world.player.kinematic.position;
    let start = ctx
        .npc
        .current_node
        .or_else(|| nav.find_node_at_position(ctx.npc.kinematic.position, None));
    let Some(start) = start else {
        log::debug!("{}: off the nav mesh, cannot pick a safe zone", ctx.npc.name);
        return;
    };

    let mut candidates: Vec<(crate::nav::NodeId, Vec2)> =
        nav.nodes().iter().map(|(&id, &pos)| (id, pos)).collect();
    candidates.sort_by(|a, b| {
        b.1.distance_squared(player_pos)
            .total_cmp(&a.1.distance_squared(player_pos))
    });

    for (id, pos) in candidates.into_iter().take(params.top_candidates) {
        if pos.distance(player_pos) < params.min_safe_distance {
            continue;
        }
        let Some(node_path) = a_star_search(start, id, nav) else {
            continue;
        };
        let points: Vec<Vec2> = node_path
            .iter()
            .filter_map(|&node| nav.node_position(node))
            .collect();
        ctx.npc.goal = Some(Goal::Node(id));
        ctx.npc.steering = Some(Behavior::FollowPath(FollowPath::new(AStarPath::new(points))));
        log::debug!("{} heads for safe node {id}", ctx.npc.name);
        return;
    }
    log::debug!("{}: no reachable safe zone this far out", ctx.npc.name);
}

pub fn enter_lay_egg(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.steering = None;
    ctx.npc.egg_laid = false;
    ctx.npc.timers.egg = Some(0.0);
}

/// Stand still through the laying channel, then drop the egg and restart the
/// timer so it measures incubation from the moment of laying.
pub fn update_lay_egg(ctx: &mut ActionCtx, _dt: f32, params: &StateParams) {
    if ctx.npc.egg_laid {
        return;
    }
    if ctx.npc.timers.egg.is_some_and(|t| t >= params.egg_lay_duration) {
        let position = ctx.npc.kinematic.position;
        ctx.world.eggs.push(position);
        ctx.npc.egg_laid = true;
        ctx.npc.timers.egg = Some(0.0);
        log::info!(
            "{} lays an egg at ({:.0}, {:.0})",
            ctx.npc.name,
            position.x,
            position.y
        );
        ctx.npc.emit_event(Event::EggLaid);
    }
}

pub fn enter_guard_egg(ctx: &mut ActionCtx, params: &StateParams) {
    let site = ctx
        .world
        .eggs
        .last()
        .copied()
        .or_else(|| ctx.npc.goal_position(ctx.world))
        .unwrap_or(ctx.npc.kinematic.position);
    set_behavior(ctx, params, Some(Target::Point(site)));
}

pub fn exit_guard_egg(ctx: &mut ActionCtx, _params: &StateParams) {
    ctx.npc.egg_laid = false;
    ctx.npc.timers.egg = None;
    ctx.npc.steering = None;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{PlayerBody, Role};
    use crate::nav::{NavMesh, Region};
    use crate::world::{Jar, Web};

    fn corridor_nav() -> NavMesh {
        let square = |x: f32| Region {
            name: format!("r{x}"),
            navigable: true,
            points: vec![
                Vec2::new(x, 0.0),
                Vec2::new(x + 100.0, 0.0),
                Vec2::new(x + 100.0, 100.0),
                Vec2::new(x, 100.0),
            ],
        };
        NavMesh::build(&[square(0.0), square(100.0), square(200.0)]).unwrap()
    }

    fn harness() -> (NpcBody, WorldState, fastrand::Rng) {
        let npc = NpcBody::new(1, "spider", Role::Weaver, Vec2::new(50.0, 50.0));
        let mut world = WorldState::new(Vec2::new(300.0, 100.0), PlayerBody::at(Vec2::ZERO));
        world.nav = Some(corridor_nav());
        (npc, world, fastrand::Rng::with_seed(9))
    }

    #[test]
    fn search_jars_routes_through_the_mesh() {
        let (mut npc, mut world, mut rng) = harness();
        world.jars.push(Jar {
            position: Vec2::new(250.0, 50.0),
            on_web: false,
            collected: false,
        });
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_search_jars(&mut ctx, &StateParams::default());
        assert_eq!(npc.goal, Some(Goal::Jar(0)));
        match npc.steering {
            Some(Behavior::FollowPath(fp)) => {
                // Three node centroids plus the jar itself.
                assert_eq!(fp.path.points().len(), 4);
                assert_eq!(fp.path.end(), Some(Vec2::new(250.0, 50.0)));
            }
            other => panic!("expected a follow-path behavior, got {other:?}"),
        }
    }

    #[test]
    fn search_with_no_jars_stands_down() {
        let (mut npc, mut world, mut rng) = harness();
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_search_jars(&mut ctx, &StateParams::default());
        assert_eq!(npc.goal, None);
        assert!(npc.steering.is_none());
    }

    #[test]
    fn protect_claims_the_goal_jar() {
        let (mut npc, mut world, mut rng) = harness();
        world.jars.push(Jar {
            position: Vec2::new(60.0, 50.0),
            on_web: false,
            collected: false,
        });
        npc.goal = Some(Goal::Jar(0));
        let params = StateParams {
            behavior: Some(Behavior::Seek {
                target: Target::Tracked,
                max_accel: 150.0,
            }),
            ..StateParams::default()
        };
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_protect(&mut ctx, &params);
        assert_eq!(npc.claimed_jar, Some(0));
        assert!(world.claimed_jars.contains(&0));
        // Re-entering search releases the claim.
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_search_jars(&mut ctx, &StateParams::default());
        assert!(!world.claimed_jars.contains(&0));
    }

    #[test]
    fn steal_channel_lifts_a_jar_after_the_duration() {
        let (mut npc, mut world, mut rng) = harness();
        world.player.kinematic.position = Vec2::new(60.0, 50.0);
        world.player.honey_collected = 1;
        let params = StateParams {
            steal_radius: 48.0,
            steal_duration: 0.6,
            ..StateParams::default()
        };
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        let dt = 0.1;
        for _ in 0..10 {
            ctx.npc.timers.tick(dt);
            update_steal(&mut ctx, dt, &params);
            if ctx.npc.carrying_jar {
                break;
            }
        }
        assert!(npc.carrying_jar);
        assert_eq!(world.player.honey_collected, 0);
        assert_eq!(npc.pending_events, vec![Event::JarStolen]);
    }

    #[test]
    fn steal_channel_rewinds_when_the_player_escapes() {
        let (mut npc, mut world, mut rng) = harness();
        world.player.kinematic.position = Vec2::new(60.0, 50.0);
        world.player.honey_collected = 1;
        let params = StateParams::default();
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        update_steal(&mut ctx, 0.1, &params);
        assert!(ctx.npc.timers.steal.is_some());
        ctx.world.player.kinematic.position = Vec2::new(500.0, 50.0);
        update_steal(&mut ctx, 0.1, &params);
        assert!(npc.timers.steal.is_none());
        assert!(!npc.carrying_jar);
    }

    #[test]
    fn stash_jar_prefers_a_free_web_and_drops_the_loot() {
        let (mut npc, mut world, mut rng) = harness();
        npc.carrying_jar = true;
        world.webs.push(Web {
            position: Vec2::new(250.0, 50.0),
            has_pot: false,
        });
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_stash_jar(&mut ctx, &StateParams::default());
        assert_eq!(npc.goal, Some(Goal::Web(0)));

        // Teleport next to the web; the next update deposits the jar.
        npc.kinematic.position = Vec2::new(248.0, 50.0);
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        update_stash_jar(&mut ctx, 1.0 / 60.0, &StateParams::default());
        assert!(!npc.carrying_jar);
        assert!(world.webs[0].has_pot);
    }

    #[test]
    fn stash_jar_without_webs_flees_on_a_timer() {
        let (mut npc, mut world, mut rng) = harness();
        npc.carrying_jar = true;
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_stash_jar(&mut ctx, &StateParams::default());
        assert!(matches!(npc.steering, Some(Behavior::Flee { .. })));
        assert_eq!(npc.timers.flee, Some(0.0));
    }

    #[test]
    fn safe_zone_pick_is_far_from_the_player_and_reachable() {
        let (mut npc, mut world, mut rng) = harness();
        // Player in the left room; the far right room is the safe pick.
        world.player.kinematic.position = Vec2::new(50.0, 50.0);
        npc.kinematic.position = Vec2::new(150.0, 50.0);
        let params = StateParams {
            min_safe_distance: 120.0,
            ..StateParams::default()
        };
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_seek_safe_zone(&mut ctx, &params);
        assert_eq!(npc.goal, Some(Goal::Node(2)));
        assert!(matches!(npc.steering, Some(Behavior::FollowPath(_))));
    }

    #[test]
    fn lay_egg_spawns_one_egg_and_restarts_the_timer() {
        let (mut npc, mut world, mut rng) = harness();
        let params = StateParams {
            egg_lay_duration: 2.0,
            ..StateParams::default()
        };
        let mut ctx = ActionCtx {
            npc: &mut npc,
            world: &mut world,
            others: &[],
            rng: &mut rng,
        };
        enter_lay_egg(&mut ctx, &params);
        for _ in 0..30 {
            ctx.npc.timers.tick(0.1);
            update_lay_egg(&mut ctx, 0.1, &params);
        }
        assert_eq!(world.eggs.len(), 1);
        assert!(npc.egg_laid);
        assert_eq!(npc.pending_events, vec![Event::EggLaid]);
        // Timer restarted at laying, now measuring incubation.
        assert!(npc.timers.egg.is_some_and(|t| t < 1.5));
    }
}
