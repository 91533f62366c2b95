//! The three role state graphs, wired from the action and condition
//! libraries. Each builder returns a validated machine; the graphs are data,
//! the engine and the behaviors do the work.

use crate::hsm::actions::{self, GOAL_RADIUS};
use crate::hsm::conditions::Condition;
use crate::hsm::{Event, Hsm, HsmBuildError, StateDef, StateParams};
use crate::steering::{ArriveTuning, Behavior, Target};

/// Radius at which a spider notices the player.
const NOTICE_RADIUS: f32 = 150.0;
/// Radius past which a hunter gives up an attack.
const DISENGAGE_RADIUS: f32 = 200.0;
const DAMAGE_WINDOW: f32 = 1.0;
const ATTACK_WINDOW: f32 = 0.5;
const CRITICAL_HEALTH: f32 = 25.0;
const ALERT_DURATION: f32 = 5.0;
const INCUBATION: f32 = 5.0;

fn face_player() -> Behavior {
    Behavior::Face {
        target: Target::Tracked,
    }
}

/// Attack state shared by weaver and hunter; only the condition checks and
/// the outgoing transitions differ per role.
fn throw_net_state(checks: Vec<(Condition, Event)>) -> StateDef {
    StateDef::new("ThrowNet")
        .on_enter(actions::enter_throw_net)
        .on_exit(actions::exit_throw_net)
        .on_update(actions::update_throw_net)
        .params(StateParams {
            behavior: Some(face_player()),
            rotation_driven: true,
            net_range: 200.0,
            windup_duration: 0.8,
            checks,
            ..StateParams::default()
        })
}

fn flee_state(escape_event: Event, escape_to: &'static str) -> StateDef {
    StateDef::new("Flee")
        .on_enter(actions::enter_flee)
        .on_exit(actions::exit_flee)
        .on_update(actions::update_move)
        .transition(escape_event, escape_to)
        .params(StateParams {
            behavior: Some(Behavior::Flee {
                target: Target::Tracked,
                max_accel: 50.0,
            }),
            flee_duration: 6.0,
            checks: vec![(Condition::FleeExpired, escape_event)],
            ..StateParams::default()
        })
}

/// Weaver: tend the map's jars (search, then guard a claim), netting the
/// player on sight and raising an alert after a successful net. The Tend
/// compound remembers which sub-state it was in.
pub fn build_weaver() -> Result<Hsm, HsmBuildError> {
    let search = StateDef::new("SearchJars")
        .on_enter(actions::enter_search_jars)
        .on_exit(actions::exit_clear_steering)
        .on_update(actions::update_move)
        .transition(Event::FoundJar, "Protect")
        .params(StateParams {
            checks: vec![
                (Condition::ReachedGoal { threshold: GOAL_RADIUS }, Event::FoundJar),
                (Condition::PlayerWithin { radius: NOTICE_RADIUS }, Event::FoundPlayer),
                (Condition::RecentlyDamaged { window: DAMAGE_WINDOW }, Event::TookDamage),
            ],
            ..StateParams::default()
        });

    let protect = StateDef::new("Protect")
        .on_enter(actions::enter_protect)
        .on_exit(actions::exit_protect)
        .on_update(actions::update_move)
        .transition(Event::JarLost, "SearchJars")
        .params(StateParams {
            behavior: Some(Behavior::Seek {
                target: Target::Tracked,
                max_accel: 150.0,
            }),
            checks: vec![
                (Condition::PlayerWithin { radius: NOTICE_RADIUS }, Event::FoundPlayer),
                (Condition::RecentlyDamaged { window: DAMAGE_WINDOW }, Event::TookDamage),
                (Condition::ClaimedJarLost, Event::JarLost),
            ],
            ..StateParams::default()
        });

    let tend = StateDef::new("Tend")
        .initial("SearchJars")
        .history()
        .transition(Event::FoundPlayer, "ThrowNet")
        .transition(Event::TookDamage, "ThrowNet")
        .child(search)
        .child(protect);

    let throw_net = throw_net_state(vec![(
        Condition::AttackApplied { window: ATTACK_WINDOW },
        Event::AttackDone,
    )])
    .transition(Event::PlayerNetted, "Alert")
    .transition(Event::AttackDone, "Tend");

    let alert = StateDef::new("Alert")
        .on_enter(actions::enter_alert)
        .on_exit(actions::exit_alert)
        .transition(Event::PlayerStillNear, "ThrowNet")
        .transition(Event::AlertOver, "Tend")
        .params(StateParams {
            checks: vec![(
                Condition::AlertExpired { duration: ALERT_DURATION },
                Event::AlertOver,
            )],
            ..StateParams::default()
        });

    Hsm::new(
        StateDef::new("Root")
            .initial("Tend")
            .child(tend)
            .child(throw_net)
            .child(alert),
    )
}

/// Hunter: stalk the player, ambush them for a carried jar (steal, then run
/// the loot to a free web), net an empty-handed player, flee when near death.
pub fn build_hunter() -> Result<Hsm, HsmBuildError> {
    let stalk = StateDef::new("Stalk")
        .on_enter(actions::enter_stalk)
        .on_exit(actions::exit_clear_steering)
        .on_update(actions::update_move)
        .transition(Event::FoundPlayerCarrying, "Ambush")
        .transition(Event::FoundPlayerEmptyHanded, "ThrowNet")
        .transition(Event::TookDamage, "ThrowNet")
        .transition(Event::CriticalDamage, "Flee")
        .params(StateParams {
            behavior: Some(Behavior::Arrive {
                target: Target::Tracked,
                tuning: ArriveTuning {
                    max_accel: 150.0,
                    max_speed: 100.0,
                    target_radius: 5.0,
                    slow_radius: 100.0,
                    time_to_target: 0.1,
                },
            }),
            checks: vec![
                (
                    Condition::PlayerWithinCarrying { radius: NOTICE_RADIUS },
                    Event::FoundPlayerCarrying,
                ),
                (
                    Condition::PlayerWithinEmptyHanded { radius: NOTICE_RADIUS },
                    Event::FoundPlayerEmptyHanded,
                ),
                (Condition::RecentlyDamaged { window: DAMAGE_WINDOW }, Event::TookDamage),
            ],
            ..StateParams::default()
        });

    let steal = StateDef::new("Steal")
        .on_enter(actions::enter_steal)
        .on_exit(actions::exit_steal)
        .on_update(actions::update_steal)
        .transition(Event::JarStolen, "StashJar")
        .params(StateParams {
            behavior: Some(face_player()),
            rotation_driven: true,
            steal_radius: 48.0,
            steal_duration: 0.6,
            ..StateParams::default()
        });

    let stash = StateDef::new("StashJar")
        .on_enter(actions::enter_stash_jar)
        .on_exit(actions::exit_stash_jar)
        .on_update(actions::update_stash_jar)
        .transition(Event::JarStashed, "Stalk")
        .transition(Event::FleeTimeout, "Stalk")
        .params(StateParams {
            checks: vec![(
                Condition::ReachedGoal { threshold: GOAL_RADIUS },
                Event::JarStashed,
            )],
            ..StateParams::default()
        });

    let ambush = StateDef::new("Ambush")
        .initial("Steal")
        .child(steal)
        .child(stash);

    let throw_net = throw_net_state(vec![
        (
            Condition::HealthCritical { threshold: CRITICAL_HEALTH },
            Event::CriticalDamage,
        ),
        (
            Condition::PlayerOutside { radius: DISENGAGE_RADIUS },
            Event::PlayerFled,
        ),
    ])
    .transition(Event::PlayerFled, "Stalk")
    .transition(Event::CriticalDamage, "Flee");

    Hsm::new(
        StateDef::new("Root")
            .initial("Stalk")
            .child(stalk)
            .child(ambush)
            .child(throw_net)
            .child(flee_state(Event::DangerPassed, "Stalk")),
    )
}

/// Brooder: walk to the nav node farthest from the player, brood there (lay
/// an egg, then guard it through incubation), and bolt whenever the player
/// closes in.
pub fn build_brooder() -> Result<Hsm, HsmBuildError> {
    let seek_safe = StateDef::new("SeekSafeZone")
        .on_enter(actions::enter_seek_safe_zone)
        .on_exit(actions::exit_clear_steering)
        .on_update(actions::update_move)
        .transition(Event::SafeZoneFound, "Brood")
        .params(StateParams {
            min_safe_distance: 200.0,
            top_candidates: 8,
            checks: vec![(Condition::AtSafeNode, Event::SafeZoneFound)],
            ..StateParams::default()
        });

    let lay_egg = StateDef::new("LayEgg")
        .on_enter(actions::enter_lay_egg)
        .on_update(actions::update_lay_egg)
        .transition(Event::EggLaid, "GuardEgg")
        .transition(Event::EnemyNearby, "Flee")
        .params(StateParams {
            egg_lay_duration: 2.0,
            checks: vec![(
                Condition::PlayerWithin { radius: NOTICE_RADIUS },
                Event::EnemyNearby,
            )],
            ..StateParams::default()
        });

    let guard_egg = StateDef::new("GuardEgg")
        .on_enter(actions::enter_guard_egg)
        .on_exit(actions::exit_guard_egg)
        .on_update(actions::update_move)
        .transition(Event::EnemyNearby, "Flee")
        .transition(Event::OffspringHatched, "SeekSafeZone")
        .params(StateParams {
            behavior: Some(Behavior::Seek {
                target: Target::Tracked,
                max_accel: 150.0,
            }),
            checks: vec![
                (Condition::PlayerWithin { radius: NOTICE_RADIUS }, Event::EnemyNearby),
                (
                    Condition::OffspringDue { incubation: INCUBATION },
                    Event::OffspringHatched,
                ),
            ],
            ..StateParams::default()
        });

    let brood = StateDef::new("Brood")
        .initial("LayEgg")
        .child(lay_egg)
        .child(guard_egg);

    Hsm::new(
        StateDef::new("Root")
            .initial("SeekSafeZone")
            .child(seek_safe)
            .child(brood)
            .child(flee_state(Event::DangerPassed, "SeekSafeZone")),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actor::{ActionCtx, NpcBody, PlayerBody, Role};
    use crate::nav::{NavMesh, Region};
    use crate::world::{Jar, WorldState};
    use glam::Vec2;

    const DT: f32 = 1.0 / 60.0;

    fn room(name: &str, x: f32, y: f32) -> Region {
        Region {
            name: name.into(),
            navigable: true,
            points: vec![
                Vec2::new(x, y),
                Vec2::new(x + 200.0, y),
                Vec2::new(x + 200.0, y + 200.0),
                Vec2::new(x, y + 200.0),
            ],
        }
    }

    fn world_with_nav() -> WorldState {
        let mut world = WorldState::new(
            Vec2::new(600.0, 200.0),
            PlayerBody::at(Vec2::new(560.0, 100.0)),
        );
        world.nav = Some(
            NavMesh::build(&[
                room("west", 0.0, 0.0),
                room("mid", 200.0, 0.0),
                room("east", 400.0, 0.0),
            ])
            .unwrap(),
        );
        world
    }

    fn run_ticks(
        hsm: &mut Hsm,
        npc: &mut NpcBody,
        world: &mut WorldState,
        rng: &mut fastrand::Rng,
        ticks: usize,
    ) {
        for _ in 0..ticks {
            npc.timers.tick(DT);
            let mut ctx = ActionCtx {
                npc,
                world,
                others: &[],
                rng,
            };
            hsm.update(DT, &mut ctx);
        }
    }

    /// Tick until the active leaf matches, or fail after `max_ticks`.
    fn run_until(
        hsm: &mut Hsm,
        npc: &mut NpcBody,
        world: &mut WorldState,
        rng: &mut fastrand::Rng,
        leaf: &str,
        max_ticks: usize,
    ) {
        for _ in 0..max_ticks {
            run_ticks(hsm, npc, world, rng, 1);
            if hsm.active_leaf() == Some(leaf) {
                return;
            }
        }
        panic!(
            "never reached leaf '{leaf}' within {max_ticks} ticks, stuck at {}",
            hsm.active_path()
        );
    }

    #[test]
    fn all_three_trees_validate() {
        assert!(build_weaver().is_ok());
        assert!(build_hunter().is_ok());
        assert!(build_brooder().is_ok());
    }

    #[test]
    fn weaver_walks_to_a_jar_and_settles_into_protect() {
        let mut world = world_with_nav();
        world.jars.push(Jar {
            position: Vec2::new(300.0, 100.0),
            on_web: false,
            collected: false,
        });
        let mut npc = NpcBody::new(1, "weaver", Role::Weaver, Vec2::new(100.0, 100.0));
        let mut rng = fastrand::Rng::with_seed(11);
        let mut hsm = build_weaver().unwrap();

        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/Tend/SearchJars");

        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "Protect", 1200);
        assert_eq!(hsm.active_path(), "Root/Tend/Protect");
        assert!(world.claimed_jars.contains(&0));
    }

    #[test]
    fn weaver_attacks_when_the_player_closes_in() {
        let mut world = world_with_nav();
        let mut npc = NpcBody::new(1, "weaver", Role::Weaver, Vec2::new(100.0, 100.0));
        let mut rng = fastrand::Rng::with_seed(2);
        let mut hsm = build_weaver().unwrap();
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);

        world.player.kinematic.position = Vec2::new(120.0, 100.0);
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/ThrowNet");
        assert!(npc.is_attacking);

        // The windup completes within range, so the net lands, the queued
        // event moves us to Alert, and the alert eventually times out.
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "Alert", 120);
        assert_eq!(hsm.active_path(), "Root/Alert");
        assert!(world.player.is_trapped());
        assert_eq!(world.alerts.len(), 1);

        world.player.kinematic.position = Vec2::new(560.0, 100.0);
        world.player.trapped = None;
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "SearchJars", 600);
        // History put Tend back into its remembered search sub-state.
        assert_eq!(hsm.active_path(), "Root/Tend/SearchJars");
    }

    #[test]
    fn hunter_ambushes_a_carrying_player_and_stalks_an_empty_handed_one() {
        let mut world = world_with_nav();
        let mut npc = NpcBody::new(1, "hunter", Role::Hunter, Vec2::new(100.0, 100.0));
        let mut rng = fastrand::Rng::with_seed(3);
        let mut hsm = build_hunter().unwrap();
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/Stalk");

        world.player.kinematic.position = Vec2::new(130.0, 100.0);
        world.player.honey_collected = 1;
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/Ambush/Steal");

        // Let the steal channel run: jar changes hands, hunter heads off to
        // stash it.
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "StashJar", 300);
        assert_eq!(world.player.honey_collected, 0);
        assert_eq!(hsm.active_path(), "Root/Ambush/StashJar");
    }

    #[test]
    fn hunter_flees_at_critical_health() {
        let mut world = world_with_nav();
        let mut npc = NpcBody::new(1, "hunter", Role::Hunter, Vec2::new(100.0, 100.0));
        let mut rng = fastrand::Rng::with_seed(4);
        let mut hsm = build_hunter().unwrap();

        world.player.kinematic.position = Vec2::new(130.0, 100.0);
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 2);
        assert_eq!(hsm.active_path(), "Root/ThrowNet");

        npc.take_damage(90.0);
        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/Flee");

        // With the player gone, the flee timer expires and the hunter goes
        // back to stalking instead of re-engaging.
        world.player.kinematic.position = Vec2::new(560.0, 100.0);
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "Stalk", 600);
        assert_eq!(hsm.active_path(), "Root/Stalk");
    }

    #[test]
    fn brooder_finds_a_safe_node_lays_and_guards() {
        let mut world = world_with_nav();
        // Player far east; the west room is the safe zone.
        let mut npc = NpcBody::new(1, "brooder", Role::Brooder, Vec2::new(300.0, 100.0));
        let mut rng = fastrand::Rng::with_seed(5);
        let mut hsm = build_brooder().unwrap();

        run_ticks(&mut hsm, &mut npc, &mut world, &mut rng, 1);
        assert_eq!(hsm.active_path(), "Root/SeekSafeZone");
        assert_eq!(npc.goal, Some(crate::actor::Goal::Node(0)));

        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "LayEgg", 1200);
        assert_eq!(hsm.active_path(), "Root/Brood/LayEgg");

        // Laying takes two seconds, then the guard stint begins.
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "GuardEgg", 300);
        assert_eq!(world.eggs.len(), 1);

        // Incubation elapses and the brooder moves on to a fresh site.
        run_until(&mut hsm, &mut npc, &mut world, &mut rng, "SeekSafeZone", 600);
    }
}
