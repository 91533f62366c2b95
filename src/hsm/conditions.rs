//! Named boolean predicates over actor + world state, built into each role's
//! state definitions at construction time. Every predicate is total: a
//! missing prerequisite (no goal set, no timer running, no nav mesh)
//! evaluates to false instead of faulting, so one bad check can never abort
//! a tick.

use crate::actor::{Goal, NpcBody};
use crate::world::WorldState;

/// A condition tag plus its tuning, paired with an event in a state's
/// ordered check list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Condition {
    /// The configured behavior reports completion, or the goal position is
    /// within `threshold` pixels.
    ReachedGoal { threshold: f32 },
    PlayerWithin { radius: f32 },
    PlayerOutside { radius: f32 },
    /// Damage taken within the last `window` seconds.
    RecentlyDamaged { window: f32 },
    /// The alert timer has run for at least `duration` seconds.
    AlertExpired { duration: f32 },
    /// An attack completed within the last `window` seconds.
    AttackApplied { window: f32 },
    /// The jar this NPC claimed is no longer in the world's claimed set.
    ClaimedJarLost,
    /// Player within `radius` and carrying at least one jar.
    PlayerWithinCarrying { radius: f32 },
    /// Player within `radius` and carrying nothing.
    PlayerWithinEmptyHanded { radius: f32 },
    HealthCritical { threshold: f32 },
    /// The flee timer ran past the body's configured flee duration.
    FleeExpired,
    /// The NPC stands in the nav node it set out for.
    AtSafeNode,
    /// The incubation time has elapsed since the egg-laid flag was set.
    OffspringDue { incubation: f32 },
}

pub fn evaluate(condition: &Condition, npc: &NpcBody, world: &WorldState) -> bool {
    let player_distance_sq = npc
        .kinematic
        .position
        .distance_squared(world.player.kinematic.position);

    match *condition {
        Condition::ReachedGoal { threshold } => {
            if npc
                .steering
                .as_ref()
                .is_some_and(|b| b.finished(&npc.kinematic))
            {
                return true;
            }
            npc.goal_position(world)
                .is_some_and(|goal| npc.kinematic.position.distance(goal) <= threshold)
        }
        Condition::PlayerWithin { radius } => player_distance_sq <= radius * radius,
        Condition::PlayerOutside { radius } => player_distance_sq > radius * radius,
        Condition::RecentlyDamaged { window } => {
            npc.timers.hit_age.is_some_and(|age| age <= window)
        }
        Condition::AlertExpired { duration } => {
            npc.timers.alert.is_some_and(|t| t >= duration)
        }
        Condition::AttackApplied { window } => {
            npc.timers.attack_age.is_some_and(|age| age <= window)
        }
        Condition::ClaimedJarLost => npc
            .claimed_jar
            .is_some_and(|id| !world.claimed_jars.contains(&id)),
        Condition::PlayerWithinCarrying { radius } => {
            player_distance_sq <= radius * radius && world.player.honey_collected > 0
        }
        Condition::PlayerWithinEmptyHanded { radius } => {
            player_distance_sq <= radius * radius && world.player.honey_collected == 0
        }
        Condition::HealthCritical { threshold } => npc.health <= threshold,
        Condition::FleeExpired => {
            npc.timers.flee_duration > 0.0
                && npc.timers.flee.is_some_and(|t| t >= npc.timers.flee_duration)
        }
        Condition::AtSafeNode => match npc.goal {
            Some(Goal::Node(id)) => npc.current_node == Some(id),
            _ => false,
        },
        Condition::OffspringDue { incubation } => {
            npc.egg_laid && npc.timers.egg.is_some_and(|t| t >= incubation)
        }
    }
}
