use glam::Vec2;

use crate::hsm::Event;
use crate::kinematic::{Kinematic, SteeringOutput};
use crate::nav::NodeId;
use crate::steering::{Behavior, SteeringCommand, SteeringContext};
use crate::world::{KinSnapshot, WorldState};

/// What an NPC spends its life doing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Builds webs, protects jars, traps the player.
    Weaver,
    /// Stalks the player and steals carried jars.
    Hunter,
    /// Finds safe ground and incubates eggs.
    Brooder,
    /// Plain steering demo actor with no state machine.
    Drone,
}

/// What an NPC is currently trying to reach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Goal {
    Point(Vec2),
    Node(NodeId),
    Jar(usize),
    Web(usize),
}

/// Elapsed-time accumulators driven by simulation dt, never wall clock.
/// `None` means the timer is not running.
#[derive(Debug, Clone, Default)]
pub struct Timers {
    /// Seconds since entering the alert state.
    pub alert: Option<f32>,
    /// Seconds spent fleeing.
    pub flee: Option<f32>,
    /// How long the current flee should last.
    pub flee_duration: f32,
    /// Seconds since the last completed attack.
    pub attack_age: Option<f32>,
    /// Attack wind-up progress.
    pub windup: Option<f32>,
    /// Steal channel progress.
    pub steal: Option<f32>,
    /// Egg laying progress, then incubation once laid.
    pub egg: Option<f32>,
    /// Seconds since last taking damage.
    pub hit_age: Option<f32>,
}

impl Timers {
    pub fn tick(&mut self, dt: f32) {
        for t in [
            &mut self.alert,
            &mut self.flee,
            &mut self.attack_age,
            &mut self.windup,
            &mut self.steal,
            &mut self.egg,
            &mut self.hit_age,
        ] {
            if let Some(v) = t {
                *v += dt;
            }
        }
    }
}

/// The mutable body of one NPC: motion state, health, current behavior and
/// the bookkeeping its HSM actions and conditions read. Owned exclusively by
/// the NPC's own update call.
pub struct NpcBody {
    pub id: u32,
    pub name: String,
    pub role: Role,
    pub health: f32,
    pub max_speed: f32,
    pub kinematic: Kinematic,
    /// Half size of the collision rectangle.
    pub half_extents: Vec2,
    pub steering: Option<Behavior>,
    pub goal: Option<Goal>,
    /// Nav-mesh locality hint, refreshed as the actor moves.
    pub current_node: Option<NodeId>,
    /// Jar this NPC has claimed for protection.
    pub claimed_jar: Option<usize>,
    pub carrying_jar: bool,
    pub is_attacking: bool,
    pub egg_laid: bool,
    /// Events queued for the HSM; drained during its update.
    pub pending_events: Vec<Event>,
    pub timers: Timers,
}

impl NpcBody {
    pub fn new(id: u32, name: impl Into<String>, role: Role, position: Vec2) -> Self {
        Self {
            id,
            name: name.into(),
            role,
            health: 100.0,
            max_speed: 100.0,
            kinematic: Kinematic::at(position),
            half_extents: Vec2::new(16.0, 16.0),
            steering: None,
            goal: None,
            current_node: None,
            claimed_jar: None,
            carrying_jar: false,
            is_attacking: false,
            egg_laid: false,
            pending_events: Vec::new(),
            timers: Timers::default(),
        }
    }

    /// Queue an event for the state machine.
    pub fn emit_event(&mut self, event: Event) {
        self.pending_events.push(event);
    }

    pub fn take_damage(&mut self, amount: f32) {
        self.health -= amount;
        self.timers.hit_age = Some(0.0);
        log::debug!("{} took {amount} damage, {} health left", self.name, self.health);
    }

    /// Position the NPC is heading for, resolved against the world.
    pub fn goal_position(&self, world: &WorldState) -> Option<Vec2> {
        match self.goal? {
            Goal::Point(p) => Some(p),
            Goal::Node(id) => world.nav.as_ref().and_then(|nav| nav.node_position(id)),
            Goal::Jar(id) => world.jars.get(id).map(|j| j.position),
            Goal::Web(id) => world.webs.get(id).map(|w| w.position),
        }
    }
}

/// The player-controlled bee, seen from the AI's side: position, carried
/// honey, and whether a net currently holds it.
pub struct PlayerBody {
    pub kinematic: Kinematic,
    pub health: f32,
    pub honey_collected: u32,
    /// Seconds left stuck in a net.
    pub trapped: Option<f32>,
    pub half_extents: Vec2,
}

impl PlayerBody {
    pub fn at(position: Vec2) -> Self {
        Self {
            kinematic: Kinematic::at(position),
            health: 100.0,
            honey_collected: 0,
            trapped: None,
            half_extents: Vec2::new(17.0, 17.0),
        }
    }

    pub fn is_trapped(&self) -> bool {
        self.trapped.is_some()
    }
}

/// Everything an HSM action may touch while one NPC updates: its own body,
/// the shared world, this tick's read-only snapshots, and the RNG.
pub struct ActionCtx<'a> {
    pub npc: &'a mut NpcBody,
    pub world: &'a mut WorldState,
    pub others: &'a [KinSnapshot],
    pub rng: &'a mut fastrand::Rng,
}

/// Run the NPC's configured steering behavior through the collision-aware
/// integrator, then refresh its nav-mesh locality hint. No behavior
/// configured means the actor stays put this tick.
pub fn drive(ctx: &mut ActionCtx, dt: f32, rotation_driven: bool) {
    let Some(mut behavior) = ctx.npc.steering.take() else {
        return;
    };

    let cmd = {
        let sctx = SteeringContext {
            tracked: &ctx.world.player.kinematic,
            self_id: ctx.npc.id,
            others: ctx.others,
            obstacles: &ctx.world.obstacles,
        };
        behavior.compute(&ctx.npc.kinematic, &sctx, ctx.rng)
    };

    let steering = match cmd {
        SteeringCommand::Velocity(k) => {
            // Kinematic family: the output IS the velocity.
            ctx.npc.kinematic.velocity = k.velocity;
            ctx.npc.kinematic.rotation = k.rotation;
            SteeringOutput::ZERO
        }
        SteeringCommand::Accel(s) => s,
    };

    ctx.npc.kinematic.update_with_collisions(
        steering,
        dt,
        ctx.npc.max_speed,
        ctx.npc.half_extents,
        &ctx.world.obstacles,
        rotation_driven,
    );
    ctx.npc
        .kinematic
        .clamp_to_bounds(ctx.world.bounds, ctx.npc.half_extents);
    ctx.npc.steering = Some(behavior);

    if let Some(nav) = &ctx.world.nav {
        ctx.npc.current_node =
            nav.find_node_at_position(ctx.npc.kinematic.position, ctx.npc.current_node);
    }
}
