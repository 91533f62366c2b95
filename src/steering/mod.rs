//! Steering behavior library: a closed set of behavior kinds, each carrying
//! its own typed parameters, composed through blending and priority
//! arbitration. Behaviors are pure over the actor/target motion state except
//! for their own persistent bits (wander angle), and compute sub-targets by
//! value instead of scribbling into shared scratch objects.

pub mod avoid;
pub mod basic;
pub mod follow;
pub mod pursuit;

use glam::Vec2;

use crate::kinematic::{Kinematic, KinematicSteeringOutput, SteeringOutput};
use crate::path::AStarPath;
use crate::world::{KinSnapshot, Obstacle};

/// What a behavior asks of the integrator: a desired velocity (kinematic
/// family) or an acceleration (dynamic family).
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SteeringCommand {
    Velocity(KinematicSteeringOutput),
    Accel(SteeringOutput),
}

impl SteeringCommand {
    pub const NONE: SteeringCommand = SteeringCommand::Accel(SteeringOutput::ZERO);

    pub fn is_zero(&self) -> bool {
        match self {
            SteeringCommand::Velocity(k) => k.is_zero(),
            SteeringCommand::Accel(s) => s.is_zero(),
        }
    }
}

/// Read-only view of the frame a behavior steers against.
pub struct SteeringContext<'a> {
    /// The character this behavior's `Target::Tracked` refers to (the player,
    /// for every NPC role).
    pub tracked: &'a Kinematic,
    /// Snapshot id of the steering actor, so it can skip itself.
    pub self_id: u32,
    pub others: &'a [KinSnapshot],
    pub obstacles: &'a [Obstacle],
}

/// Who or what a behavior steers relative to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Target {
    /// The context's tracked character, velocity and all.
    Tracked,
    /// A fixed world position with no motion of its own.
    Point(Vec2),
}

impl Target {
    pub fn resolve(&self, ctx: &SteeringContext) -> Kinematic {
        match self {
            Target::Tracked => *ctx.tracked,
            Target::Point(p) => Kinematic::at(*p),
        }
    }
}

/// Arrival shaping shared by Arrive, Pursue and FollowPath.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArriveTuning {
    pub max_accel: f32,
    pub max_speed: f32,
    pub target_radius: f32,
    pub slow_radius: f32,
    pub time_to_target: f32,
}

impl Default for ArriveTuning {
    fn default() -> Self {
        Self {
            max_accel: 150.0,
            max_speed: 80.0,
            target_radius: 2.0,
            slow_radius: 15.0,
            time_to_target: 0.1,
        }
    }
}

/// Rotation shaping for Align and everything built on it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AlignTuning {
    pub max_rotation: f32,
    pub max_angular_accel: f32,
    pub target_radius: f32,
    pub slow_radius: f32,
    pub time_to_target: f32,
}

/// The behavior table. Composite variants own their sub-behavior state, so a
/// whole stack (priority list of avoidance + blended pursuit) clones as one
/// value.
#[derive(Debug, Clone)]
pub enum Behavior {
    KinematicSeek { target: Target, max_speed: f32 },
    KinematicFlee { target: Target, max_speed: f32 },
    KinematicArrive {
        target: Target,
        max_speed: f32,
        target_radius: f32,
        time_to_target: f32,
    },
    KinematicWander { max_speed: f32, max_rotation: f32 },
    Seek { target: Target, max_accel: f32 },
    Flee { target: Target, max_accel: f32 },
    Arrive { target: Target, tuning: ArriveTuning },
    Align { target: Target, tuning: AlignTuning },
    VelocityMatch {
        target: Target,
        max_accel: f32,
        time_to_target: f32,
    },
    Pursue {
        target: Target,
        max_prediction: f32,
        max_accel: f32,
        max_speed: f32,
    },
    Evade {
        target: Target,
        max_prediction: f32,
        max_accel: f32,
    },
    Face { target: Target },
    LookWhereYoureGoing,
    Wander(Wander),
    ObstacleAvoidance {
        avoid_distance: f32,
        lookahead: f32,
        max_accel: f32,
    },
    CollisionAvoidance { radius: f32, max_accel: f32 },
    FollowPath(FollowPath),
    /// Linear term from the movement behavior (Pursue or Evade), angular term
    /// from LookWhereYoureGoing.
    BlendedMoveLwyg { movement: Box<Behavior> },
    /// First behavior in the list producing nonzero steering wins.
    Priority { behaviors: Vec<Behavior> },
}

/// Persistent wander-circle state.
#[derive(Debug, Clone)]
pub struct Wander {
    pub max_accel: f32,
    pub offset: f32,
    pub radius: f32,
    pub rate: f32,
    /// Accumulated wander angle, degrees.
    pub orientation: f32,
}

impl Wander {
    pub fn new(max_accel: f32) -> Self {
        Self {
            max_accel,
            offset: 8.0,
            radius: 10.0,
            rate: 0.9,
            orientation: 0.0,
        }
    }
}

/// Path-following state: the polyline, how far ahead of the projected point
/// to aim, and the arrival shaping used on the moving target.
#[derive(Debug, Clone)]
pub struct FollowPath {
    pub path: AStarPath,
    /// Arc-length lead distance along the path, in pixels.
    pub offset: f32,
    pub arrive: ArriveTuning,
}

impl FollowPath {
    pub fn new(path: AStarPath) -> Self {
        Self {
            path,
            offset: 20.0,
            arrive: ArriveTuning::default(),
        }
    }

    /// Whether the actor has effectively arrived at the path's end.
    pub fn finished(&self, actor: &Kinematic) -> bool {
        match self.path.end() {
            Some(end) => actor.position.distance(end) <= self.arrive.target_radius,
            None => true,
        }
    }
}

impl Behavior {
    /// Produce this tick's steering. Mutates only the behavior's own
    /// persistent state (wander angle).
    pub fn compute(
        &mut self,
        actor: &Kinematic,
        ctx: &SteeringContext,
        rng: &mut fastrand::Rng,
    ) -> SteeringCommand {
        match self {
            Behavior::KinematicSeek { target, max_speed } => {
                let t = target.resolve(ctx);
                SteeringCommand::Velocity(basic::kinematic_seek(actor, t.position, *max_speed))
            }
            Behavior::KinematicFlee { target, max_speed } => {
                let t = target.resolve(ctx);
                SteeringCommand::Velocity(basic::kinematic_flee(actor, t.position, *max_speed))
            }
            Behavior::KinematicArrive {
                target,
                max_speed,
                target_radius,
                time_to_target,
            } => {
                let t = target.resolve(ctx);
                SteeringCommand::Velocity(basic::kinematic_arrive(
                    actor,
                    t.position,
                    *max_speed,
                    *target_radius,
                    *time_to_target,
                ))
            }
            Behavior::KinematicWander {
                max_speed,
                max_rotation,
            } => SteeringCommand::Velocity(basic::kinematic_wander(
                actor,
                *max_speed,
                *max_rotation,
                rng,
            )),
            Behavior::Seek { target, max_accel } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(basic::dynamic_seek(actor, t.position, *max_accel))
            }
            Behavior::Flee { target, max_accel } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(basic::dynamic_flee(actor, t.position, *max_accel))
            }
            Behavior::Arrive { target, tuning } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(basic::dynamic_arrive(actor, t.position, tuning))
            }
            Behavior::Align { target, tuning } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(basic::align(actor, t.orientation, tuning))
            }
            Behavior::VelocityMatch {
                target,
                max_accel,
                time_to_target,
            } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(basic::velocity_match(
                    actor,
                    t.velocity,
                    *max_accel,
                    *time_to_target,
                ))
            }
            Behavior::Pursue {
                target,
                max_prediction,
                max_accel,
                max_speed,
            } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(pursuit::pursue(
                    actor,
                    &t,
                    *max_prediction,
                    *max_accel,
                    *max_speed,
                ))
            }
            Behavior::Evade {
                target,
                max_prediction,
                max_accel,
            } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(pursuit::evade(actor, &t, *max_prediction, *max_accel))
            }
            Behavior::Face { target } => {
                let t = target.resolve(ctx);
                SteeringCommand::Accel(pursuit::face(actor, t.position))
            }
            Behavior::LookWhereYoureGoing => {
                SteeringCommand::Accel(pursuit::look_where_youre_going(actor))
            }
            Behavior::Wander(w) => SteeringCommand::Accel(pursuit::wander(actor, w, rng)),
            Behavior::ObstacleAvoidance {
                avoid_distance,
                lookahead,
                max_accel,
            } => SteeringCommand::Accel(avoid::obstacle_avoidance(
                actor,
                ctx.obstacles,
                *lookahead,
                *avoid_distance,
                *max_accel,
            )),
            Behavior::CollisionAvoidance { radius, max_accel } => {
                SteeringCommand::Accel(avoid::collision_avoidance(
                    actor,
                    ctx.self_id,
                    ctx.others,
                    *radius,
                    *max_accel,
                ))
            }
            Behavior::FollowPath(fp) => SteeringCommand::Accel(follow::follow_path(actor, fp)),
            Behavior::BlendedMoveLwyg { movement } => {
                let move_cmd = movement.compute(actor, ctx, rng);
                let linear = match move_cmd {
                    SteeringCommand::Accel(s) => s.linear,
                    SteeringCommand::Velocity(k) => k.velocity,
                };
                let lwyg = pursuit::look_where_youre_going(actor);
                SteeringCommand::Accel(SteeringOutput {
                    linear,
                    angular: lwyg.angular,
                })
            }
            Behavior::Priority { behaviors } => {
                for behavior in behaviors.iter_mut() {
                    let result = behavior.compute(actor, ctx, rng);
                    if !result.is_zero() {
                        return result;
                    }
                }
                SteeringCommand::NONE
            }
        }
    }

    /// Point the behavior's target at something else. Variants without a
    /// target are left alone.
    pub fn set_target(&mut self, new_target: Target) {
        match self {
            Behavior::KinematicSeek { target, .. }
            | Behavior::KinematicFlee { target, .. }
            | Behavior::KinematicArrive { target, .. }
            | Behavior::Seek { target, .. }
            | Behavior::Flee { target, .. }
            | Behavior::Arrive { target, .. }
            | Behavior::Align { target, .. }
            | Behavior::VelocityMatch { target, .. }
            | Behavior::Pursue { target, .. }
            | Behavior::Evade { target, .. }
            | Behavior::Face { target } => *target = new_target,
            Behavior::BlendedMoveLwyg { movement } => movement.set_target(new_target),
            _ => {}
        }
    }

    /// Behavior-reported completion, where the behavior has a notion of
    /// being done (path following reaching the final waypoint).
    pub fn finished(&self, actor: &Kinematic) -> bool {
        match self {
            Behavior::FollowPath(fp) => fp.finished(actor),
            _ => false,
        }
    }
}
