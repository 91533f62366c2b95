//! The foundational behaviors: seek/flee/arrive in both the kinematic
//! (desired-velocity) and dynamic (acceleration) families, plus align and
//! velocity matching. Every normalize of a possibly-zero vector
//! short-circuits to a zero result instead of producing NaN.

use glam::Vec2;

use crate::kinematic::{clamp_length, wrap_degrees, Kinematic, KinematicSteeringOutput, SteeringOutput};
use crate::steering::{AlignTuning, ArriveTuning};

/// Two uniform draws subtracted: a cheap bell-ish sample in [-1, 1].
pub fn random_binomial(rng: &mut fastrand::Rng) -> f32 {
    rng.f32() - rng.f32()
}

pub fn kinematic_seek(actor: &Kinematic, target: Vec2, max_speed: f32) -> KinematicSteeringOutput {
    let direction = target - actor.position;
    if direction.length_squared() == 0.0 {
        return KinematicSteeringOutput::ZERO;
    }
    KinematicSteeringOutput {
        velocity: direction.normalize() * max_speed,
        rotation: 0.0,
    }
}

pub fn kinematic_flee(actor: &Kinematic, target: Vec2, max_speed: f32) -> KinematicSteeringOutput {
    let direction = actor.position - target;
    if direction.length_squared() == 0.0 {
        return KinematicSteeringOutput::ZERO;
    }
    KinematicSteeringOutput {
        velocity: direction.normalize() * max_speed,
        rotation: 0.0,
    }
}

pub fn kinematic_arrive(
    actor: &Kinematic,
    target: Vec2,
    max_speed: f32,
    target_radius: f32,
    time_to_target: f32,
) -> KinematicSteeringOutput {
    let direction = target - actor.position;
    if direction.length() < target_radius {
        return KinematicSteeringOutput::ZERO;
    }
    KinematicSteeringOutput {
        velocity: clamp_length(direction / time_to_target, max_speed),
        rotation: 0.0,
    }
}

pub fn kinematic_wander(
    actor: &Kinematic,
    max_speed: f32,
    max_rotation: f32,
    rng: &mut fastrand::Rng,
) -> KinematicSteeringOutput {
    KinematicSteeringOutput {
        velocity: actor.orientation_vector() * max_speed,
        rotation: random_binomial(rng) * max_rotation,
    }
}

pub fn dynamic_seek(actor: &Kinematic, target: Vec2, max_accel: f32) -> SteeringOutput {
    let direction = target - actor.position;
    if direction.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }
    SteeringOutput {
        linear: direction.normalize() * max_accel,
        angular: 0.0,
    }
}

pub fn dynamic_flee(actor: &Kinematic, target: Vec2, max_accel: f32) -> SteeringOutput {
    let direction = actor.position - target;
    if direction.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }
    SteeringOutput {
        linear: direction.normalize() * max_accel,
        angular: 0.0,
    }
}

pub fn dynamic_arrive(actor: &Kinematic, target: Vec2, tuning: &ArriveTuning) -> SteeringOutput {
    let direction = target - actor.position;
    let distance = direction.length();

    if distance < tuning.target_radius {
        return SteeringOutput::ZERO;
    }

    let target_speed = if distance > tuning.slow_radius {
        tuning.max_speed
    } else {
        tuning.max_speed * distance / tuning.slow_radius
    };

    // distance > target_radius >= 0 here, so the normalize is safe.
    let target_velocity = direction / distance * target_speed;
    let linear = clamp_length(
        (target_velocity - actor.velocity) / tuning.time_to_target,
        tuning.max_accel,
    );

    SteeringOutput { linear, angular: 0.0 }
}

pub fn align(actor: &Kinematic, target_orientation: f32, tuning: &AlignTuning) -> SteeringOutput {
    let direction = wrap_degrees(target_orientation - actor.orientation);
    let distance = direction.abs();

    if distance < tuning.target_radius {
        return SteeringOutput::ZERO;
    }

    let mut target_rotation = if distance > tuning.slow_radius {
        tuning.max_rotation
    } else {
        tuning.max_rotation * distance / tuning.slow_radius
    };
    target_rotation *= direction / distance;

    let mut angular = (target_rotation - actor.rotation) / tuning.time_to_target;
    if angular.abs() > tuning.max_angular_accel {
        angular = angular.signum() * tuning.max_angular_accel;
    }

    SteeringOutput {
        linear: Vec2::ZERO,
        angular,
    }
}

pub fn velocity_match(
    actor: &Kinematic,
    target_velocity: Vec2,
    max_accel: f32,
    time_to_target: f32,
) -> SteeringOutput {
    SteeringOutput {
        linear: clamp_length((target_velocity - actor.velocity) / time_to_target, max_accel),
        angular: 0.0,
    }
}
