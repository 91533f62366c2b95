//! Prediction-based behaviors: pursue/evade aim at where the target will be,
//! face and look-where-you're-going turn the actor via align, and wander
//! walks a point around a circle projected ahead of the actor.

use glam::Vec2;

use crate::kinematic::{heading_vector, velocity_heading, Kinematic, SteeringOutput};
use crate::steering::basic::{self, random_binomial};
use crate::steering::{AlignTuning, ArriveTuning, Wander};

/// Rotation shaping used whenever a behavior turns through align on its own
/// behalf (face, look-where-you're-going, wander).
const FACE_ALIGN: AlignTuning = AlignTuning {
    max_rotation: 50.0,
    max_angular_accel: 100.0,
    target_radius: 5.0,
    slow_radius: 10.0,
    time_to_target: 0.1,
};

/// Arrival shaping pursue uses on the predicted intercept point.
const PURSUE_ARRIVE: ArriveTuning = ArriveTuning {
    max_accel: 0.0, // overwritten per call
    max_speed: 0.0,
    target_radius: 10.0,
    slow_radius: 50.0,
    time_to_target: 0.1,
};

/// Where a moving target will be, looking ahead at most `max_prediction`
/// seconds. A slow pursuer uses the full prediction window; a fast one
/// shrinks it to the time it needs to cover the distance.
pub fn predict_position(actor: &Kinematic, target: &Kinematic, max_prediction: f32) -> Vec2 {
    let distance = (target.position - actor.position).length();
    let speed = actor.velocity.length();

    let prediction = if speed <= distance / max_prediction {
        max_prediction
    } else {
        // speed > 0 is implied by the branch above.
        distance / speed
    };

    target.position + target.velocity * prediction
}

pub fn pursue(
    actor: &Kinematic,
    target: &Kinematic,
    max_prediction: f32,
    max_accel: f32,
    max_speed: f32,
) -> SteeringOutput {
    let predicted = predict_position(actor, target, max_prediction);
    let tuning = ArriveTuning {
        max_accel,
        max_speed,
        ..PURSUE_ARRIVE
    };
    basic::dynamic_arrive(actor, predicted, &tuning)
}

pub fn evade(
    actor: &Kinematic,
    target: &Kinematic,
    max_prediction: f32,
    max_accel: f32,
) -> SteeringOutput {
    let predicted = predict_position(actor, target, max_prediction);
    basic::dynamic_flee(actor, predicted, max_accel)
}

/// Turn toward a position. Zero steering when already on top of it.
pub fn face(actor: &Kinematic, target: Vec2) -> SteeringOutput {
    let direction = target - actor.position;
    if direction.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }
    basic::align(actor, velocity_heading(direction), &FACE_ALIGN)
}

/// Turn toward the direction of travel. No movement, no turn.
pub fn look_where_youre_going(actor: &Kinematic) -> SteeringOutput {
    if actor.velocity.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }
    basic::align(actor, velocity_heading(actor.velocity), &FACE_ALIGN)
}

/// Bounded random walk of the wander angle, projected onto a circle ahead of
/// the actor; face handles the turn, the linear term always pushes forward.
pub fn wander(actor: &Kinematic, state: &mut Wander, rng: &mut fastrand::Rng) -> SteeringOutput {
    state.orientation += random_binomial(rng) * state.rate;

    let circle_center = actor.position + actor.orientation_vector() * state.offset;
    let target_orientation = state.orientation + actor.orientation;
    let wander_target = circle_center + heading_vector(target_orientation) * state.radius;

    let mut result = face(actor, wander_target);
    result.linear = actor.orientation_vector() * state.max_accel;
    result
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slow_pursuer_uses_full_prediction() {
        let actor = Kinematic::at(Vec2::ZERO);
        let mut target = Kinematic::at(Vec2::new(100.0, 0.0));
        target.velocity = Vec2::new(0.0, 50.0);
        // Actor speed 0 <= 100/0.5, so prediction = 0.5s.
        let predicted = predict_position(&actor, &target, 0.5);
        assert!((predicted - Vec2::new(100.0, 25.0)).length() < 1e-4);
    }

    #[test]
    fn fast_pursuer_shrinks_prediction() {
        let mut actor = Kinematic::at(Vec2::ZERO);
        actor.velocity = Vec2::new(400.0, 0.0);
        let mut target = Kinematic::at(Vec2::new(100.0, 0.0));
        target.velocity = Vec2::new(0.0, 40.0);
        // speed 400 > 100/0.5 = 200, so prediction = 100/400 = 0.25s.
        let predicted = predict_position(&actor, &target, 0.5);
        assert!((predicted - Vec2::new(100.0, 10.0)).length() < 1e-4);
    }

    #[test]
    fn face_on_target_is_zero() {
        let actor = Kinematic::at(Vec2::new(5.0, 5.0));
        assert!(face(&actor, Vec2::new(5.0, 5.0)).is_zero());
    }

    #[test]
    fn lwyg_quiet_when_stationary() {
        let actor = Kinematic::at(Vec2::ZERO);
        assert!(look_where_youre_going(&actor).is_zero());
    }

    #[test]
    fn wander_always_pushes_forward() {
        let mut actor = Kinematic::at(Vec2::ZERO);
        actor.orientation = 90.0;
        let mut state = Wander::new(120.0);
        let mut rng = fastrand::Rng::with_seed(42);
        for _ in 0..25 {
            let s = wander(&actor, &mut state, &mut rng);
            let forward = actor.orientation_vector();
            assert!((s.linear.normalize() - forward).length() < 1e-5);
            assert!((s.linear.length() - 120.0).abs() < 1e-3);
        }
    }

    #[test]
    fn wander_angle_stays_bounded_per_step() {
        let actor = Kinematic::at(Vec2::ZERO);
        let mut state = Wander::new(100.0);
        let mut rng = fastrand::Rng::with_seed(3);
        let mut prev = state.orientation;
        for _ in 0..100 {
            wander(&actor, &mut state, &mut rng);
            assert!((state.orientation - prev).abs() <= state.rate + 1e-6);
            prev = state.orientation;
        }
    }
}
