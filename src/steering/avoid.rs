//! Hazard avoidance: a lookahead ray against static obstacles, and
//! time-to-closest-approach prediction against other moving characters.

use glam::Vec2;

use crate::kinematic::{Kinematic, SteeringOutput};
use crate::steering::basic::dynamic_seek;
use crate::world::{KinSnapshot, Obstacle};

/// Cast a ray of `lookahead` length along the current velocity; if it hits
/// an obstacle, seek a point pushed `avoid_distance` out of the hit along
/// the obstacle's dominant-axis outward normal.
pub fn obstacle_avoidance(
    actor: &Kinematic,
    obstacles: &[Obstacle],
    lookahead: f32,
    avoid_distance: f32,
    max_accel: f32,
) -> SteeringOutput {
    if actor.velocity.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }

    let ray_start = actor.position;
    let ray_end = ray_start + actor.velocity.normalize() * lookahead;

    let mut closest: Option<(f32, Vec2, Vec2)> = None; // (dist_sq, hit, normal)
    for obstacle in obstacles {
        let Some(hit) = obstacle.ray_hit(ray_start, ray_end) else {
            continue;
        };
        let dist_sq = (hit - ray_start).length_squared();
        if closest.map_or(true, |(best, _, _)| dist_sq < best) {
            closest = Some((dist_sq, hit, outward_normal(obstacle, hit)));
        }
    }

    let Some((_, hit, normal)) = closest else {
        return SteeringOutput::ZERO;
    };

    let target = hit + normal * avoid_distance;
    dynamic_seek(actor, target, max_accel)
}

/// Outward normal at a hit point: the dominant axis of the hit's offset
/// from the obstacle's box center.
fn outward_normal(obstacle: &Obstacle, hit: Vec2) -> Vec2 {
    let bbox = obstacle.bounding_box();
    let half = bbox.half().max(Vec2::splat(f32::EPSILON));
    let rel = hit - bbox.center();
    let dx = rel.x.abs() / half.x;
    let dy = rel.y.abs() / half.y;
    if dx > dy {
        Vec2::new(rel.x.signum(), 0.0)
    } else {
        Vec2::new(0.0, rel.y.signum())
    }
}

/// Steer away from the other character we will pass closest to soonest.
/// Characters on parallel courses (no relative motion) and passes wider than
/// `2 * radius` are ignored; an already-overlapping or brushing pair steers
/// off the current relative position instead of the predicted one.
pub fn collision_avoidance(
    actor: &Kinematic,
    self_id: u32,
    others: &[KinSnapshot],
    radius: f32,
    max_accel: f32,
) -> SteeringOutput {
    let mut shortest_time = f32::INFINITY;
    let mut first: Option<(KinSnapshot, f32, f32)> = None; // (snapshot, min_separation, distance)

    for other in others {
        if other.id == self_id {
            continue;
        }

        let relative_position = other.position - actor.position;
        let relative_velocity = other.velocity - actor.velocity;
        let relative_speed_sq = relative_velocity.length_squared();
        if relative_speed_sq == 0.0 {
            continue;
        }

        let time_to_closest = -relative_position.dot(relative_velocity) / relative_speed_sq;
        let distance = relative_position.length();
        let min_separation = distance - relative_speed_sq.sqrt() * time_to_closest;
        if min_separation > 2.0 * radius {
            continue;
        }

        if time_to_closest > 0.0 && time_to_closest < shortest_time {
            shortest_time = time_to_closest;
            first = Some((*other, min_separation, distance));
        }
    }

    let Some((other, min_separation, distance)) = first else {
        return SteeringOutput::ZERO;
    };

    let relative_position = if min_separation <= 0.0 || distance < 2.0 * radius {
        other.position - actor.position
    } else {
        (other.position - actor.position) + (other.velocity - actor.velocity) * shortest_time
    };

    if relative_position.length_squared() == 0.0 {
        return SteeringOutput::ZERO;
    }

    SteeringOutput {
        linear: -relative_position.normalize() * max_accel,
        angular: 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::Aabb;

    fn moving(position: Vec2, velocity: Vec2) -> Kinematic {
        let mut k = Kinematic::at(position);
        k.velocity = velocity;
        k
    }

    #[test]
    fn no_hit_means_no_steering() {
        let actor = moving(Vec2::new(0.0, 100.0), Vec2::new(60.0, 0.0));
        let wall = Obstacle::Rect(Aabb {
            min: Vec2::new(200.0, 0.0),
            max: Vec2::new(220.0, 50.0),
        });
        let s = obstacle_avoidance(&actor, &[wall], 80.0, 50.0, 100.0);
        assert!(s.is_zero());
    }

    #[test]
    fn ray_hit_steers_off_the_near_face() {
        // Flying right into a wall: the hit is on the wall's left face, so
        // the avoidance target sits left of the hit and the seek has a
        // negative-x component.
        let actor = moving(Vec2::new(100.0, 100.0), Vec2::new(80.0, 0.0));
        let wall = Obstacle::Rect(Aabb {
            min: Vec2::new(150.0, 50.0),
            max: Vec2::new(170.0, 150.0),
        });
        let s = obstacle_avoidance(&actor, &[wall], 100.0, 40.0, 100.0);
        assert!(!s.is_zero());
        assert!(s.linear.x < 0.0);
    }

    #[test]
    fn nearest_of_two_obstacles_wins() {
        let actor = moving(Vec2::new(0.0, 100.0), Vec2::new(100.0, 0.0));
        let near = Obstacle::Rect(Aabb {
            min: Vec2::new(40.0, 80.0),
            max: Vec2::new(60.0, 120.0),
        });
        let far = Obstacle::Rect(Aabb {
            min: Vec2::new(80.0, 80.0),
            max: Vec2::new(100.0, 120.0),
        });
        let s_both = obstacle_avoidance(&actor, &[far.clone(), near.clone()], 200.0, 30.0, 100.0);
        let s_near = obstacle_avoidance(&actor, &[near], 200.0, 30.0, 100.0);
        assert_eq!(s_both, s_near);
        let _ = far;
    }

    #[test]
    fn head_on_approach_steers_away() {
        let actor = moving(Vec2::ZERO, Vec2::new(50.0, 0.0));
        let others = [KinSnapshot {
            id: 2,
            position: Vec2::new(100.0, 0.0),
            velocity: Vec2::new(-50.0, 0.0),
        }];
        let s = collision_avoidance(&actor, 1, &others, 20.0, 80.0);
        assert!(!s.is_zero());
        // The threat is to the right; steer left.
        assert!(s.linear.x < 0.0);
    }

    #[test]
    fn wide_pass_is_ignored() {
        let actor = moving(Vec2::ZERO, Vec2::new(50.0, 0.0));
        let others = [KinSnapshot {
            id: 2,
            position: Vec2::new(100.0, 500.0),
            velocity: Vec2::new(-50.0, 0.0),
        }];
        let s = collision_avoidance(&actor, 1, &others, 20.0, 80.0);
        assert!(s.is_zero());
    }

    #[test]
    fn receding_character_is_ignored() {
        let actor = moving(Vec2::ZERO, Vec2::new(-50.0, 0.0));
        let others = [KinSnapshot {
            id: 2,
            position: Vec2::new(100.0, 0.0),
            velocity: Vec2::new(50.0, 0.0),
        }];
        let s = collision_avoidance(&actor, 1, &others, 20.0, 80.0);
        assert!(s.is_zero());
    }

    #[test]
    fn self_snapshot_is_skipped() {
        let actor = moving(Vec2::ZERO, Vec2::new(50.0, 0.0));
        let others = [KinSnapshot {
            id: 1,
            position: Vec2::new(10.0, 0.0),
            velocity: Vec2::new(-50.0, 0.0),
        }];
        let s = collision_avoidance(&actor, 1, &others, 20.0, 80.0);
        assert!(s.is_zero());
    }
}
