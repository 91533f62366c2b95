use glam::Vec2;

use crate::world::{Aabb, Obstacle};

/// Linear + angular acceleration request produced by a dynamic steering
/// behavior. Built fresh every tick, consumed by the integrator, discarded.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SteeringOutput {
    pub linear: Vec2,
    pub angular: f32,
}

impl SteeringOutput {
    pub const ZERO: SteeringOutput = SteeringOutput {
        linear: Vec2::ZERO,
        angular: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.linear.length_squared() == 0.0 && self.angular == 0.0
    }
}

/// Desired velocity + rotation produced by the kinematic behavior family.
/// Applied directly to the actor's velocity, not integrated as acceleration.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KinematicSteeringOutput {
    pub velocity: Vec2,
    pub rotation: f32,
}

impl KinematicSteeringOutput {
    pub const ZERO: KinematicSteeringOutput = KinematicSteeringOutput {
        velocity: Vec2::ZERO,
        rotation: 0.0,
    };

    pub fn is_zero(&self) -> bool {
        self.velocity.length_squared() == 0.0 && self.rotation == 0.0
    }
}

/// Motion state of one actor. Orientation is in degrees; the heading
/// convention is `atan2(-vx, -vy)` so orientation 0 points up-screen.
#[derive(Debug, Clone, Copy)]
pub struct Kinematic {
    pub position: Vec2,
    pub velocity: Vec2,
    /// Facing angle in degrees.
    pub orientation: f32,
    /// Angular velocity in degrees/second.
    pub rotation: f32,
}

/// Heading angle (degrees) of a velocity vector under the sprite convention.
pub fn velocity_heading(velocity: Vec2) -> f32 {
    (-velocity.x).atan2(-velocity.y).to_degrees()
}

/// Unit vector for an orientation angle in degrees. Inverse of
/// `velocity_heading`.
pub fn heading_vector(orientation: f32) -> Vec2 {
    let rad = orientation.to_radians();
    Vec2::new(-rad.sin(), -rad.cos())
}

/// Wrap an angle difference into [-180, 180] degrees.
pub fn wrap_degrees(angle: f32) -> f32 {
    (angle + 180.0).rem_euclid(360.0) - 180.0
}

/// Clamp a vector's magnitude without changing its direction.
pub fn clamp_length(v: Vec2, max_len: f32) -> Vec2 {
    let len_sq = v.length_squared();
    if len_sq > max_len * max_len {
        v / len_sq.sqrt() * max_len
    } else {
        v
    }
}

impl Kinematic {
    /// Stationary kinematic at a position, facing down-screen like a
    /// freshly spawned sprite.
    pub fn at(position: Vec2) -> Self {
        Self {
            position,
            velocity: Vec2::ZERO,
            orientation: 270.0,
            rotation: 0.0,
        }
    }

    /// Unit vector the actor is facing.
    pub fn orientation_vector(&self) -> Vec2 {
        heading_vector(self.orientation)
    }

    /// Orientation derived from the current velocity, or the existing
    /// orientation when the actor is not moving.
    pub fn derived_orientation(&self) -> f32 {
        if self.velocity.length_squared() > 0.0 {
            velocity_heading(self.velocity)
        } else {
            self.orientation
        }
    }

    /// Axis-aligned bounds of the actor given its half extents.
    pub fn bounds(&self, half_extents: Vec2) -> Aabb {
        Aabb {
            min: self.position - half_extents,
            max: self.position + half_extents,
        }
    }

    /// Plain integration step: advance position by velocity, velocity by the
    /// steering's linear term, rotation by its angular term. Orientation
    /// integrates rotation when `rotation_driven`, otherwise it snaps to the
    /// velocity heading. Speed is clamped to `max_speed` afterwards.
    pub fn update(
        &mut self,
        steering: SteeringOutput,
        dt: f32,
        max_speed: f32,
        rotation_driven: bool,
    ) {
        self.position += self.velocity * dt;
        if rotation_driven {
            self.orientation += self.rotation * dt;
        } else {
            self.orientation = self.derived_orientation();
        }
        self.velocity += steering.linear * dt;
        self.rotation += steering.angular * dt;
        self.velocity = clamp_length(self.velocity, max_speed);
    }

    /// Collision-aware integration. Movement is applied one axis at a time;
    /// an axis that lands the actor's bounds inside an obstacle is rolled
    /// back with that axis's velocity zeroed. A final whole-position check
    /// reverts to the pre-step position if any overlap remains, which stops
    /// actors jittering along obstacle corners.
    pub fn update_with_collisions(
        &mut self,
        steering: SteeringOutput,
        dt: f32,
        max_speed: f32,
        half_extents: Vec2,
        obstacles: &[Obstacle],
        rotation_driven: bool,
    ) {
        let start = self.position;

        // X axis first.
        self.position.x += self.velocity.x * dt;
        if overlaps_any(self.bounds(half_extents), obstacles) {
            self.position.x = start.x;
            self.velocity.x = 0.0;
        }

        // Then Y.
        self.position.y += self.velocity.y * dt;
        if overlaps_any(self.bounds(half_extents), obstacles) {
            self.position.y = start.y;
            self.velocity.y = 0.0;
        }

        // Residual overlap after both axis moves: full revert.
        if overlaps_any(self.bounds(half_extents), obstacles) {
            self.position = start;
            self.velocity = Vec2::ZERO;
        }

        if rotation_driven {
            self.orientation += self.rotation * dt;
        } else {
            self.orientation = self.derived_orientation();
        }
        self.velocity += steering.linear * dt;
        self.rotation += steering.angular * dt;
        self.velocity = clamp_length(self.velocity, max_speed);
    }

    /// Keep the actor inside the world rectangle, inset by its margin.
    pub fn clamp_to_bounds(&mut self, bounds: Vec2, margin: Vec2) {
        self.position.x = self.position.x.clamp(margin.x, bounds.x - margin.x);
        self.position.y = self.position.y.clamp(margin.y, bounds.y - margin.y);
    }
}

fn overlaps_any(rect: Aabb, obstacles: &[Obstacle]) -> bool {
    obstacles.iter().any(|o| o.intersects_aabb(&rect))
}
