use std::collections::HashSet;

use glam::Vec2;

use crate::actor::PlayerBody;
use crate::nav::NavMesh;

/// Axis-aligned rectangle in world pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center(center: Vec2, half: Vec2) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn half(&self) -> Vec2 {
        (self.max - self.min) * 0.5
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min.x && p.x <= self.max.x && p.y >= self.min.y && p.y <= self.max.y
    }

    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    /// Clip a directed segment against the box (slab method). Returns the
    /// entry point, or None when the segment misses entirely.
    pub fn clip_segment(&self, a: Vec2, b: Vec2) -> Option<Vec2> {
        let d = b - a;
        let mut t_min = 0.0f32;
        let mut t_max = 1.0f32;

        for axis in 0..2 {
            let (origin, dir, lo, hi) = if axis == 0 {
                (a.x, d.x, self.min.x, self.max.x)
            } else {
                (a.y, d.y, self.min.y, self.max.y)
            };
            if dir.abs() < f32::EPSILON {
                if origin < lo || origin > hi {
                    return None;
                }
            } else {
                let mut t0 = (lo - origin) / dir;
                let mut t1 = (hi - origin) / dir;
                if t0 > t1 {
                    std::mem::swap(&mut t0, &mut t1);
                }
                t_min = t_min.max(t0);
                t_max = t_max.min(t1);
                if t_min > t_max {
                    return None;
                }
            }
        }
        Some(a + d * t_min)
    }
}

/// Static blocking geometry, consumed read-only by collision resolution and
/// obstacle avoidance. Arrives pre-decoded from the map layer.
#[derive(Debug, Clone)]
pub enum Obstacle {
    Rect(Aabb),
    /// Closed polygon outline; the last point connects back to the first.
    Polygon(Vec<Vec2>),
}

impl Obstacle {
    /// Bounding box, used for the dominant-axis avoidance normal.
    pub fn bounding_box(&self) -> Aabb {
        match self {
            Obstacle::Rect(r) => *r,
            Obstacle::Polygon(points) => {
                let mut min = Vec2::splat(f32::INFINITY);
                let mut max = Vec2::splat(f32::NEG_INFINITY);
                for p in points {
                    min = min.min(*p);
                    max = max.max(*p);
                }
                Aabb { min, max }
            }
        }
    }

    /// First intersection of the directed ray segment a->b with this
    /// obstacle, if any.
    pub fn ray_hit(&self, a: Vec2, b: Vec2) -> Option<Vec2> {
        match self {
            Obstacle::Rect(r) => r.clip_segment(a, b),
            Obstacle::Polygon(points) => {
                let mut best: Option<(f32, Vec2)> = None;
                for (p, q) in polygon_edges(points) {
                    if let Some(hit) = segment_intersection(a, b, p, q) {
                        let d = (hit - a).length_squared();
                        if best.map_or(true, |(bd, _)| d < bd) {
                            best = Some((d, hit));
                        }
                    }
                }
                best.map(|(_, hit)| hit)
            }
        }
    }

    /// Does the actor rectangle touch this obstacle.
    pub fn intersects_aabb(&self, rect: &Aabb) -> bool {
        match self {
            Obstacle::Rect(r) => r.overlaps(rect),
            Obstacle::Polygon(points) => {
                if point_in_polygon(rect.center(), points) {
                    return true;
                }
                polygon_edges(points).any(|(p, q)| rect.clip_segment(p, q).is_some())
            }
        }
    }
}

/// Iterate a closed polygon's edges, wrapping the last point to the first.
pub fn polygon_edges(points: &[Vec2]) -> impl Iterator<Item = (Vec2, Vec2)> + '_ {
    let n = points.len();
    (0..n).map(move |i| (points[i], points[(i + 1) % n]))
}

/// Even-odd ray-casting containment test.
pub fn point_in_polygon(p: Vec2, points: &[Vec2]) -> bool {
    let mut inside = false;
    for (a, b) in polygon_edges(points) {
        if (a.y > p.y) != (b.y > p.y) {
            let x_cross = a.x + (p.y - a.y) / (b.y - a.y) * (b.x - a.x);
            if p.x < x_cross {
                inside = !inside;
            }
        }
    }
    inside
}

/// Intersection point of two segments, or None when they are parallel or
/// miss each other.
pub fn segment_intersection(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> Option<Vec2> {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-9 {
        return None;
    }
    let t = (b1 - a1).perp_dot(s) / denom;
    let u = (b1 - a1).perp_dot(r) / denom;
    if (0.0..=1.0).contains(&t) && (0.0..=1.0).contains(&u) {
        Some(a1 + r * t)
    } else {
        None
    }
}

/// A honey jar somewhere on the map. Jars sitting on a web are already
/// protected; collected jars are gone but keep their slot so ids stay
/// stable.
#[derive(Debug, Clone)]
pub struct Jar {
    pub position: Vec2,
    pub on_web: bool,
    pub collected: bool,
}

/// A web site where a hunter can stash a stolen jar.
#[derive(Debug, Clone)]
pub struct Web {
    pub position: Vec2,
    pub has_pot: bool,
}

/// Position + velocity snapshot of one character, taken at the start of the
/// tick so every actor steers against the same consistent frame.
#[derive(Debug, Clone, Copy)]
pub struct KinSnapshot {
    pub id: u32,
    pub position: Vec2,
    pub velocity: Vec2,
}

/// Shared game state the AI reads and writes: the player, the map's static
/// geometry, collectibles, and the claim bookkeeping HSM actions use to
/// coordinate. Built once per scenario; the nav mesh inside is immutable
/// after build.
pub struct WorldState {
    pub player: PlayerBody,
    /// Map size in pixels.
    pub bounds: Vec2,
    pub obstacles: Vec<Obstacle>,
    pub jars: Vec<Jar>,
    /// Jar ids currently claimed by some NPC.
    pub claimed_jars: HashSet<usize>,
    pub webs: Vec<Web>,
    pub eggs: Vec<Vec2>,
    /// Positions alerts were raised at, newest last.
    pub alerts: Vec<Vec2>,
    pub nav: Option<NavMesh>,
}

impl WorldState {
    pub fn new(bounds: Vec2, player: PlayerBody) -> Self {
        Self {
            player,
            bounds,
            obstacles: Vec::new(),
            jars: Vec::new(),
            claimed_jars: HashSet::new(),
            webs: Vec::new(),
            eggs: Vec::new(),
            alerts: Vec::new(),
            nav: None,
        }
    }

    /// Nearest jar that is neither webbed, collected, nor claimed.
    pub fn nearest_free_jar(&self, from: Vec2) -> Option<usize> {
        self.jars
            .iter()
            .enumerate()
            .filter(|(id, jar)| {
                !jar.on_web && !jar.collected && !self.claimed_jars.contains(id)
            })
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(from)
                    .total_cmp(&b.position.distance_squared(from))
            })
            .map(|(id, _)| id)
    }

    /// Nearest web with room for a stashed jar.
    pub fn nearest_free_web(&self, from: Vec2) -> Option<usize> {
        self.webs
            .iter()
            .enumerate()
            .filter(|(_, w)| !w.has_pot)
            .min_by(|(_, a), (_, b)| {
                a.position
                    .distance_squared(from)
                    .total_cmp(&b.position.distance_squared(from))
            })
            .map(|(id, _)| id)
    }

    pub fn push_alert(&mut self, position: Vec2) {
        log::info!("alert raised at ({:.0}, {:.0})", position.x, position.y);
        self.alerts.push(position);
    }
}
