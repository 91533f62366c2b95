//! Parametric paths for the follow-path behavior: waypoint polylines built
//! from A* results, and generated patrol loops (rectangular or circular
//! rings) for actors that walk a beat.

use glam::Vec2;

/// A continuous position along a polyline: which segment, and how far
/// through it (0..=1). Monotonic along the point sequence; not globally
/// unique if the path crosses itself.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PathParam {
    pub segment: usize,
    pub t: f32,
}

/// A finite, ordered waypoint polyline with projection and arc-length
/// queries. Named for its usual source: node centroids out of an A* search.
#[derive(Debug, Clone)]
pub struct AStarPath {
    points: Vec<Vec2>,
    /// Arc length from the start to each point. Same length as `points`.
    cumulative: Vec<f32>,
}

impl AStarPath {
    pub fn new(points: Vec<Vec2>) -> Self {
        let mut cumulative = Vec::with_capacity(points.len());
        let mut total = 0.0;
        for (i, p) in points.iter().enumerate() {
            if i > 0 {
                total += p.distance(points[i - 1]);
            }
            cumulative.push(total);
        }
        Self { points, cumulative }
    }

    pub fn points(&self) -> &[Vec2] {
        &self.points
    }

    pub fn is_empty(&self) -> bool {
        self.points.len() < 2
    }

    pub fn total_length(&self) -> f32 {
        self.cumulative.last().copied().unwrap_or(0.0)
    }

    /// Final waypoint, if the path has any points at all.
    pub fn end(&self) -> Option<Vec2> {
        self.points.last().copied()
    }

    fn segment_length(&self, segment: usize) -> f32 {
        self.cumulative[segment + 1] - self.cumulative[segment]
    }

    /// Nearest point on the path, as a parameter. None for a path with no
    /// segments; callers treat that as "no steering this tick".
    pub fn param(&self, position: Vec2) -> Option<PathParam> {
        if self.is_empty() {
            return None;
        }
        let mut best: Option<(f32, PathParam)> = None;
        for segment in 0..self.points.len() - 1 {
            let a = self.points[segment];
            let b = self.points[segment + 1];
            let ab = b - a;
            let len_sq = ab.length_squared();
            let t = if len_sq == 0.0 {
                0.0
            } else {
                ((position - a).dot(ab) / len_sq).clamp(0.0, 1.0)
            };
            let closest = a + ab * t;
            let dist_sq = position.distance_squared(closest);
            if best.map_or(true, |(d, _)| dist_sq < d) {
                best = Some((dist_sq, PathParam { segment, t }));
            }
        }
        best.map(|(_, p)| p)
    }

    /// Distance along the path to a parameter.
    pub fn arc_length(&self, param: PathParam) -> f32 {
        self.cumulative[param.segment] + self.segment_length(param.segment) * param.t
    }

    /// Parameter at a distance along the path, clamped to its extent.
    pub fn param_at_arc(&self, s: f32) -> PathParam {
        if self.is_empty() {
            return PathParam { segment: 0, t: 0.0 };
        }
        let last_segment = self.points.len() - 2;
        if s <= 0.0 {
            return PathParam { segment: 0, t: 0.0 };
        }
        for segment in 0..=last_segment {
            let seg_len = self.segment_length(segment);
            if s <= self.cumulative[segment] + seg_len || segment == last_segment {
                let t = if seg_len == 0.0 {
                    0.0
                } else {
                    ((s - self.cumulative[segment]) / seg_len).clamp(0.0, 1.0)
                };
                return PathParam { segment, t };
            }
        }
        PathParam {
            segment: last_segment,
            t: 1.0,
        }
    }

    /// Advance a parameter by an arc-length offset (pixels along the path).
    pub fn advance(&self, param: PathParam, offset: f32) -> PathParam {
        self.param_at_arc(self.arc_length(param) + offset)
    }

    pub fn position_at(&self, param: PathParam) -> Vec2 {
        let a = self.points[param.segment];
        let b = self.points[param.segment + 1];
        a + (b - a) * param.t
    }

    /// Unit direction of the parameter's segment; zero for a degenerate one.
    pub fn direction_at(&self, param: PathParam) -> Vec2 {
        let a = self.points[param.segment];
        let b = self.points[param.segment + 1];
        (b - a).normalize_or_zero()
    }
}

/// A closed patrol loop around an origin point, densified into waypoints.
#[derive(Debug, Clone)]
pub struct Path {
    pub origin: Vec2,
    pub shape: PathShape,
}

#[derive(Debug, Clone, Copy)]
pub enum PathShape {
    Rectangular { width: f32, height: f32 },
    Circular { radius: f32 },
}

impl Path {
    pub fn rectangular(origin: Vec2, width: f32, height: f32) -> Self {
        Self {
            origin,
            shape: PathShape::Rectangular { width, height },
        }
    }

    pub fn circular(origin: Vec2, radius: f32) -> Self {
        Self {
            origin,
            shape: PathShape::Circular { radius },
        }
    }

    /// Densify the loop into `num_points` waypoints plus a closing point
    /// back at the origin.
    pub fn waypoints(&self, num_points: usize) -> AStarPath {
        let mut points = Vec::with_capacity(num_points + 1);
        match self.shape {
            PathShape::Rectangular { width, height } => {
                let perimeter = 2.0 * (width + height);
                for i in 0..num_points {
                    let s = perimeter * i as f32 / num_points as f32;
                    points.push(self.origin + rect_perimeter_point(width, height, s));
                }
            }
            PathShape::Circular { radius } => {
                for i in 0..num_points {
                    let angle = std::f32::consts::TAU * i as f32 / num_points as f32;
                    points.push(self.origin + Vec2::new(angle.cos(), angle.sin()) * radius);
                }
            }
        }
        points.push(self.origin);
        AStarPath::new(points)
    }
}

/// Point at arc distance `s` around a rectangle whose top-left corner is the
/// local origin, walking top, right, bottom, left.
fn rect_perimeter_point(width: f32, height: f32, s: f32) -> Vec2 {
    if s < width {
        Vec2::new(s, 0.0)
    } else if s < width + height {
        Vec2::new(width, s - width)
    } else if s < 2.0 * width + height {
        Vec2::new(width - (s - width - height), height)
    } else {
        Vec2::new(0.0, height - (s - 2.0 * width - height))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn l_path() -> AStarPath {
        AStarPath::new(vec![
            Vec2::new(0.0, 0.0),
            Vec2::new(100.0, 0.0),
            Vec2::new(100.0, 100.0),
        ])
    }

    #[test]
    fn projection_picks_nearest_segment() {
        let path = l_path();
        let p = path.param(Vec2::new(50.0, 10.0)).unwrap();
        assert_eq!(p.segment, 0);
        assert!((p.t - 0.5).abs() < 1e-4);

        let p = path.param(Vec2::new(110.0, 60.0)).unwrap();
        assert_eq!(p.segment, 1);
        assert!((p.t - 0.6).abs() < 1e-4);
    }

    #[test]
    fn param_round_trips_through_arc_length() {
        let path = l_path();
        let p = PathParam { segment: 1, t: 0.25 };
        let s = path.arc_length(p);
        assert!((s - 125.0).abs() < 1e-4);
        let back = path.param_at_arc(s);
        assert_eq!(back.segment, 1);
        assert!((back.t - 0.25).abs() < 1e-4);
    }

    #[test]
    fn advance_crosses_segment_boundaries_and_clamps() {
        let path = l_path();
        let start = path.param(Vec2::new(90.0, -5.0)).unwrap();
        let led = path.advance(start, 30.0);
        assert_eq!(led.segment, 1);
        let pos = path.position_at(led);
        assert!((pos - Vec2::new(100.0, 20.0)).length() < 1e-3);

        // Advancing past the end pins to the final point.
        let end = path.advance(start, 10_000.0);
        assert_eq!(path.position_at(end), Vec2::new(100.0, 100.0));
    }

    #[test]
    fn single_point_path_has_no_param() {
        let path = AStarPath::new(vec![Vec2::new(5.0, 5.0)]);
        assert!(path.param(Vec2::ZERO).is_none());
        assert_eq!(path.end(), Some(Vec2::new(5.0, 5.0)));
    }

    #[test]
    fn patrol_loops_close_on_their_origin() {
        let origin = Vec2::new(50.0, 60.0);
        let rect = Path::rectangular(origin, 300.0, 200.0).waypoints(100);
        assert_eq!(rect.points().first().copied(), Some(origin));
        assert_eq!(rect.points().last().copied(), Some(origin));

        let circle = Path::circular(origin, 100.0).waypoints(64);
        assert_eq!(circle.points().len(), 65);
        for p in circle.points().iter().take(64) {
            assert!(((*p - origin).length() - 100.0).abs() < 1e-3);
        }
    }

    #[test]
    fn direction_follows_the_segment() {
        let path = l_path();
        let d = path.direction_at(PathParam { segment: 1, t: 0.5 });
        assert!((d - Vec2::new(0.0, 1.0)).length() < 1e-5);
    }
}
