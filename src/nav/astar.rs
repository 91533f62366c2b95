//! A* over the nav-mesh adjacency graph with a Euclidean centroid heuristic.
//! The heuristic never overestimates the centroid-to-centroid traversal cost,
//! so the first time the goal is popped the path is optimal.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashMap};

use super::{NavMesh, NodeId};

/// Open-set entry ordered so the heap pops the lowest f-score first, breaking
/// ties on the lowest node id. The tie-break keeps searches deterministic
/// across runs of the same mesh.
#[derive(Debug, Clone, Copy)]
struct OpenEntry {
    f: f32,
    id: NodeId,
}

impl PartialEq for OpenEntry {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for OpenEntry {}

impl PartialOrd for OpenEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for OpenEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap, so reverse both keys.
        other
            .f
            .total_cmp(&self.f)
            .then_with(|| other.id.cmp(&self.id))
    }
}

/// Shortest node-id path from start to goal, both inclusive, or None when the
/// goal is unreachable or either id is not in the mesh. Absence is a normal
/// steering outcome for the caller, never a fault.
pub fn a_star_search(start: NodeId, goal: NodeId, mesh: &NavMesh) -> Option<Vec<NodeId>> {
    let start_pos = mesh.node_position(start)?;
    let goal_pos = mesh.node_position(goal)?;

    let mut open = BinaryHeap::new();
    open.push(OpenEntry {
        f: start_pos.distance(goal_pos),
        id: start,
    });

    let mut came_from: HashMap<NodeId, NodeId> = HashMap::new();
    let mut g_score: HashMap<NodeId, f32> = HashMap::from([(start, 0.0)]);

    while let Some(OpenEntry { id: current, .. }) = open.pop() {
        if current == goal {
            return Some(reconstruct(&came_from, start, goal));
        }

        let current_g = g_score[&current];
        let current_pos = mesh.node_position(current)?;
        for &neighbor in mesh.neighbors(current) {
            let Some(neighbor_pos) = mesh.node_position(neighbor) else {
                continue;
            };
            let tentative = current_g + current_pos.distance(neighbor_pos);
            if tentative < g_score.get(&neighbor).copied().unwrap_or(f32::INFINITY) {
                came_from.insert(neighbor, current);
                g_score.insert(neighbor, tentative);
                open.push(OpenEntry {
                    f: tentative + neighbor_pos.distance(goal_pos),
                    id: neighbor,
                });
            }
        }
    }

    None
}

fn reconstruct(came_from: &HashMap<NodeId, NodeId>, start: NodeId, goal: NodeId) -> Vec<NodeId> {
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = came_from[&current];
        path.push(current);
    }
    path.reverse();
    path
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nav::Region;
    use glam::Vec2;

    fn square(x: f32, y: f32, size: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x, y),
            Vec2::new(x + size, y),
            Vec2::new(x + size, y + size),
            Vec2::new(x, y + size),
        ]
    }

    fn region(name: &str, points: Vec<Vec2>) -> Region {
        Region {
            name: name.into(),
            navigable: true,
            points,
        }
    }

    fn rect(x0: f32, y0: f32, x1: f32, y1: f32) -> Vec<Vec2> {
        vec![
            Vec2::new(x0, y0),
            Vec2::new(x1, y0),
            Vec2::new(x1, y1),
            Vec2::new(x0, y1),
        ]
    }

    /// Square annulus of four rectangles: north(0), east(1), south(2),
    /// west(3), edge-connected in a cycle n-e-s-w-n.
    fn ring_mesh() -> NavMesh {
        NavMesh::build(&[
            region("n", rect(0.0, 0.0, 30.0, 10.0)),
            region("e", rect(20.0, 10.0, 30.0, 30.0)),
            region("s", rect(0.0, 30.0, 30.0, 40.0)),
            region("w", rect(0.0, 10.0, 10.0, 30.0)),
        ])
        .unwrap()
    }

    #[test]
    fn straight_corridor_path() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 0.0, 10.0)),
            region("c", square(20.0, 0.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(a_star_search(0, 2, &mesh), Some(vec![0, 1, 2]));
    }

    #[test]
    fn never_takes_a_longer_path_around_a_ring() {
        let mesh = ring_mesh();
        // Opposite sides of the ring: two hops through east or west, both
        // cost-equal, and never the long way around.
        let path = a_star_search(0, 2, &mesh).unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], 0);
        assert_eq!(path[2], 2);
        assert!(path[1] == 1 || path[1] == 3);
    }

    #[test]
    fn unreachable_goal_returns_none() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 0.0, 10.0)),
            region("island", square(50.0, 50.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(a_star_search(0, 2, &mesh), None);
    }

    #[test]
    fn missing_node_returns_none() {
        let mesh = ring_mesh();
        assert_eq!(a_star_search(0, 99, &mesh), None);
    }

    #[test]
    fn start_equals_goal_is_a_single_node_path() {
        let mesh = ring_mesh();
        assert_eq!(a_star_search(1, 1, &mesh), Some(vec![1]));
    }
}
