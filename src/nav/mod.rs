//! Navigation mesh: walkable polygon regions with centroid nodes, an edge
//! between every pair of regions sharing a positive-length stretch of
//! boundary, and an adjacency map for locality-aware point lookup. Built
//! once from pre-decoded map regions, immutable afterwards; the build is
//! O(n^2) in polygon pairs, so the result is cached on disk keyed by a
//! fingerprint of the source geometry.

pub mod astar;

pub use astar::a_star_search;

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::{Path, PathBuf};

use glam::Vec2;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::world::{point_in_polygon, polygon_edges};

pub type NodeId = u32;

/// Shared boundary shorter than this is treated as a point touch.
const EDGE_EPS: f32 = 1e-3;

/// One named polygon region out of the map's nav layer.
#[derive(Debug, Clone)]
pub struct Region {
    pub name: String,
    pub navigable: bool,
    pub points: Vec<Vec2>,
}

#[derive(Debug, Error)]
pub enum NavMeshError {
    #[error("no navigable regions in the nav layer")]
    NoNavigableRegions,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NavMesh {
    polygons: BTreeMap<NodeId, Vec<Vec2>>,
    nodes: BTreeMap<NodeId, Vec2>,
    edges: Vec<(NodeId, NodeId)>,
    adjacency: BTreeMap<NodeId, Vec<NodeId>>,
}

impl NavMesh {
    /// Build from source regions. Non-navigable and degenerate (< 3 point)
    /// regions are skipped; zero usable regions is a build failure.
    pub fn build(regions: &[Region]) -> Result<NavMesh, NavMeshError> {
        let mut polygons = BTreeMap::new();
        let mut nodes = BTreeMap::new();

        let mut next_id: NodeId = 0;
        for region in regions {
            if !region.navigable || region.points.len() < 3 {
                continue;
            }
            polygons.insert(next_id, region.points.clone());
            nodes.insert(next_id, polygon_centroid(&region.points));
            next_id += 1;
        }

        if polygons.is_empty() {
            return Err(NavMeshError::NoNavigableRegions);
        }

        let ids: Vec<NodeId> = polygons.keys().copied().collect();
        let mut edges = Vec::new();
        for i in 0..ids.len() {
            for j in (i + 1)..ids.len() {
                if boundaries_share_length(&polygons[&ids[i]], &polygons[&ids[j]]) {
                    edges.push((ids[i], ids[j]));
                }
            }
        }

        let mut adjacency: BTreeMap<NodeId, Vec<NodeId>> =
            ids.iter().map(|&id| (id, Vec::new())).collect();
        for &(a, b) in &edges {
            adjacency.get_mut(&a).unwrap().push(b);
            adjacency.get_mut(&b).unwrap().push(a);
        }

        log::info!(
            "nav mesh built: {} nodes, {} edges",
            nodes.len(),
            edges.len()
        );
        Ok(NavMesh {
            polygons,
            nodes,
            edges,
            adjacency,
        })
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    pub fn node_position(&self, id: NodeId) -> Option<Vec2> {
        self.nodes.get(&id).copied()
    }

    /// Node positions, for search and sorting over candidates.
    pub fn nodes(&self) -> &BTreeMap<NodeId, Vec2> {
        &self.nodes
    }

    pub fn edges(&self) -> &[(NodeId, NodeId)] {
        &self.edges
    }

    pub fn neighbors(&self, id: NodeId) -> &[NodeId] {
        self.adjacency.get(&id).map_or(&[], Vec::as_slice)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    fn polygon_contains(&self, id: NodeId, point: Vec2) -> bool {
        self.polygons
            .get(&id)
            .is_some_and(|poly| point_in_polygon(point, poly))
    }

    /// Which walkable polygon contains the point. A hint node is checked
    /// first, then its graph neighborhood breadth-first, before falling back
    /// to scanning every polygon; the answer matches the exhaustive scan,
    /// the hint only makes the common case cheap.
    pub fn find_node_at_position(&self, point: Vec2, hint: Option<NodeId>) -> Option<NodeId> {
        if let Some(start) = hint {
            if self.polygon_contains(start, point) {
                return Some(start);
            }
            let mut visited: HashSet<NodeId> = HashSet::from([start]);
            let mut queue: VecDeque<NodeId> = self.neighbors(start).iter().copied().collect();
            visited.extend(queue.iter().copied());
            while let Some(id) = queue.pop_front() {
                if self.polygon_contains(id, point) {
                    return Some(id);
                }
                for &n in self.neighbors(id) {
                    if visited.insert(n) {
                        queue.push_back(n);
                    }
                }
            }
        }
        self.polygons
            .keys()
            .copied()
            .find(|&id| self.polygon_contains(id, point))
    }

    /// Every edge endpoint must name an existing node; a cache blob failing
    /// this is discarded and rebuilt.
    pub fn structurally_valid(&self) -> bool {
        self.nodes.len() == self.polygons.len()
            && self
                .edges
                .iter()
                .all(|(a, b)| self.nodes.contains_key(a) && self.nodes.contains_key(b))
            && self.adjacency.keys().all(|id| self.nodes.contains_key(id))
    }
}

/// Load the mesh for these regions from the cache, or build it and write
/// the cache entry. The file name embeds a fingerprint of the region
/// geometry, so an edited map never reuses a stale mesh.
pub fn load_or_build(regions: &[Region], cache_dir: &Path) -> Result<NavMesh, NavMeshError> {
    let file = cache_file(regions, cache_dir);
    if let Some(mesh) = try_load(&file) {
        log::info!("nav mesh loaded from cache {}", file.display());
        return Ok(mesh);
    }
    let mesh = NavMesh::build(regions)?;
    if let Err(err) = persist(&mesh, &file) {
        log::warn!("could not persist nav-mesh cache {}: {err}", file.display());
    }
    Ok(mesh)
}

fn cache_file(regions: &[Region], cache_dir: &Path) -> PathBuf {
    cache_dir.join(format!("navmesh-{:016x}.bin", fingerprint(regions)))
}

fn try_load(path: &Path) -> Option<NavMesh> {
    let bytes = std::fs::read(path).ok()?;
    let mesh: NavMesh = match bincode::deserialize(&bytes) {
        Ok(mesh) => mesh,
        Err(err) => {
            log::warn!("unreadable nav-mesh cache {}: {err}", path.display());
            return None;
        }
    };
    if !mesh.structurally_valid() {
        log::warn!("nav-mesh cache {} is structurally invalid", path.display());
        return None;
    }
    Some(mesh)
}

fn persist(mesh: &NavMesh, path: &Path) -> std::io::Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    let bytes = bincode::serialize(mesh).map_err(std::io::Error::other)?;
    std::fs::write(path, bytes)
}

/// FNV-1a over the region names, flags and point coordinates.
fn fingerprint(regions: &[Region]) -> u64 {
    const OFFSET: u64 = 0xcbf2_9ce4_8422_2325;
    const PRIME: u64 = 0x0000_0100_0000_01b3;
    let mut hash = OFFSET;
    let mut eat = |byte: u8| {
        hash ^= byte as u64;
        hash = hash.wrapping_mul(PRIME);
    };
    for region in regions {
        for b in region.name.as_bytes() {
            eat(*b);
        }
        eat(region.navigable as u8);
        for p in &region.points {
            for b in p.x.to_bits().to_le_bytes() {
                eat(b);
            }
            for b in p.y.to_bits().to_le_bytes() {
                eat(b);
            }
        }
    }
    hash
}

/// Area centroid of a simple polygon, falling back to the vertex average
/// for degenerate (near-zero area) input.
fn polygon_centroid(points: &[Vec2]) -> Vec2 {
    let mut area2 = 0.0f32;
    let mut acc = Vec2::ZERO;
    for (a, b) in polygon_edges(points) {
        let cross = a.perp_dot(b);
        area2 += cross;
        acc += (a + b) * cross;
    }
    if area2.abs() < 1e-6 {
        let sum: Vec2 = points.iter().copied().sum();
        return sum / points.len() as f32;
    }
    acc / (3.0 * area2)
}

/// Do two polygon boundaries intersect in a set of positive length? True
/// for a shared side or an area overlap, false for a single shared vertex.
fn boundaries_share_length(a: &[Vec2], b: &[Vec2]) -> bool {
    for (a1, a2) in polygon_edges(a) {
        for (b1, b2) in polygon_edges(b) {
            if collinear_overlap(a1, a2, b1, b2) > EDGE_EPS {
                return true;
            }
            if segments_cross_properly(a1, a2, b1, b2) {
                return true;
            }
        }
    }
    // One polygon swallowing the other also overlaps with positive length.
    a.iter().any(|p| point_in_polygon(*p, b)) || b.iter().any(|p| point_in_polygon(*p, a))
}

/// Length of the overlap between two collinear segments; 0.0 when they are
/// not collinear or only touch at a point.
fn collinear_overlap(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> f32 {
    let r = a2 - a1;
    let len_sq = r.length_squared();
    if len_sq < f32::EPSILON {
        return 0.0;
    }
    let s = b2 - b1;
    if r.perp_dot(s).abs() > EDGE_EPS * len_sq.sqrt() {
        return 0.0;
    }
    if r.perp_dot(b1 - a1).abs() > EDGE_EPS * len_sq.sqrt() {
        return 0.0;
    }
    let t0 = (b1 - a1).dot(r) / len_sq;
    let t1 = (b2 - a1).dot(r) / len_sq;
    let (lo, hi) = if t0 <= t1 { (t0, t1) } else { (t1, t0) };
    let overlap = hi.min(1.0) - lo.max(0.0);
    (overlap.max(0.0)) * len_sq.sqrt()
}

/// Strict interior crossing, excluding endpoint touches.
fn segments_cross_properly(a1: Vec2, a2: Vec2, b1: Vec2, b2: Vec2) -> bool {
    let r = a2 - a1;
    let s = b2 - b1;
    let denom = r.perp_dot(s);
    if denom.abs() < 1e-9 {
        return false;
    }
    let t = (b1 - a1).perp_dot(s) / denom;
    let u = (b1 - a1).perp_dot(r) / denom;
    const MARGIN: f32 = 1e-4;
    t > MARGIN && t < 1.0 - MARGIN && u > MARGIN && u < 1.0 - MARGIN
}

#[cfg(test)]
mod tests {
    use super::*;

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

    #[test]
    fn shared_side_makes_exactly_one_edge() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 0.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(mesh.edges().len(), 1);
        assert_eq!(mesh.neighbors(0), &[1]);
    }

    #[test]
    fn shared_vertex_makes_no_edge() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 10.0, 10.0)),
        ])
        .unwrap();
        assert!(mesh.edges().is_empty());
    }

    #[test]
    fn disjoint_polygons_make_no_edge() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(30.0, 0.0, 10.0)),
        ])
        .unwrap();
        assert!(mesh.edges().is_empty());
    }

    #[test]
    fn overlapping_interiors_make_an_edge() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(5.0, 5.0, 10.0)),
        ])
        .unwrap();
        assert_eq!(mesh.edges().len(), 1);
    }

    #[test]
    fn zero_regions_is_a_build_error() {
        let err = NavMesh::build(&[Region {
            name: "walls".into(),
            navigable: false,
            points: square(0.0, 0.0, 10.0),
        }])
        .unwrap_err();
        assert!(matches!(err, NavMeshError::NoNavigableRegions));
    }

    #[test]
    fn point_location_matches_with_and_without_hint() {
        let mesh = NavMesh::build(&[
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 0.0, 10.0)),
            region("c", square(20.0, 0.0, 10.0)),
        ])
        .unwrap();
        let p = Vec2::new(25.0, 5.0);
        assert_eq!(mesh.find_node_at_position(p, None), Some(2));
        assert_eq!(mesh.find_node_at_position(p, Some(0)), Some(2));
        assert_eq!(
            mesh.find_node_at_position(Vec2::new(100.0, 100.0), Some(1)),
            None
        );
    }

    #[test]
    fn centroid_of_a_square_is_its_center() {
        let c = polygon_centroid(&square(10.0, 20.0, 10.0));
        assert!((c - Vec2::new(15.0, 25.0)).length() < 1e-4);
    }

    #[test]
    fn cache_round_trips_and_rejects_garbage() {
        let dir = std::env::temp_dir().join(format!("beegrove-nav-{}", std::process::id()));
        let regions = [
            region("a", square(0.0, 0.0, 10.0)),
            region("b", square(10.0, 0.0, 10.0)),
        ];

        let built = load_or_build(&regions, &dir).unwrap();
        let reloaded = load_or_build(&regions, &dir).unwrap();
        assert_eq!(built.node_count(), reloaded.node_count());
        assert_eq!(built.edges(), reloaded.edges());

        // Corrupt the cache entry: the loader must fall back to a rebuild.
        let file = cache_file(&regions, &dir);
        std::fs::write(&file, b"not a mesh").unwrap();
        let rebuilt = load_or_build(&regions, &dir).unwrap();
        assert_eq!(rebuilt.node_count(), 2);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn edited_geometry_changes_the_cache_key() {
        let a = [region("a", square(0.0, 0.0, 10.0))];
        let b = [region("a", square(0.0, 0.0, 11.0))];
        assert_ne!(fingerprint(&a), fingerprint(&b));
    }
}
