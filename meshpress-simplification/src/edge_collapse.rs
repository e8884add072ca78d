//! Edge collapse simplification
//!
//! Implements iterative edge collapse mesh simplification using a half-edge
//! data structure for efficient topology operations and quadric error metrics
//! (QEM) for error-driven edge prioritization.
//!
//! Collapses run in order of increasing quadric error. Equal costs are
//! resolved by the edge's `(min vertex id, max vertex id)` pair, so the same
//! input always collapses the same edges in the same order.

use crate::quadric_error::{optimal_placement, triangle_quadric, Quadric};
use crate::{decimation_target, MeshSimplifier};
use meshpress_core::{Error, Point3f, Result, TriangleMesh};
use priority_queue::PriorityQueue;
use std::cmp::Ordering;
use std::collections::{HashMap, VecDeque};

const INVALID: usize = usize::MAX;

/// `sin²` of the angle at the moved vertex below which a triangle counts as degenerate
const DEGENERATE_SIN2: f64 = 1e-10;

// ============================================================
// Half-Edge Data Structure
// ============================================================

#[derive(Debug, Clone)]
struct HalfEdge {
    target: usize,
    twin: usize,
    next: usize,
    prev: usize,
    face: usize,
}

/// Half-edge mesh for topology-aware edge collapse operations.
struct HalfEdgeMesh {
    half_edges: Vec<HalfEdge>,
    /// One outgoing half-edge per vertex (INVALID if removed)
    vertex_edge: Vec<usize>,
    /// One half-edge per face (INVALID if removed)
    face_edge: Vec<usize>,
    active_face_count: usize,
    positions: Vec<Point3f>,
    quadrics: Vec<Quadric>,
    vertex_removed: Vec<bool>,
    /// Vertices whose fan cannot be walked (non-manifold), never collapsed
    frozen: Vec<bool>,
}

#[inline]
fn edge_key(a: usize, b: usize) -> (usize, usize) {
    (a.min(b), a.max(b))
}

/// Whether `face` traverses the directed edge `a -> b`
#[inline]
fn has_directed_edge(face: &[usize; 3], a: usize, b: usize) -> bool {
    (0..3).any(|j| face[j] == a && face[(j + 1) % 3] == b)
}

/// Give every connected component a consistent winding.
///
/// The first face of each component (in input order) keeps its winding and
/// the orientation spreads breadth-first across edges shared by exactly two
/// faces. Already consistent meshes are returned unchanged.
fn orient_faces(faces: &[[usize; 3]]) -> Vec<[usize; 3]> {
    let mut oriented = faces.to_vec();

    let mut edge_faces: HashMap<(usize, usize), Vec<usize>> = HashMap::with_capacity(faces.len() * 3);
    for (fi, f) in faces.iter().enumerate() {
        for j in 0..3 {
            edge_faces.entry(edge_key(f[j], f[(j + 1) % 3])).or_default().push(fi);
        }
    }

    let mut visited = vec![false; faces.len()];
    let mut queue = VecDeque::new();
    for seed in 0..faces.len() {
        if visited[seed] {
            continue;
        }
        visited[seed] = true;
        queue.push_back(seed);

        while let Some(fi) = queue.pop_front() {
            let face = oriented[fi];
            for j in 0..3 {
                let (a, b) = (face[j], face[(j + 1) % 3]);
                let shared = match edge_faces.get(&edge_key(a, b)) {
                    Some(shared) if shared.len() == 2 => shared,
                    _ => continue,
                };
                for &other in shared.iter().filter(|&&other| other != fi) {
                    if visited[other] {
                        continue;
                    }
                    visited[other] = true;
                    // A consistent neighbour runs the shared edge as b -> a
                    if has_directed_edge(&oriented[other], a, b) {
                        oriented[other].swap(1, 2);
                    }
                    queue.push_back(other);
                }
            }
        }
    }

    oriented
}

impl HalfEdgeMesh {
    /// Build from a triangle mesh, skipping faces that repeat a vertex and
    /// reorienting faces wound against their neighbours
    fn from_triangle_mesh(mesh: &TriangleMesh) -> Self {
        let nv = mesh.vertices.len();
        let mut half_edges = Vec::with_capacity(mesh.faces.len() * 3);
        let mut vertex_edge = vec![INVALID; nv];
        let mut face_edge = Vec::with_capacity(mesh.faces.len());

        let valid: Vec<[usize; 3]> = mesh
            .faces
            .iter()
            .filter(|f| f[0] != f[1] && f[1] != f[2] && f[2] != f[0])
            .copied()
            .collect();
        let faces = orient_faces(&valid);

        for face in &faces {
            let fi = face_edge.len();
            let base = half_edges.len();
            for j in 0..3usize {
                half_edges.push(HalfEdge {
                    target: face[(j + 1) % 3],
                    twin: INVALID,
                    next: base + (j + 1) % 3,
                    prev: base + (j + 2) % 3,
                    face: fi,
                });
                if vertex_edge[face[j]] == INVALID {
                    vertex_edge[face[j]] = base + j;
                }
            }
            face_edge.push(base);
        }

        // Build twin pointers; a directed edge used twice keeps only one partner
        let mut edge_map: HashMap<(usize, usize), usize> = HashMap::with_capacity(half_edges.len());
        for (he_idx, he) in half_edges.iter().enumerate() {
            let src = half_edges[he.prev].target;
            edge_map.insert((src, he.target), he_idx);
        }
        for he_idx in 0..half_edges.len() {
            if half_edges[he_idx].twin != INVALID {
                continue;
            }
            let src = half_edges[half_edges[he_idx].prev].target;
            let tgt = half_edges[he_idx].target;
            if let Some(&twin_idx) = edge_map.get(&(tgt, src)) {
                if half_edges[twin_idx].twin == INVALID {
                    half_edges[he_idx].twin = twin_idx;
                    half_edges[twin_idx].twin = he_idx;
                }
            }
        }

        let active_face_count = face_edge.len();
        let mut hem = HalfEdgeMesh {
            half_edges,
            vertex_edge,
            face_edge,
            active_face_count,
            positions: mesh.vertices.clone(),
            quadrics: vec![Quadric::zeros(); nv],
            vertex_removed: vec![false; nv],
            frozen: vec![false; nv],
        };
        hem.initialize_quadrics();
        hem.freeze_non_manifold_vertices();
        hem
    }

    #[inline]
    fn source(&self, he: usize) -> usize {
        self.half_edges[self.half_edges[he].prev].target
    }

    fn face_vertices(&self, he0: usize) -> [usize; 3] {
        let he1 = self.half_edges[he0].next;
        [
            self.source(he0),
            self.half_edges[he0].target,
            self.half_edges[he1].target,
        ]
    }

    fn initialize_quadrics(&mut self) {
        for fi in 0..self.face_edge.len() {
            let he0 = self.face_edge[fi];
            if he0 == INVALID {
                continue;
            }
            let [v0, v1, v2] = self.face_vertices(he0);
            let q = triangle_quadric(&self.positions[v0], &self.positions[v1], &self.positions[v2]);
            self.quadrics[v0] += q;
            self.quadrics[v1] += q;
            self.quadrics[v2] += q;
        }
    }

    /// Freeze vertices whose outgoing half-edges are not all reachable by
    /// walking the fan from `vertex_edge`
    fn freeze_non_manifold_vertices(&mut self) {
        let mut out_degree = vec![0usize; self.positions.len()];
        for he in 0..self.half_edges.len() {
            out_degree[self.source(he)] += 1;
        }
        for v in 0..self.positions.len() {
            if self.vertex_edge[v] != INVALID && self.outgoing_half_edges(v).len() != out_degree[v] {
                self.frozen[v] = true;
            }
        }
    }

    #[inline]
    fn is_alive(&self, v: usize) -> bool {
        !self.vertex_removed[v] && self.vertex_edge[v] != INVALID
    }

    /// Get all outgoing half-edges from a vertex (handles boundary vertices).
    fn outgoing_half_edges(&self, v: usize) -> Vec<usize> {
        let start = self.vertex_edge[v];
        if start == INVALID {
            return vec![];
        }

        let limit = self.half_edges.len();
        let mut result = Vec::new();
        let mut current = start;

        // Rotate counterclockwise: current.prev.twin
        loop {
            result.push(current);
            let prev = self.half_edges[current].prev;
            let twin = self.half_edges[prev].twin;
            if twin == INVALID || result.len() > limit {
                break;
            }
            current = twin;
            if current == start {
                return result;
            }
        }

        // Boundary: also rotate clockwise from start via twin.next
        let twin_of_start = self.half_edges[start].twin;
        if twin_of_start != INVALID {
            let mut current = self.half_edges[twin_of_start].next;
            loop {
                if current == start || result.len() > limit {
                    break;
                }
                result.push(current);
                let twin = self.half_edges[current].twin;
                if twin == INVALID {
                    break;
                }
                current = self.half_edges[twin].next;
            }
        }

        result
    }

    /// Sorted, deduplicated one-ring of a vertex
    fn neighbors(&self, v: usize) -> Vec<usize> {
        let mut ring: Vec<usize> = self
            .outgoing_half_edges(v)
            .iter()
            .map(|&he| self.half_edges[he].target)
            .collect();
        // Incoming boundary edge: its source is a neighbor with no outgoing half-edge to it
        for &he in &self.outgoing_half_edges(v) {
            let prev = self.half_edges[he].prev;
            if self.half_edges[prev].twin == INVALID {
                ring.push(self.source(prev));
            }
        }
        ring.sort_unstable();
        ring.dedup();
        ring
    }

    fn is_boundary_vertex(&self, v: usize) -> bool {
        self.outgoing_half_edges(v).iter().any(|&he| {
            self.half_edges[he].twin == INVALID
                || self.half_edges[self.half_edges[he].prev].twin == INVALID
        })
    }

    fn find_half_edge(&self, from: usize, to: usize) -> Option<usize> {
        self.outgoing_half_edges(from)
            .into_iter()
            .find(|&he| self.half_edges[he].target == to)
    }

    /// Whether a live face spans all three vertices
    fn face_exists(&self, a: usize, b: usize, c: usize) -> bool {
        self.outgoing_half_edges(a).iter().any(|&he| {
            if self.half_edges[he].face == INVALID {
                return false;
            }
            let [_, x, y] = self.face_vertices(he);
            (x == b && y == c) || (x == c && y == b)
        })
    }

    /// Check the link condition: common neighbors must equal exactly the
    /// face apices opposite the edge (2 for interior, 1 for boundary), and an
    /// interior edge's apices must not already span a triangle with each endpoint.
    fn check_link_condition(&self, v1: usize, v2: usize, h: usize) -> bool {
        let n2 = self.neighbors(v2);
        let common: Vec<usize> = self
            .neighbors(v1)
            .into_iter()
            .filter(|v| n2.binary_search(v).is_ok())
            .collect();

        let is_boundary = self.half_edges[h].twin == INVALID;
        let expected = if is_boundary { 1 } else { 2 };
        if common.len() != expected {
            return false;
        }
        if !is_boundary {
            let (c, d) = (common[0], common[1]);
            if self.face_exists(v1, c, d) && self.face_exists(v2, c, d) {
                return false;
            }
        }
        true
    }

    /// Whether moving `v1` and `v2` to `new_pos` flips or flattens any
    /// triangle that survives the collapse
    fn collapse_flips_faces(&self, v1: usize, v2: usize, new_pos: &Point3f) -> bool {
        let p = new_pos.coords.cast::<f64>();
        for (v, other) in [(v1, v2), (v2, v1)] {
            let pv = self.positions[v].coords.cast::<f64>();
            for he in self.outgoing_half_edges(v) {
                if self.half_edges[he].face == INVALID {
                    continue;
                }
                let [_, a, b] = self.face_vertices(he);
                if a == other || b == other {
                    continue;
                }
                let pa = self.positions[a].coords.cast::<f64>();
                let pb = self.positions[b].coords.cast::<f64>();

                let before = (pa - pv).cross(&(pb - pv));
                let after = (pa - p).cross(&(pb - p));
                let scale = (pa - p).norm_squared() * (pb - p).norm_squared();
                if after.norm_squared() <= DEGENERATE_SIN2 * scale || before.dot(&after) <= 0.0 {
                    return true;
                }
            }
        }
        false
    }

    /// First candidate half-edge that still belongs to a face
    fn first_live<I: IntoIterator<Item = usize>>(&self, candidates: I) -> usize {
        candidates
            .into_iter()
            .find(|&he| self.half_edges[he].face != INVALID)
            .unwrap_or(INVALID)
    }

    /// Collapse the edge of half-edge `h` (v1 -> v2), merging v2 into v1 at new_pos.
    fn collapse_edge(&mut self, h: usize, new_pos: Point3f) {
        let v2 = self.half_edges[h].target;
        let v1 = self.source(h);

        let h_twin = self.half_edges[h].twin;
        let h_next = self.half_edges[h].next;
        let h_prev = self.half_edges[h].prev;
        let face_a = self.half_edges[h].face;
        let h_next_twin = self.half_edges[h_next].twin;
        let h_prev_twin = self.half_edges[h_prev].twin;
        let c = self.half_edges[h_next].target;

        let (face_b, ht_next, ht_prev, ht_next_twin, ht_prev_twin, d) = if h_twin != INVALID {
            let hn = self.half_edges[h_twin].next;
            let hp = self.half_edges[h_twin].prev;
            (
                self.half_edges[h_twin].face,
                hn,
                hp,
                self.half_edges[hn].twin,
                self.half_edges[hp].twin,
                self.half_edges[hn].target,
            )
        } else {
            (INVALID, INVALID, INVALID, INVALID, INVALID, INVALID)
        };

        // Collect fans BEFORE any modifications; every surviving outgoing
        // half-edge of v1, c and d after the collapse is in one of them
        let v1_outgoing = self.outgoing_half_edges(v1);
        let v2_outgoing = self.outgoing_half_edges(v2);
        let c_outgoing = self.outgoing_half_edges(c);
        let d_outgoing = if d != INVALID {
            self.outgoing_half_edges(d)
        } else {
            Vec::new()
        };

        // Re-pair twins for face A border edges
        if h_next_twin != INVALID {
            self.half_edges[h_next_twin].twin = h_prev_twin;
        }
        if h_prev_twin != INVALID {
            self.half_edges[h_prev_twin].twin = h_next_twin;
        }

        // Mark face A as removed
        self.half_edges[h].face = INVALID;
        self.half_edges[h_next].face = INVALID;
        self.half_edges[h_prev].face = INVALID;
        self.face_edge[face_a] = INVALID;
        self.active_face_count -= 1;

        // Handle face B
        if face_b != INVALID {
            if ht_next_twin != INVALID {
                self.half_edges[ht_next_twin].twin = ht_prev_twin;
            }
            if ht_prev_twin != INVALID {
                self.half_edges[ht_prev_twin].twin = ht_next_twin;
            }
            self.half_edges[h_twin].face = INVALID;
            self.half_edges[ht_next].face = INVALID;
            self.half_edges[ht_prev].face = INVALID;
            self.face_edge[face_b] = INVALID;
            self.active_face_count -= 1;
        }

        // Redirect all v2 references to v1
        for &he in &v2_outgoing {
            let prev = self.half_edges[he].prev;
            self.half_edges[prev].target = v1;

            let twin = self.half_edges[he].twin;
            if twin != INVALID && self.half_edges[twin].face != INVALID {
                self.half_edges[twin].target = v1;
            }
        }

        // Fix vertex_edge pointers for v1
        if self.half_edges[self.vertex_edge[v1]].face == INVALID {
            if h_prev_twin != INVALID && self.half_edges[h_prev_twin].face != INVALID {
                self.vertex_edge[v1] = h_prev_twin;
            } else {
                self.vertex_edge[v1] =
                    self.first_live(v1_outgoing.iter().chain(&v2_outgoing).copied());
            }
        }

        // Fix vertex_edge for c
        if self.vertex_edge[c] != INVALID && self.half_edges[self.vertex_edge[c]].face == INVALID {
            if h_next_twin != INVALID && self.half_edges[h_next_twin].face != INVALID {
                self.vertex_edge[c] = h_next_twin;
            } else {
                self.vertex_edge[c] = self.first_live(c_outgoing.iter().copied());
            }
        }

        // Fix vertex_edge for d
        if d != INVALID
            && d != c
            && self.vertex_edge[d] != INVALID
            && self.half_edges[self.vertex_edge[d]].face == INVALID
        {
            if ht_next_twin != INVALID && self.half_edges[ht_next_twin].face != INVALID {
                self.vertex_edge[d] = ht_next_twin;
            } else {
                self.vertex_edge[d] = self.first_live(d_outgoing.iter().copied());
            }
        }

        // Mark v2 as removed
        self.vertex_edge[v2] = INVALID;
        self.vertex_removed[v2] = true;

        // Update position and quadric for v1
        let v2_quadric = self.quadrics[v2];
        self.positions[v1] = new_pos;
        self.quadrics[v1] += v2_quadric;
    }

    /// Live faces in their original order, vertices reindexed by ascending
    /// original id; unreferenced vertices are dropped
    fn to_triangle_mesh(&self) -> TriangleMesh {
        let faces: Vec<[usize; 3]> = self
            .face_edge
            .iter()
            .filter(|&&he0| he0 != INVALID)
            .map(|&he0| self.face_vertices(he0))
            .filter(|f| {
                f.iter().all(|&v| !self.vertex_removed[v])
                    && f[0] != f[1]
                    && f[1] != f[2]
                    && f[2] != f[0]
            })
            .collect();

        let mut used = vec![false; self.positions.len()];
        for f in &faces {
            for &v in f {
                used[v] = true;
            }
        }

        let mut old_to_new = vec![INVALID; self.positions.len()];
        let mut new_positions = Vec::new();
        for (i, &is_used) in used.iter().enumerate() {
            if is_used {
                old_to_new[i] = new_positions.len();
                new_positions.push(self.positions[i]);
            }
        }

        let new_faces = faces
            .iter()
            .map(|f| [old_to_new[f[0]], old_to_new[f[1]], old_to_new[f[2]]])
            .collect();

        TriangleMesh::from_vertices_and_faces(new_positions, new_faces)
    }
}

// ============================================================
// Edge Cost for Priority Queue
// ============================================================

#[derive(Debug, Clone)]
struct EdgeCost {
    key: (usize, usize),
    position: Point3f,
    cost: f64,
}

impl PartialEq for EdgeCost {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for EdgeCost {}

impl PartialOrd for EdgeCost {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EdgeCost {
    fn cmp(&self, other: &Self) -> Ordering {
        // Max-queue: smallest cost first, then the earliest edge in scan order
        other
            .cost
            .total_cmp(&self.cost)
            .then_with(|| other.key.cmp(&self.key))
    }
}

// ============================================================
// Edge Collapse Simplifier
// ============================================================

/// Edge collapse mesh simplifier using half-edge data structure and QEM.
///
/// This simplifier builds a half-edge mesh for efficient local topology
/// queries (neighbor iteration, boundary detection, link condition checks)
/// and uses quadric error metrics to prioritize edge collapses.
///
/// A collapse that would break manifoldness, pinch two boundaries together,
/// or flip a surviving triangle is skipped. When no valid collapse remains
/// the mesh is returned above its target count.
#[derive(Debug, Clone)]
pub struct EdgeCollapseSimplifier {
    /// Stop when the minimum collapse cost exceeds this threshold
    pub error_threshold: Option<f64>,
    /// Never collapse edges touching the mesh boundary
    pub preserve_boundary: bool,
    /// Extra penalty weight applied to boundary edge costs
    pub boundary_weight: f64,
}

impl Default for EdgeCollapseSimplifier {
    fn default() -> Self {
        Self {
            error_threshold: None,
            preserve_boundary: false,
            boundary_weight: 100.0,
        }
    }
}

impl EdgeCollapseSimplifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_params(
        error_threshold: Option<f64>,
        preserve_boundary: bool,
        boundary_weight: f64,
    ) -> Self {
        Self {
            error_threshold,
            preserve_boundary,
            boundary_weight,
        }
    }

    /// Cost of collapsing edge (a, b), or `None` if it may not be collapsed
    fn edge_cost(&self, hem: &HalfEdgeMesh, a: usize, b: usize) -> Option<EdgeCost> {
        if hem.frozen[a] || hem.frozen[b] {
            return None;
        }
        let on_boundary = hem.is_boundary_vertex(a) || hem.is_boundary_vertex(b);
        if on_boundary && self.preserve_boundary {
            return None;
        }

        let q = hem.quadrics[a] + hem.quadrics[b];
        let (position, mut cost) = optimal_placement(&q, &hem.positions[a], &hem.positions[b]);
        if on_boundary {
            cost += self.boundary_weight;
        }

        Some(EdgeCost {
            key: edge_key(a, b),
            position,
            cost,
        })
    }

    /// Build the initial priority queue of edge collapse candidates.
    fn build_queue(&self, hem: &HalfEdgeMesh) -> PriorityQueue<(usize, usize), EdgeCost> {
        let mut queue = PriorityQueue::new();

        for vi in 0..hem.positions.len() {
            if !hem.is_alive(vi) {
                continue;
            }
            for target in hem.neighbors(vi) {
                let key = edge_key(vi, target);
                if key.0 != vi {
                    continue;
                }
                if let Some(cost) = self.edge_cost(hem, vi, target) {
                    queue.push(key, cost);
                }
            }
        }

        queue
    }

    /// Re-cost every edge around `v` and its one-ring after a collapse
    fn update_queue(
        &self,
        hem: &HalfEdgeMesh,
        queue: &mut PriorityQueue<(usize, usize), EdgeCost>,
        v: usize,
    ) {
        let mut affected = hem.neighbors(v);
        affected.push(v);
        for u in affected {
            for n in hem.neighbors(u) {
                let key = edge_key(u, n);
                match self.edge_cost(hem, u, n) {
                    Some(cost) => {
                        queue.push(key, cost);
                    }
                    None => {
                        queue.remove(&key);
                    }
                }
            }
        }
    }
}

impl MeshSimplifier for EdgeCollapseSimplifier {
    fn simplify(&self, mesh: &TriangleMesh, decimation_factor: f64) -> Result<TriangleMesh> {
        let target_faces = decimation_target(mesh.face_count(), decimation_factor)?;

        let nv = mesh.vertices.len();
        if let Some(face) = mesh.faces.iter().position(|f| f.iter().any(|&v| v >= nv)) {
            return Err(Error::InvalidData(format!(
                "face {face} references a vertex outside 0..{nv}"
            )));
        }

        let mut hem = HalfEdgeMesh::from_triangle_mesh(mesh);
        let mut queue = self.build_queue(&hem);

        while hem.active_face_count > target_faces {
            let (key, edge_cost) = match queue.pop() {
                Some(item) => item,
                None => break,
            };

            // Check error threshold
            if let Some(threshold) = self.error_threshold {
                if edge_cost.cost > threshold {
                    break;
                }
            }

            let (a, b) = key;
            if !hem.is_alive(a) || !hem.is_alive(b) {
                continue;
            }

            // Collapse along whichever direction has a face
            let (v1, v2, h) = match (hem.find_half_edge(a, b), hem.find_half_edge(b, a)) {
                (Some(h), _) => (a, b, h),
                (None, Some(h)) => (b, a, h),
                (None, None) => continue,
            };

            let interior = hem.half_edges[h].twin != INVALID;
            if interior && hem.is_boundary_vertex(v1) && hem.is_boundary_vertex(v2) {
                continue;
            }
            if !hem.check_link_condition(v1, v2, h) {
                continue;
            }
            if hem.collapse_flips_faces(v1, v2, &edge_cost.position) {
                continue;
            }

            for n in hem.neighbors(v2) {
                queue.remove(&edge_key(v2, n));
            }
            hem.collapse_edge(h, edge_cost.position);
            self.update_queue(&hem, &mut queue, v1);
        }

        Ok(hem.to_triangle_mesh())
    }
}
