use std::collections::{HashMap, VecDeque};

use glam::DVec3;

use super::ReconstructionError;
use crate::mesh::TriangleMesh;
use crate::pointcloud::{FromArrayRef, PointCloud};
use crate::spatial::PointIndex;

// Relative shrink of the ball when testing emptiness, so points lying on the
// sphere (e.g. the fourth corner of a square) do not count as inside.
const EMPTY_BALL_TOLERANCE: f64 = 1e-7;

// Seeds are searched among this many nearest unused neighbours.
const MAX_SEED_NEIGHBORS: usize = 24;

/// An edge of the mesh under construction.
///
/// `from -> to` is the direction of the edge in the first triangle that
/// created it and `opposite` is the third vertex of that triangle.
#[derive(Debug, Clone, Copy)]
struct EdgeRecord {
    from: usize,
    to: usize,
    opposite: usize,
    faces: u8,
}

fn edge_key(a: usize, b: usize) -> (usize, usize) {
    if a < b {
        (a, b)
    } else {
        (b, a)
    }
}

struct BallPivoting<'a> {
    points: &'a [[f64; 3]],
    normals: &'a [[f64; 3]],
    index: PointIndex,
    edges: HashMap<(usize, usize), EdgeRecord>,
    // vertex is part of at least one triangle
    used: Vec<bool>,
    // number of incident edges with a single triangle
    open_edges: Vec<u32>,
    triangles: Vec<[usize; 3]>,
    front: VecDeque<(usize, usize)>,
}

impl<'a> BallPivoting<'a> {
    fn new(points: &'a [[f64; 3]], normals: &'a [[f64; 3]]) -> Self {
        Self {
            points,
            normals,
            index: PointIndex::new(points),
            edges: HashMap::new(),
            used: vec![false; points.len()],
            open_edges: vec![0; points.len()],
            triangles: Vec::new(),
            front: VecDeque::new(),
        }
    }

    #[inline]
    fn p(&self, i: usize) -> DVec3 {
        DVec3::from_array_ref(&self.points[i])
    }

    #[inline]
    fn n(&self, i: usize) -> DVec3 {
        DVec3::from_array_ref(&self.normals[i])
    }

    /// Center of the ball of `radius` touching `a`, `b` and `c`.
    ///
    /// The ball sits on the side the triangle `(a, b, c)` faces, and the
    /// triangle must face the same way as its vertex normals.
    fn ball_center(&self, a: usize, b: usize, c: usize, radius: f64) -> Option<DVec3> {
        let (pa, pb, pc) = (self.p(a), self.p(b), self.p(c));
        let ab = pb - pa;
        let ac = pc - pa;
        let n = ab.cross(ac);
        let n_len2 = n.length_squared();
        if n_len2 < 1e-30 {
            return None;
        }

        if n.dot(self.n(a) + self.n(b) + self.n(c)) <= 0.0 {
            return None;
        }

        let circumcenter =
            pa + (n.cross(ab) * ac.length_squared() + ac.cross(n) * ab.length_squared()) / (2.0 * n_len2);
        let rho2 = (circumcenter - pa).length_squared();
        let h2 = radius * radius - rho2;
        if h2 < 0.0 {
            return None;
        }

        Some(circumcenter + n / n_len2.sqrt() * h2.sqrt())
    }

    /// True if no point other than `exclude` lies strictly inside the ball.
    fn is_empty_ball(&self, center: DVec3, radius: f64, exclude: [usize; 3]) -> bool {
        self.index
            .radius(&center.to_array(), radius * (1.0 - EMPTY_BALL_TOLERANCE))
            .into_iter()
            .all(|i| exclude.contains(&i))
    }

    /// True if `existing` and `candidate` lie on the same side of edge `u-v`,
    /// i.e. the two triangles sharing the edge would overlap.
    fn folds_over(&self, u: usize, v: usize, existing: usize, candidate: usize) -> bool {
        let pu = self.p(u);
        let axis = (self.p(v) - pu).normalize_or_zero();
        let perp = |x: DVec3| {
            let d = x - pu;
            d - axis * d.dot(axis)
        };
        perp(self.p(existing)).dot(perp(self.p(candidate))) > 0.0
    }

    /// Whether the directed edge `from -> to` of a new triangle with third
    /// vertex `opposite` keeps the mesh manifold and consistently oriented.
    fn can_add_edge(&self, from: usize, to: usize, opposite: usize) -> bool {
        match self.edges.get(&edge_key(from, to)) {
            None => true,
            Some(rec) => {
                rec.faces < 2
                    && rec.from == to
                    && !self.folds_over(from, to, rec.opposite, opposite)
            }
        }
    }

    fn add_triangle(&mut self, a: usize, b: usize, c: usize) {
        self.triangles.push([a, b, c]);
        for (from, to, opposite) in [(a, b, c), (b, c, a), (c, a, b)] {
            let key = edge_key(from, to);
            match self.edges.get_mut(&key) {
                Some(rec) => {
                    rec.faces += 1;
                    self.open_edges[from] -= 1;
                    self.open_edges[to] -= 1;
                }
                None => {
                    self.edges.insert(
                        key,
                        EdgeRecord {
                            from,
                            to,
                            opposite,
                            faces: 1,
                        },
                    );
                    self.open_edges[from] += 1;
                    self.open_edges[to] += 1;
                    self.front.push_back(key);
                }
            }
        }
        for v in [a, b, c] {
            self.used[v] = true;
        }
    }

    /// Roll the ball over the edge `from -> to` of triangle
    /// `(from, to, opposite)` and return the vertex it lands on.
    ///
    /// Candidates are visited in the order the ball hits them. The first one
    /// whose ball is empty and whose triangle keeps the mesh manifold wins.
    fn pivot(&self, edge: &EdgeRecord, radius: f64) -> Option<usize> {
        let (i, j, k) = (edge.from, edge.to, edge.opposite);
        let center = self.ball_center(i, j, k, radius)?;

        let (pi, pj) = (self.p(i), self.p(j));
        let mid = (pi + pj) * 0.5;
        let axis = (pj - pi).normalize_or_zero();
        let project = |x: DVec3| {
            let d = x - mid;
            (d - axis * d.dot(axis)).normalize_or_zero()
        };

        let start = project(center);
        let outward = -project(self.p(k));
        let rotation = start.cross(outward).normalize_or_zero();
        if start == DVec3::ZERO || rotation == DVec3::ZERO {
            return None;
        }

        let reach = (center - mid).length() + radius;
        let mut candidates = self
            .index
            .radius(&mid.to_array(), reach)
            .into_iter()
            .filter(|&p| p != i && p != j && p != k)
            .filter_map(|p| {
                // new triangle shares the edge in reverse direction
                let c = self.ball_center(j, i, p, radius)?;
                let v = project(c);
                let mut angle = rotation.dot(start.cross(v)).atan2(start.dot(v));
                if angle < 0.0 {
                    angle += std::f64::consts::TAU;
                }
                Some((angle, p, c))
            })
            .collect::<Vec<_>>();
        candidates.sort_by(|a, b| a.0.total_cmp(&b.0));

        candidates.into_iter().find_map(|(_, p, c)| {
            let inner = self.used[p] && self.open_edges[p] == 0;
            let valid = !inner
                && !self.folds_over(j, i, k, p)
                && self.can_add_edge(i, p, j)
                && self.can_add_edge(p, j, i)
                && self.is_empty_ball(c, radius, [i, j, p]);
            valid.then_some(p)
        })
    }

    fn expand(&mut self, radius: f64) {
        while let Some(key) = self.front.pop_front() {
            let Some(edge) = self.edges.get(&key).copied() else {
                continue;
            };
            if edge.faces != 1 {
                continue;
            }
            if let Some(p) = self.pivot(&edge, radius) {
                self.add_triangle(edge.to, edge.from, p);
            }
        }
    }

    /// Look for a triangle of unused vertices with an empty ball.
    fn find_seed(&self, v: usize, radius: f64) -> Option<[usize; 3]> {
        let neighbors = self
            .index
            .radius(&self.points[v], 2.0 * radius)
            .into_iter()
            .filter(|&p| p != v && !self.used[p])
            .take(MAX_SEED_NEIGHBORS)
            .collect::<Vec<_>>();

        for (ia, &a) in neighbors.iter().enumerate() {
            for &b in &neighbors[ia + 1..] {
                let oriented = [[v, a, b], [v, b, a]];
                for [x, y, z] in oriented {
                    let Some(center) = self.ball_center(x, y, z, radius) else {
                        continue;
                    };
                    let fresh = [(x, y), (y, z), (z, x)]
                        .iter()
                        .all(|&(s, t)| !self.edges.contains_key(&edge_key(s, t)));
                    if fresh && self.is_empty_ball(center, radius, [x, y, z]) {
                        return Some([x, y, z]);
                    }
                }
            }
        }
        None
    }

    fn run(&mut self, radius: f64, first: bool) {
        let before = self.triangles.len();

        if !first {
            // boundary edges get another chance with the bigger ball
            self.front = self
                .edges
                .iter()
                .filter(|(_, rec)| rec.faces == 1)
                .map(|(key, _)| *key)
                .collect();
            self.front.make_contiguous().sort_unstable();
        }
        self.expand(radius);

        let mut seeds = 0usize;
        for v in 0..self.points.len() {
            if self.used[v] {
                continue;
            }
            if let Some([a, b, c]) = self.find_seed(v, radius) {
                seeds += 1;
                self.add_triangle(a, b, c);
                self.expand(radius);
            }
        }

        log::debug!(
            "Ball pivoting radius {}: {} seeds, {} new triangles",
            radius,
            seeds,
            self.triangles.len() - before
        );
    }
}

/// Reconstruct a surface with the ball pivoting algorithm.
///
/// A ball of each radius, smallest first, is rolled over the points. Every
/// triangle whose three vertices the ball touches without containing any
/// other point becomes part of the mesh. The point cloud must have normals,
/// they decide which side of the surface the ball rolls on.
///
/// The returned mesh keeps every input point as a vertex, in input order,
/// with the cloud's normals and colors.
pub fn create_from_point_cloud_ball_pivoting(
    pointcloud: &PointCloud,
    radii: &[f64],
) -> Result<TriangleMesh, ReconstructionError> {
    if !pointcloud.has_normals() {
        return Err(ReconstructionError::MissingNormals);
    }
    if radii.is_empty() {
        return Err(ReconstructionError::InvalidRadii("no radius given".to_string()));
    }
    if let Some(r) = radii.iter().find(|r| !(r.is_finite() && **r > 0.0)) {
        return Err(ReconstructionError::InvalidRadii(format!(
            "radius must be positive, got {r}"
        )));
    }

    let mut radii = radii.to_vec();
    radii.sort_by(f64::total_cmp);
    radii.dedup();

    let points = pointcloud.points();
    let Some(normals) = pointcloud.normals() else {
        return Err(ReconstructionError::MissingNormals);
    };

    let now = std::time::Instant::now();
    let mut bpa = BallPivoting::new(points, normals);
    for (i, &radius) in radii.iter().enumerate() {
        bpa.run(radius, i == 0);
    }

    log::debug!(
        "Ball pivoting produced {} triangles from {} points in {:?}",
        bpa.triangles.len(),
        points.len(),
        now.elapsed()
    );

    Ok(TriangleMesh::from_point_cloud_and_triangles(
        pointcloud,
        bpa.triangles,
    ))
}
