use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::num::NonZero;

use glam::{DMat3, DVec3};
use rayon::prelude::*;

use crate::pointcloud::{FromArrayRef, PointCloud};
use crate::spatial::PointIndex;

/// Error types for normal estimation.
#[derive(Debug, thiserror::Error)]
pub enum NormalsError {
    /// The operation needs normals but the point cloud has none
    #[error("Point cloud has no normals")]
    MissingNormals,

    /// A search parameter is out of range
    #[error("Invalid search parameter: {0}")]
    InvalidParameter(String),
}

/// Neighbourhood used to fit the tangent plane of each point.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum KdTreeSearchParam {
    /// The `k` nearest neighbours.
    Knn {
        /// Number of neighbours.
        k: usize,
    },
    /// Every neighbour within `radius`.
    Radius {
        /// Search radius.
        radius: f64,
    },
    /// At most `max_nn` neighbours within `radius`.
    Hybrid {
        /// Search radius.
        radius: f64,
        /// Maximum number of neighbours.
        max_nn: usize,
    },
}

impl Default for KdTreeSearchParam {
    fn default() -> Self {
        KdTreeSearchParam::Hybrid {
            radius: 0.1,
            max_nn: 50,
        }
    }
}

impl KdTreeSearchParam {
    fn validate(&self) -> Result<(), NormalsError> {
        let valid = match *self {
            KdTreeSearchParam::Knn { k } => k > 0,
            KdTreeSearchParam::Radius { radius } => radius > 0.0,
            KdTreeSearchParam::Hybrid { radius, max_nn } => radius > 0.0 && max_nn > 0,
        };
        if valid {
            Ok(())
        } else {
            Err(NormalsError::InvalidParameter(format!("{self:?}")))
        }
    }

    fn search(&self, index: &PointIndex, query: &[f64; 3]) -> Vec<usize> {
        match *self {
            KdTreeSearchParam::Knn { k } => index.knn(query, NonZero::new(k).unwrap_or(NonZero::<usize>::MIN)),
            KdTreeSearchParam::Radius { radius } => index.radius(query, radius),
            KdTreeSearchParam::Hybrid { radius, max_nn } => {
                index.hybrid(query, radius, NonZero::new(max_nn).unwrap_or(NonZero::<usize>::MIN))
            }
        }
    }
}

/// Estimate a unit normal for every point from its local neighbourhood.
///
/// The normal is the eigenvector of the smallest eigenvalue of the
/// neighbourhood covariance. Points with fewer than three neighbours get
/// `[0, 0, 1]`. If the cloud already has normals they are used as a hint and
/// the new normal is flipped to their side.
pub fn estimate_normals(
    pointcloud: &mut PointCloud,
    search_param: KdTreeSearchParam,
) -> Result<(), NormalsError> {
    search_param.validate()?;
    if pointcloud.is_empty() {
        return Ok(());
    }

    let now = std::time::Instant::now();
    let points = pointcloud.points();
    let index = PointIndex::new(points);
    let hints = pointcloud
        .normals()
        .filter(|normals| normals.len() == points.len());

    let normals = points
        .par_iter()
        .enumerate()
        .map(|(i, point)| {
            let neighbors = search_param.search(&index, point);
            let normal = if neighbors.len() < 3 {
                DVec3::Z
            } else {
                let covariance = compute_covariance(points, &neighbors);
                smallest_eigenvector(&covariance).unwrap_or(DVec3::Z)
            };
            let normal = match hints.map(|h| DVec3::from_array_ref(&h[i])) {
                Some(hint) if normal.dot(hint) < 0.0 => -normal,
                _ => normal,
            };
            normal.to_array()
        })
        .collect::<Vec<_>>();

    log::debug!(
        "Estimated {} normals in {:?}",
        normals.len(),
        now.elapsed()
    );

    pointcloud
        .set_normals(normals)
        .map_err(|e| NormalsError::InvalidParameter(e.to_string()))
}

// Covariance of the points selected by `indices`.
fn compute_covariance(points: &[[f64; 3]], indices: &[usize]) -> DMat3 {
    let n = indices.len() as f64;
    let mean = indices
        .iter()
        .map(|&i| DVec3::from_array_ref(&points[i]))
        .sum::<DVec3>()
        / n;

    let mut cov = DMat3::ZERO;
    for &i in indices {
        let d = DVec3::from_array_ref(&points[i]) - mean;
        cov += DMat3::from_cols(d * d.x, d * d.y, d * d.z);
    }
    cov * (1.0 / n)
}

/// Eigenvector of the smallest eigenvalue of a symmetric 3x3 matrix.
///
/// Uses the closed form eigenvalues of a symmetric matrix and recovers the
/// eigenvector from cross products of the rows of `A - λI`. Returns `None`
/// for the zero matrix.
fn smallest_eigenvector(a: &DMat3) -> Option<DVec3> {
    let scale = a.to_cols_array().iter().fold(0.0f64, |m, v| m.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return None;
    }
    let a = *a * (1.0 / scale);

    let (a00, a11, a22) = (a.x_axis.x, a.y_axis.y, a.z_axis.z);
    let (a01, a02, a12) = (a.y_axis.x, a.z_axis.x, a.z_axis.y);

    let p1 = a01 * a01 + a02 * a02 + a12 * a12;
    if p1 == 0.0 {
        // already diagonal
        let diag = [a00, a11, a22];
        let axis = (0..3)
            .min_by(|&i, &j| diag[i].total_cmp(&diag[j]))
            .unwrap_or(2);
        return Some([DVec3::X, DVec3::Y, DVec3::Z][axis]);
    }

    let q = (a00 + a11 + a22) / 3.0;
    let p2 = (a00 - q).powi(2) + (a11 - q).powi(2) + (a22 - q).powi(2) + 2.0 * p1;
    let p = (p2 / 6.0).sqrt();
    let b = (a - DMat3::from_diagonal(DVec3::splat(q))) * (1.0 / p);
    let r = (b.determinant() / 2.0).clamp(-1.0, 1.0);
    let phi = r.acos() / 3.0;
    let smallest = q + 2.0 * p * (phi + 2.0 * std::f64::consts::FRAC_PI_3).cos();

    let m = a - DMat3::from_diagonal(DVec3::splat(smallest));
    // symmetric, so columns are rows
    let rows = [m.x_axis, m.y_axis, m.z_axis];
    let candidates = [
        rows[0].cross(rows[1]),
        rows[0].cross(rows[2]),
        rows[1].cross(rows[2]),
    ];
    let best = candidates
        .into_iter()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .unwrap_or(DVec3::ZERO);

    if best.length_squared() > 1e-20 {
        return Some(best.normalize());
    }

    // repeated smallest eigenvalue, any vector orthogonal to the row space works
    let row = rows
        .into_iter()
        .max_by(|a, b| a.length_squared().total_cmp(&b.length_squared()))
        .unwrap_or(DVec3::ZERO);
    if row.length_squared() > 1e-20 {
        Some(row.normalize().any_orthonormal_vector())
    } else {
        Some(DVec3::Z)
    }
}

// Candidate edge of the spanning tree, ordered so the heap pops the lightest.
struct Edge {
    weight: f64,
    parent: usize,
    child: usize,
}

impl PartialEq for Edge {
    fn eq(&self, other: &Self) -> bool {
        self.weight.total_cmp(&other.weight) == Ordering::Equal
    }
}

impl Eq for Edge {}

impl PartialOrd for Edge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Edge {
    fn cmp(&self, other: &Self) -> Ordering {
        other.weight.total_cmp(&self.weight)
    }
}

/// Make the normals of neighbouring points agree in orientation.
///
/// Builds a minimum spanning tree over the `k` nearest neighbour graph with
/// edge weight `1 - |n_i · n_j|` and flips normals while walking the tree, so
/// orientation is propagated across nearly parallel tangent planes first.
/// Each connected part starts at its highest point, whose normal is turned
/// towards `+z` unless an already oriented neighbour decides it.
pub fn orient_normals_consistent_tangent_plane(
    pointcloud: &mut PointCloud,
    k: usize,
) -> Result<(), NormalsError> {
    let k = NonZero::new(k)
        .ok_or_else(|| NormalsError::InvalidParameter("k must be positive".to_string()))?;
    if !pointcloud.has_normals() {
        return Err(NormalsError::MissingNormals);
    }

    let points = pointcloud.points().clone();
    let index = PointIndex::new(&points);
    let Some(normals) = pointcloud.normals_mut() else {
        return Err(NormalsError::MissingNormals);
    };

    // roots are taken from the top down
    let mut order: Vec<usize> = (0..points.len()).collect();
    order.sort_by(|&a, &b| points[b][2].total_cmp(&points[a][2]));

    let mut visited = vec![false; points.len()];
    let mut heap = BinaryHeap::new();
    let mut num_components = 0usize;
    let mut num_flipped = 0usize;

    for root in order {
        if visited[root] {
            continue;
        }
        num_components += 1;

        let neighbors = index.knn(&points[root], k);
        let root_normal = DVec3::from_array_ref(&normals[root]);
        let reference = neighbors
            .iter()
            .filter(|&&j| visited[j])
            .map(|&j| DVec3::from_array_ref(&normals[j]))
            .max_by(|a, b| {
                a.dot(root_normal)
                    .abs()
                    .total_cmp(&b.dot(root_normal).abs())
            })
            .unwrap_or(DVec3::Z);
        if root_normal.dot(reference) < 0.0 {
            normals[root] = (-root_normal).to_array();
            num_flipped += 1;
        }
        visited[root] = true;
        push_edges(&mut heap, root, &neighbors, normals, &visited);

        while let Some(Edge { parent, child, .. }) = heap.pop() {
            if visited[child] {
                continue;
            }
            visited[child] = true;

            let parent_normal = DVec3::from_array_ref(&normals[parent]);
            let child_normal = DVec3::from_array_ref(&normals[child]);
            if parent_normal.dot(child_normal) < 0.0 {
                normals[child] = (-child_normal).to_array();
                num_flipped += 1;
            }

            let neighbors = index.knn(&points[child], k);
            push_edges(&mut heap, child, &neighbors, normals, &visited);
        }
    }

    log::debug!(
        "Oriented normals: {} components, {} flipped",
        num_components,
        num_flipped
    );

    Ok(())
}

fn push_edges(
    heap: &mut BinaryHeap<Edge>,
    parent: usize,
    neighbors: &[usize],
    normals: &[[f64; 3]],
    visited: &[bool],
) {
    let n = DVec3::from_array_ref(&normals[parent]);
    for &child in neighbors {
        if visited[child] {
            continue;
        }
        let weight = 1.0 - n.dot(DVec3::from_array_ref(&normals[child])).abs();
        heap.push(Edge {
            weight,
            parent,
            child,
        });
    }
}
