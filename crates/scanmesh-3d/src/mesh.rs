use glam::DVec3;

use crate::pointcloud::{FromArrayRef, PointCloud};

/// A triangle mesh with optional per-vertex normals and colors.
///
/// Triangles index into `vertices` and are wound counter-clockwise when seen
/// from the side their normal points to.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    vertices: Vec<[f64; 3]>,
    triangles: Vec<[usize; 3]>,
    vertex_normals: Option<Vec<[f64; 3]>>,
    vertex_colors: Option<Vec<[u8; 3]>>,
}

impl TriangleMesh {
    /// Create a new mesh from vertices and triangles.
    pub fn new(vertices: Vec<[f64; 3]>, triangles: Vec<[usize; 3]>) -> Self {
        Self {
            vertices,
            triangles,
            vertex_normals: None,
            vertex_colors: None,
        }
    }

    /// Create a mesh that reuses every point of `pointcloud` as a vertex.
    ///
    /// Normals and colors of the point cloud become vertex attributes.
    pub fn from_point_cloud_and_triangles(
        pointcloud: &PointCloud,
        triangles: Vec<[usize; 3]>,
    ) -> Self {
        Self {
            vertices: pointcloud.points().clone(),
            triangles,
            vertex_normals: pointcloud.normals().cloned(),
            vertex_colors: pointcloud.colors().cloned(),
        }
    }

    /// Number of vertices in the mesh.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertices.len()
    }

    /// Number of triangles in the mesh.
    #[inline]
    pub fn num_triangles(&self) -> usize {
        self.triangles.len()
    }

    /// A mesh without triangles is considered empty.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.triangles.is_empty()
    }

    /// The vertex positions.
    pub fn vertices(&self) -> &[[f64; 3]] {
        &self.vertices
    }

    /// The triangles as vertex index triplets.
    pub fn triangles(&self) -> &[[usize; 3]] {
        &self.triangles
    }

    /// The per-vertex normals, if any.
    pub fn vertex_normals(&self) -> Option<&[[f64; 3]]> {
        self.vertex_normals.as_deref()
    }

    /// The per-vertex colors, if any.
    pub fn vertex_colors(&self) -> Option<&[[u8; 3]]> {
        self.vertex_colors.as_deref()
    }

    /// Unit normal of every triangle.
    ///
    /// Degenerate triangles get a zero normal.
    pub fn triangle_normals(&self) -> Vec<[f64; 3]> {
        self.triangles
            .iter()
            .map(|t| {
                let n = self.face_cross(t);
                n.try_normalize().unwrap_or(DVec3::ZERO).to_array()
            })
            .collect()
    }

    /// Recompute the vertex normals from the triangles.
    ///
    /// Each vertex normal is the normalized sum of the (area weighted) normals
    /// of its incident faces. Vertices without faces get a zero normal.
    pub fn compute_vertex_normals(&mut self) {
        let mut accum = vec![DVec3::ZERO; self.vertices.len()];
        for t in &self.triangles {
            let n = self.face_cross(t);
            for &v in t {
                accum[v] += n;
            }
        }
        self.vertex_normals = Some(
            accum
                .into_iter()
                .map(|n| n.try_normalize().unwrap_or(DVec3::ZERO).to_array())
                .collect(),
        );
    }

    /// Drop the vertices that no triangle references and remap the triangles.
    pub fn remove_unreferenced_vertices(&mut self) {
        let mut remap = vec![usize::MAX; self.vertices.len()];
        for t in &self.triangles {
            for &v in t {
                remap[v] = 0;
            }
        }

        let mut next = 0;
        for slot in remap.iter_mut() {
            if *slot == 0 {
                *slot = next;
                next += 1;
            }
        }

        let removed = self.vertices.len() - next;
        if removed == 0 {
            return;
        }

        self.vertices = compact(&self.vertices, &remap);
        self.vertex_normals = self.vertex_normals.as_ref().map(|n| compact(n, &remap));
        self.vertex_colors = self.vertex_colors.as_ref().map(|c| compact(c, &remap));
        for t in self.triangles.iter_mut() {
            for v in t.iter_mut() {
                *v = remap[*v];
            }
        }

        log::debug!("Removed {} unreferenced vertices", removed);
    }

    // Cross product of the two triangle edges, twice the area in length.
    fn face_cross(&self, t: &[usize; 3]) -> DVec3 {
        let a = DVec3::from_array_ref(&self.vertices[t[0]]);
        let b = DVec3::from_array_ref(&self.vertices[t[1]]);
        let c = DVec3::from_array_ref(&self.vertices[t[2]]);
        (b - a).cross(c - a)
    }
}

fn compact<T: Copy>(values: &[T], remap: &[usize]) -> Vec<T> {
    values
        .iter()
        .zip(remap.iter())
        .filter(|(_, &r)| r != usize::MAX)
        .map(|(v, _)| *v)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn unit_square() -> TriangleMesh {
        TriangleMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            vec![[0, 1, 2], [0, 2, 3]],
        )
    }

    #[test]
    fn test_triangle_normals() {
        let mesh = unit_square();
        let normals = mesh.triangle_normals();
        assert_eq!(normals.len(), 2);
        for n in normals {
            assert_relative_eq!(n[2], 1.0);
        }
    }

    #[test]
    fn test_degenerate_triangle_normal() {
        let mesh = TriangleMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [2.0, 0.0, 0.0]],
            vec![[0, 1, 2]],
        );
        assert_eq!(mesh.triangle_normals()[0], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_compute_vertex_normals() {
        let mut mesh = TriangleMesh::new(
            vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 1.0],
                [5.0, 5.0, 5.0],
            ],
            // one face in the xy plane, one in the xz plane sharing edge 0-1
            vec![[0, 1, 2], [0, 3, 1]],
        );
        mesh.compute_vertex_normals();
        let normals = mesh.vertex_normals().unwrap();

        assert_relative_eq!(normals[2][2], 1.0);
        assert_relative_eq!(normals[3][1], 1.0);
        let s = std::f64::consts::FRAC_1_SQRT_2;
        assert_relative_eq!(normals[0][1], s, epsilon = 1e-12);
        assert_relative_eq!(normals[0][2], s, epsilon = 1e-12);
        assert_eq!(normals[4], [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_remove_unreferenced_vertices() {
        let pointcloud = PointCloud::new(
            vec![[9.0; 3], [0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            Some(vec![[1, 1, 1], [2, 2, 2], [3, 3, 3], [4, 4, 4]]),
            None,
        );
        let mut mesh = TriangleMesh::from_point_cloud_and_triangles(&pointcloud, vec![[1, 2, 3]]);
        mesh.remove_unreferenced_vertices();

        assert_eq!(mesh.num_vertices(), 3);
        assert_eq!(mesh.triangles(), &[[0, 1, 2]]);
        assert_eq!(mesh.vertices()[0], [0.0, 0.0, 0.0]);
        assert_eq!(mesh.vertex_colors().unwrap(), &[[2, 2, 2], [3, 3, 3], [4, 4, 4]]);
    }
}
