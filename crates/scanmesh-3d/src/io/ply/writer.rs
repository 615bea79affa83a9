use std::io::{BufWriter, Write};
use std::path::Path;

use super::{PlyDataType, PlyError};
use crate::mesh::TriangleMesh;
use crate::pointcloud::PointCloud;

// Vertex attributes shared by point clouds and meshes.
struct VertexData<'a> {
    points: &'a [[f64; 3]],
    normals: Option<&'a [[f64; 3]]>,
    colors: Option<&'a [[u8; 3]]>,
}

impl VertexData<'_> {
    fn write_header<W: Write>(&self, w: &mut W) -> Result<(), PlyError> {
        let double = PlyDataType::Float64.name();
        let uchar = PlyDataType::UInt8.name();
        writeln!(w, "element vertex {}", self.points.len())?;
        for axis in ["x", "y", "z"] {
            writeln!(w, "property {double} {axis}")?;
        }
        if self.normals.is_some() {
            for axis in ["nx", "ny", "nz"] {
                writeln!(w, "property {double} {axis}")?;
            }
        }
        if self.colors.is_some() {
            for channel in ["red", "green", "blue"] {
                writeln!(w, "property {uchar} {channel}")?;
            }
        }
        Ok(())
    }

    fn write_body<W: Write>(&self, w: &mut W) -> Result<(), PlyError> {
        for (i, p) in self.points.iter().enumerate() {
            for v in p {
                w.write_all(&v.to_le_bytes())?;
            }
            if let Some(n) = self.normals.and_then(|normals| normals.get(i)) {
                for v in n {
                    w.write_all(&v.to_le_bytes())?;
                }
            }
            if let Some(c) = self.colors.and_then(|colors| colors.get(i)) {
                w.write_all(c)?;
            }
        }
        Ok(())
    }
}

fn write_preamble<W: Write>(w: &mut W) -> Result<(), PlyError> {
    writeln!(w, "ply")?;
    writeln!(w, "format binary_little_endian 1.0")?;
    writeln!(w, "comment Created by scanmesh")?;
    Ok(())
}

/// Write a point cloud as a binary little endian PLY file.
///
/// Positions and normals are stored as doubles and colors as `uchar`. Normals
/// and colors are only written when the cloud has one per point.
pub fn write_ply_pointcloud(path: impl AsRef<Path>, pointcloud: &PointCloud) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut w = BufWriter::new(file);

    let vertices = VertexData {
        points: pointcloud.points(),
        normals: pointcloud
            .normals()
            .filter(|n| n.len() == pointcloud.len())
            .map(|n| n.as_slice()),
        colors: pointcloud
            .colors()
            .filter(|c| c.len() == pointcloud.len())
            .map(|c| c.as_slice()),
    };

    write_preamble(&mut w)?;
    vertices.write_header(&mut w)?;
    writeln!(w, "end_header")?;
    vertices.write_body(&mut w)?;
    w.flush()?;
    Ok(())
}

/// Write a triangle mesh as a binary little endian PLY file.
///
/// The vertex element follows [`write_ply_pointcloud`], faces are stored as
/// `property list uchar int vertex_indices`.
pub fn write_ply_mesh(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<(), PlyError> {
    let file = std::fs::File::create(path)?;
    let mut w = BufWriter::new(file);

    let n = mesh.num_vertices();
    let vertices = VertexData {
        points: mesh.vertices(),
        normals: mesh.vertex_normals().filter(|v| v.len() == n),
        colors: mesh.vertex_colors().filter(|v| v.len() == n),
    };

    write_preamble(&mut w)?;
    vertices.write_header(&mut w)?;
    writeln!(w, "element face {}", mesh.num_triangles())?;
    writeln!(w, "property list uchar int vertex_indices")?;
    writeln!(w, "end_header")?;
    vertices.write_body(&mut w)?;

    for t in mesh.triangles() {
        w.write_all(&[3u8])?;
        for &v in t {
            let index = i32::try_from(v).map_err(|_| PlyError::IndexOverflow(v))?;
            w.write_all(&index.to_le_bytes())?;
        }
    }

    w.flush()?;
    Ok(())
}
