use std::io::{BufWriter, Write};
use std::path::Path;

use crate::mesh::TriangleMesh;

/// The solid name used in the file header.
const SOLID_NAME: &str = "scanmesh";

/// Size in bytes of a single facet record in binary STL.
const FACET_SIZE: usize = 4 * 3 * 4 + 2;

/// Error types for the STL module.
#[derive(Debug, thiserror::Error)]
pub enum StlError {
    /// Failed to write STL file
    #[error("Failed to write STL file")]
    Io(#[from] std::io::Error),

    /// Binary STL stores the facet count as u32
    #[error("Too many triangles for binary STL: {0}")]
    TooManyTriangles(usize),
}

/// The encoding of an STL file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StlEncoding {
    /// Compact binary encoding.
    #[default]
    Binary,
    /// Human readable ASCII encoding.
    Ascii,
}

/// Write a triangle mesh as an STL file.
///
/// STL has no shared vertices: every facet stores its three corners and its
/// unit normal in single precision.
pub fn write_stl(
    path: impl AsRef<Path>,
    mesh: &TriangleMesh,
    encoding: StlEncoding,
) -> Result<(), StlError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    match encoding {
        StlEncoding::Binary => write_stl_binary(&mut writer, mesh)?,
        StlEncoding::Ascii => write_stl_ascii(&mut writer, mesh)?,
    }
    writer.flush()?;
    Ok(())
}

fn facets(mesh: &TriangleMesh) -> impl Iterator<Item = ([f32; 3], [[f32; 3]; 3])> + '_ {
    let vertices = mesh.vertices();
    mesh.triangle_normals()
        .into_iter()
        .zip(mesh.triangles())
        .map(move |(n, t)| {
            let corner = |i: usize| {
                let v = vertices[t[i]];
                [v[0] as f32, v[1] as f32, v[2] as f32]
            };
            (
                [n[0] as f32, n[1] as f32, n[2] as f32],
                [corner(0), corner(1), corner(2)],
            )
        })
}

fn write_stl_binary<W: Write>(w: &mut W, mesh: &TriangleMesh) -> Result<(), StlError> {
    let num_triangles = u32::try_from(mesh.num_triangles())
        .map_err(|_| StlError::TooManyTriangles(mesh.num_triangles()))?;

    // 80 byte header that must not begin with "solid".
    let signature = format!("binary STL {SOLID_NAME}");
    let mut header = [b' '; 80];
    header[..signature.len()].copy_from_slice(signature.as_bytes());
    w.write_all(&header)?;
    w.write_all(&num_triangles.to_le_bytes())?;

    let mut buf = [0u8; FACET_SIZE];
    for (normal, corners) in facets(mesh) {
        let values = normal.iter().chain(corners.iter().flatten());
        for (chunk, value) in buf.chunks_exact_mut(4).zip(values) {
            chunk.copy_from_slice(&value.to_le_bytes());
        }
        // attribute byte count
        buf[48..50].copy_from_slice(&0u16.to_le_bytes());
        w.write_all(&buf)?;
    }

    Ok(())
}

fn write_stl_ascii<W: Write>(w: &mut W, mesh: &TriangleMesh) -> Result<(), StlError> {
    writeln!(w, "solid {SOLID_NAME}")?;
    for (n, corners) in facets(mesh) {
        writeln!(w, "  facet normal {:e} {:e} {:e}", n[0], n[1], n[2])?;
        writeln!(w, "    outer loop")?;
        for v in corners {
            writeln!(w, "      vertex {:e} {:e} {:e}", v[0], v[1], v[2])?;
        }
        writeln!(w, "    endloop")?;
        writeln!(w, "  endfacet")?;
    }
    writeln!(w, "endsolid {SOLID_NAME}")?;
    Ok(())
}
