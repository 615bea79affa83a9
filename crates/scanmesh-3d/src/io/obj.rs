use std::io::{BufWriter, Write};
use std::path::Path;

use crate::mesh::TriangleMesh;

/// Error types for the OBJ module.
#[derive(Debug, thiserror::Error)]
pub enum ObjError {
    /// Failed to write OBJ file
    #[error("Failed to write OBJ file")]
    Io(#[from] std::io::Error),
}

/// Write a triangle mesh as a Wavefront OBJ file.
///
/// Vertex colors are written as `v x y z r g b` with components in `[0, 1]`.
/// When the mesh has vertex normals, faces reference them with the `a//a`
/// syntax. Indices are 1-based.
pub fn write_obj(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<(), ObjError> {
    let file = std::fs::File::create(path)?;
    let mut writer = BufWriter::new(file);
    write_obj_to(&mut writer, mesh)?;
    writer.flush()?;
    Ok(())
}

fn write_obj_to<W: Write>(w: &mut W, mesh: &TriangleMesh) -> Result<(), ObjError> {
    writeln!(w, "# scanmesh")?;
    writeln!(
        w,
        "# {} vertices, {} triangles",
        mesh.num_vertices(),
        mesh.num_triangles()
    )?;

    let colors = mesh.vertex_colors();
    for (i, v) in mesh.vertices().iter().enumerate() {
        match colors.and_then(|c| c.get(i)) {
            Some(c) => writeln!(
                w,
                "v {} {} {} {} {} {}",
                v[0],
                v[1],
                v[2],
                c[0] as f64 / 255.0,
                c[1] as f64 / 255.0,
                c[2] as f64 / 255.0
            )?,
            None => writeln!(w, "v {} {} {}", v[0], v[1], v[2])?,
        }
    }

    let normals = mesh.vertex_normals();
    if let Some(normals) = normals {
        for n in normals {
            writeln!(w, "vn {} {} {}", n[0], n[1], n[2])?;
        }
    }

    for t in mesh.triangles() {
        let (a, b, c) = (t[0] + 1, t[1] + 1, t[2] + 1);
        if normals.is_some() {
            writeln!(w, "f {a}//{a} {b}//{b} {c}//{c}")?;
        } else {
            writeln!(w, "f {a} {b} {c}")?;
        }
    }

    Ok(())
}
