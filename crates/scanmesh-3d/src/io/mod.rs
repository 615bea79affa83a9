use std::path::Path;

use crate::mesh::TriangleMesh;

/// E57 reader module.
pub mod e57;

/// OBJ writer module.
pub mod obj;

/// PLY reader and writer module.
pub mod ply;

/// STL writer module.
pub mod stl;

/// Mesh file formats that can be written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MeshFormat {
    /// Binary little endian PLY.
    Ply,
    /// Wavefront OBJ.
    Obj,
    /// Binary STL.
    Stl,
}

impl MeshFormat {
    /// Guess the format from a file extension, case insensitive.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "ply" => Some(MeshFormat::Ply),
            "obj" => Some(MeshFormat::Obj),
            "stl" => Some(MeshFormat::Stl),
            _ => None,
        }
    }

    /// The file extension of the format, without the dot.
    pub fn extension(&self) -> &'static str {
        match self {
            MeshFormat::Ply => "ply",
            MeshFormat::Obj => "obj",
            MeshFormat::Stl => "stl",
        }
    }
}

/// Error types for writing meshes.
#[derive(Debug, thiserror::Error)]
pub enum MeshWriteError {
    /// The path has no extension matching a known mesh format.
    #[error("Unknown mesh format for path: {0}")]
    UnknownFormat(String),

    /// Failed to write PLY file.
    #[error(transparent)]
    Ply(#[from] ply::PlyError),

    /// Failed to write OBJ file.
    #[error(transparent)]
    Obj(#[from] obj::ObjError),

    /// Failed to write STL file.
    #[error(transparent)]
    Stl(#[from] stl::StlError),
}

/// Write a mesh in the given format.
pub fn write_mesh(
    path: impl AsRef<Path>,
    mesh: &TriangleMesh,
    format: MeshFormat,
) -> Result<(), MeshWriteError> {
    match format {
        MeshFormat::Ply => ply::write_ply_mesh(path, mesh)?,
        MeshFormat::Obj => obj::write_obj(path, mesh)?,
        MeshFormat::Stl => stl::write_stl(path, mesh, stl::StlEncoding::Binary)?,
    }
    Ok(())
}

/// Write a mesh, picking the format from the file extension.
pub fn write_triangle_mesh(path: impl AsRef<Path>, mesh: &TriangleMesh) -> Result<(), MeshWriteError> {
    let path = path.as_ref();
    let format = path
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(MeshFormat::from_extension)
        .ok_or_else(|| MeshWriteError::UnknownFormat(path.display().to_string()))?;
    write_mesh(path, mesh, format)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(MeshFormat::from_extension("PLY"), Some(MeshFormat::Ply));
        assert_eq!(MeshFormat::from_extension("obj"), Some(MeshFormat::Obj));
        assert_eq!(MeshFormat::from_extension("Stl"), Some(MeshFormat::Stl));
        assert_eq!(MeshFormat::from_extension("e57"), None);
        assert_eq!(MeshFormat::Stl.extension(), "stl");
    }

    #[test]
    fn test_write_triangle_mesh_dispatch() {
        let dir = tempfile::tempdir().unwrap();
        let mesh = TriangleMesh::new(
            vec![[0.0, 0.0, 0.0], [1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
            vec![[0, 1, 2]],
        );

        let obj_path = dir.path().join("tri.obj");
        write_triangle_mesh(&obj_path, &mesh).unwrap();
        let text = std::fs::read_to_string(&obj_path).unwrap();
        assert!(text.contains("f 1 2 3"));

        let stl_path = dir.path().join("tri.STL");
        write_triangle_mesh(&stl_path, &mesh).unwrap();
        assert_eq!(std::fs::metadata(&stl_path).unwrap().len(), 84 + 50);

        let bad = write_triangle_mesh(dir.path().join("tri.xyz"), &mesh);
        assert!(matches!(bad, Err(MeshWriteError::UnknownFormat(_))));
    }
}
