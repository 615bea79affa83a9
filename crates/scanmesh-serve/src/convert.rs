use std::path::{Path, PathBuf};

use scanmesh_3d::io::e57::{read_e57, E57Error, E57ReadOptions};
use scanmesh_3d::io::ply::{write_ply_pointcloud, PlyError};
use scanmesh_3d::io::{write_mesh, MeshFormat, MeshWriteError};
use scanmesh_3d::normals::{estimate_normals, orient_normals_consistent_tangent_plane, NormalsError};
use scanmesh_3d::reconstruction::{create_from_point_cloud_ball_pivoting, ReconstructionError};
use serde::Serialize;

use crate::config::{ConversionParams, Storage};

/// Error types for the scan conversion.
#[derive(Debug, thiserror::Error)]
pub enum ConvertError {
    /// The scan has fewer points than required
    #[error("Point cloud is too sparse for meshing")]
    TooSparse {
        /// Points in the scan.
        num_points: usize,
        /// Points required.
        min_points: usize,
    },

    /// The upload name has no usable file name
    #[error("Invalid file name: {0:?}")]
    InvalidFileName(String),

    /// Failed to read the E57 file
    #[error(transparent)]
    E57(#[from] E57Error),

    /// Failed to estimate or orient the normals
    #[error(transparent)]
    Normals(#[from] NormalsError),

    /// Failed to write the point cloud
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Failed to reconstruct the surface
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    /// Failed to write the mesh
    #[error(transparent)]
    Mesh(#[from] MeshWriteError),
}

/// Files and statistics produced by [`convert_scan`].
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutput {
    /// The point cloud with normals.
    pub ply_file: PathBuf,
    /// The reconstructed mesh.
    pub mesh_file: PathBuf,
    /// Points in the point cloud.
    pub num_points: usize,
    /// Triangles in the mesh.
    pub num_triangles: usize,
}

/// Convert an E57 scan into a PLY point cloud with normals and an OBJ mesh.
///
/// `file_name` is the name the scan was uploaded with, the outputs are named
/// after it with the extension replaced.
pub fn convert_scan(
    e57_path: &Path,
    file_name: &str,
    params: &ConversionParams,
    storage: &Storage,
) -> Result<ConversionOutput, ConvertError> {
    let name = Path::new(file_name);
    if name.file_name().is_none() {
        return Err(ConvertError::InvalidFileName(file_name.to_string()));
    }

    let options = E57ReadOptions {
        scan: params.scan,
        ..Default::default()
    };
    let mut pointcloud = read_e57(e57_path, &options)?;
    log::info!("📖 Read {} points from {}", pointcloud.len(), file_name);

    if pointcloud.len() < params.min_points {
        return Err(ConvertError::TooSparse {
            num_points: pointcloud.len(),
            min_points: params.min_points,
        });
    }

    estimate_normals(&mut pointcloud, params.normal_search)?;
    orient_normals_consistent_tangent_plane(&mut pointcloud, params.orient_k)?;

    let ply_file = storage.ply_dir.join(name.with_extension("ply"));
    write_ply_pointcloud(&ply_file, &pointcloud)?;
    log::info!("💾 Saved point cloud to {}", ply_file.display());

    let mesh = create_from_point_cloud_ball_pivoting(&pointcloud, &params.radii)?;
    if mesh.is_empty() {
        log::warn!("No triangles reconstructed for {}, check the ball radii", file_name);
    }

    let mesh_file = storage.mesh_dir.join(name.with_extension(MeshFormat::Obj.extension()));
    write_mesh(&mesh_file, &mesh, MeshFormat::Obj)?;
    log::info!(
        "💾 Saved mesh with {} triangles to {}",
        mesh.num_triangles(),
        mesh_file.display()
    );

    Ok(ConversionOutput {
        ply_file,
        mesh_file,
        num_points: pointcloud.len(),
        num_triangles: mesh.num_triangles(),
    })
}
