use std::path::{Path, PathBuf};
use std::str::FromStr;

use scanmesh_3d::io::ply::read_ply_binary;
use scanmesh_3d::io::{write_mesh, MeshFormat};
use scanmesh_3d::mesh::TriangleMesh;
use scanmesh_3d::normals::{estimate_normals, orient_normals_consistent_tangent_plane, KdTreeSearchParam};
use scanmesh_3d::pointcloud::PointCloud;
use scanmesh_3d::reconstruction::create_from_point_cloud_ball_pivoting;

use crate::client::{remote_file_name, ServerClient};
use crate::colormap::ColorScheme;
use crate::error::ClientError;
use crate::preview::save_preview;

/// Format of the exported files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OutputFormat {
    /// Binary PLY point cloud as returned by the server.
    #[default]
    Ply,
    /// Wavefront OBJ mesh built locally.
    Obj,
    /// Binary STL mesh built locally.
    Stl,
    /// PLY files bundled into a single archive.
    Zip,
}

impl OutputFormat {
    fn mesh_format(&self) -> Option<MeshFormat> {
        match self {
            OutputFormat::Obj => Some(MeshFormat::Obj),
            OutputFormat::Stl => Some(MeshFormat::Stl),
            OutputFormat::Ply | OutputFormat::Zip => None,
        }
    }
}

impl FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "ply" => Ok(OutputFormat::Ply),
            "obj" => Ok(OutputFormat::Obj),
            "stl" => Ok(OutputFormat::Stl),
            "zip" => Ok(OutputFormat::Zip),
            other => Err(format!("unknown format '{other}', expected ply, obj, stl or zip")),
        }
    }
}

/// Settings shared by every scan of a run.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    /// Format of the exported files.
    pub format: OutputFormat,
    /// Color scale of the preview images.
    pub color_scheme: ColorScheme,
    /// Directory receiving downloads, exports and previews.
    pub output_dir: PathBuf,
    /// Ball radius of the local reconstruction.
    pub alpha: f64,
    /// Width and height of the preview in pixels.
    pub preview_size: u32,
}

/// Files written for one scan.
#[derive(Debug, Clone)]
pub struct ConvertedScan {
    /// The exported point cloud or mesh.
    pub file: PathBuf,
    /// The PNG preview of the point cloud.
    pub preview: PathBuf,
}

/// Mesh a downloaded point cloud with a single ball radius.
///
/// Normals are estimated first when the cloud has none.
pub fn remesh(pointcloud: &mut PointCloud, alpha: f64) -> Result<TriangleMesh, ClientError> {
    if !pointcloud.has_normals() {
        estimate_normals(pointcloud, KdTreeSearchParam::default())?;
        orient_normals_consistent_tangent_plane(pointcloud, 100)?;
    }

    let mut mesh = create_from_point_cloud_ball_pivoting(pointcloud, &[alpha])?;
    if mesh.is_empty() {
        log::warn!("No triangles for radius {}, try a larger --alpha", alpha);
    }
    mesh.compute_vertex_normals();
    Ok(mesh)
}

/// Upload one scan, fetch the converted point cloud and export it.
pub fn process_scan(
    client: &ServerClient,
    path: &Path,
    options: &PipelineOptions,
) -> Result<ConvertedScan, ClientError> {
    let response = client.upload(path)?;
    log::info!(
        "🎉 {}: {} ({} points, {} triangles)",
        path.display(),
        response.message,
        response.num_points.unwrap_or_default(),
        response.num_triangles.unwrap_or_default()
    );
    log::debug!("Server mesh stored at {}", response.mesh_file);

    let name = remote_file_name(&response.ply_file)
        .ok_or_else(|| ClientError::InvalidResponse(response.ply_file.clone()))?;
    let ply_path = client.download(name, &options.output_dir)?;
    let mut pointcloud = read_ply_binary(&ply_path)?;

    let file = match options.format.mesh_format() {
        Some(format) => {
            let mesh = remesh(&mut pointcloud, options.alpha)?;
            let out = ply_path.with_extension(format.extension());
            write_mesh(&out, &mesh, format)?;
            log::info!("💾 Wrote {} triangles to {}", mesh.num_triangles(), out.display());
            out
        }
        None => ply_path.clone(),
    };

    let stem = Path::new(name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| name.to_string());
    let preview = options.output_dir.join(format!("{stem}_preview.png"));
    save_preview(
        &preview,
        pointcloud.points(),
        options.color_scheme,
        options.preview_size,
    )?;

    Ok(ConvertedScan { file, preview })
}
