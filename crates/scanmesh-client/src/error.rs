use scanmesh_3d::io::ply::PlyError;
use scanmesh_3d::io::MeshWriteError;
use scanmesh_3d::normals::NormalsError;
use scanmesh_3d::reconstruction::ReconstructionError;

/// Errors of the client pipeline.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request could not be sent or its response decoded
    #[error("Request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The server answered with an error status
    #[error("{message} (HTTP {status})")]
    Server {
        /// HTTP status code.
        status: u16,
        /// Message reported by the server.
        message: String,
    },

    /// The server response names no file
    #[error("Invalid server response: {0}")]
    InvalidResponse(String),

    /// Reading or writing a local file failed
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The downloaded point cloud could not be parsed
    #[error(transparent)]
    Ply(#[from] PlyError),

    /// Normal estimation of the downloaded cloud failed
    #[error(transparent)]
    Normals(#[from] NormalsError),

    /// Local re-meshing failed
    #[error(transparent)]
    Reconstruction(#[from] ReconstructionError),

    /// The OBJ or STL export failed
    #[error(transparent)]
    Mesh(#[from] MeshWriteError),

    /// The preview image could not be encoded
    #[error("Failed to write preview: {0}")]
    Image(#[from] image::ImageError),

    /// The ZIP bundle could not be written
    #[error("Failed to write archive: {0}")]
    Zip(#[from] zip::result::ZipError),
}
