mod ball_pivoting;
pub use ball_pivoting::create_from_point_cloud_ball_pivoting;

/// Error types for surface reconstruction.
#[derive(Debug, thiserror::Error)]
pub enum ReconstructionError {
    /// The point cloud has no normals
    #[error("Point cloud has no normals, estimate them first")]
    MissingNormals,

    /// The ball radii are empty or not positive
    #[error("Invalid ball radii: {0}")]
    InvalidRadii(String),
}
