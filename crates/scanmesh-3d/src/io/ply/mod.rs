mod parser;
mod properties;
mod writer;

pub use parser::*;
pub use properties::*;
pub use writer::*;

/// Error types for the PLY module.
#[derive(Debug, thiserror::Error)]
pub enum PlyError {
    /// Failed to read or write PLY file
    #[error("Failed to read or write PLY file")]
    Io(#[from] std::io::Error),

    /// Failed to deserialize PLY file
    #[error("Failed to deserialize PLY file")]
    Deserialize(#[from] bincode::error::DecodeError),

    /// Unsupported PLY property
    #[error("Unsupported PLY property")]
    UnsupportedProperty,

    /// The header is not a binary little endian PLY header
    #[error("Unsupported PLY header: {0}")]
    UnsupportedHeader(String),

    /// A vertex record is shorter than its declared layout
    #[error("Truncated PLY vertex record")]
    TruncatedRecord,

    /// The face list stores vertex indices as 32-bit integers
    #[error("Vertex index {0} does not fit the PLY face list")]
    IndexOverflow(usize),
}
