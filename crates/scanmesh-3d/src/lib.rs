#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// I/O utilities for reading and writing 3D data.
pub mod io;

/// Triangle mesh type.
pub mod mesh;

/// Normal estimation and orientation.
pub mod normals;

/// Point cloud type.
pub mod pointcloud;

/// Surface reconstruction algorithms.
pub mod reconstruction;

mod spatial;
