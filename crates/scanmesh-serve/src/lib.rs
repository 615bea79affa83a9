#![deny(missing_docs)]
#![doc = env!("CARGO_PKG_DESCRIPTION")]

/// Command line and conversion parameters.
pub mod config;

/// Scan to point cloud and mesh conversion.
pub mod convert;

/// HTTP error responses.
pub mod error;

/// HTTP routes.
pub mod routes;

pub use routes::{app, AppState};
