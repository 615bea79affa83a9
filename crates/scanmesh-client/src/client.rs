use std::fs::File;
use std::path::{Path, PathBuf};

use reqwest::blocking::{multipart, Client};
use serde::Deserialize;

use crate::error::ClientError;

/// Body of a successful upload.
#[derive(Debug, Clone, Deserialize)]
pub struct UploadResponse {
    /// Status message of the server.
    pub message: String,
    /// Server path of the point cloud.
    pub ply_file: String,
    /// Server path of the mesh.
    pub mesh_file: String,
    /// Points in the point cloud.
    #[serde(default)]
    pub num_points: Option<usize>,
    /// Triangles in the mesh.
    #[serde(default)]
    pub num_triangles: Option<usize>,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: Option<String>,
}

/// Blocking client of the conversion service.
pub struct ServerClient {
    http: Client,
    base_url: String,
}

impl ServerClient {
    /// Create a client for the service at `base_url`.
    ///
    /// Conversions can take minutes, so requests have no timeout.
    pub fn new(base_url: &str) -> Result<Self, ClientError> {
        let http = Client::builder().timeout(None).build()?;
        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Upload an E57 file and wait for the conversion.
    pub fn upload(&self, path: &Path) -> Result<UploadResponse, ClientError> {
        let form = multipart::Form::new().file("file", path)?;
        let response = self
            .http
            .post(format!("{}/upload", self.base_url))
            .multipart(form)
            .send()?;

        let status = response.status();
        if status.is_success() {
            return Ok(response.json()?);
        }

        // the body may not even be JSON
        let message = response
            .json::<ErrorResponse>()
            .ok()
            .and_then(|body| body.error)
            .unwrap_or_else(|| "Upload failed".to_string());
        Err(ClientError::Server {
            status: status.as_u16(),
            message,
        })
    }

    /// Download `file_name` into `dir` and return the local path.
    pub fn download(&self, file_name: &str, dir: &Path) -> Result<PathBuf, ClientError> {
        let mut response = self
            .http
            .get(format!("{}/download/{}", self.base_url, file_name))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorResponse>()
                .ok()
                .and_then(|body| body.error)
                .unwrap_or_else(|| "Download failed".to_string());
            return Err(ClientError::Server {
                status: status.as_u16(),
                message,
            });
        }

        let dest = dir.join(file_name);
        let mut file = File::create(&dest)?;
        response.copy_to(&mut file)?;
        Ok(dest)
    }
}

/// Base name of a path reported by the server.
pub fn remote_file_name(server_path: &str) -> Option<&str> {
    server_path
        .rsplit(['/', '\\'])
        .next()
        .filter(|name| !name.is_empty() && *name != "..")
}
