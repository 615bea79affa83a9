use axum::extract::multipart::MultipartError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};

use crate::convert::ConvertError;

/// Errors returned by the HTTP handlers as `{"error": <message>}`.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The upload has no `file` field
    #[error("No file provided")]
    NoFile,

    /// The `file` field has an empty file name
    #[error("No selected file")]
    NoSelectedFile,

    /// The requested download does not exist
    #[error("File not found")]
    NotFound,

    /// Malformed multipart body
    #[error(transparent)]
    Multipart(#[from] MultipartError),

    /// The conversion failed
    #[error(transparent)]
    Convert(#[from] ConvertError),

    /// Failed to store or read a file
    #[error(transparent)]
    Io(#[from] std::io::Error),

    /// The conversion task panicked or was cancelled
    #[error("Conversion task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NoFile | ApiError::NoSelectedFile => StatusCode::BAD_REQUEST,
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Multipart(err) => err.status(),
            ApiError::Convert(ConvertError::TooSparse { .. }) => StatusCode::BAD_REQUEST,
            ApiError::Convert(ConvertError::InvalidFileName(_)) => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            log::error!("❌ {}", self);
        } else {
            log::warn!("⚠️ {}", self);
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}
