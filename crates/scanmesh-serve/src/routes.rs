use std::path::Path;
use std::sync::Arc;

use axum::{
    extract::{DefaultBodyLimit, Multipart, Path as UrlPath, State},
    http::header,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use tokio::io::AsyncWriteExt;
use tower_http::cors::CorsLayer;

use crate::config::{ConversionParams, Storage};
use crate::convert::convert_scan;
use crate::error::ApiError;

/// State shared by the handlers.
#[derive(Debug, Clone)]
pub struct AppState {
    inner: Arc<AppConfig>,
}

#[derive(Debug)]
struct AppConfig {
    params: ConversionParams,
    storage: Storage,
    max_upload_bytes: usize,
}

impl AppState {
    /// Create the state. The storage directories must exist.
    pub fn new(params: ConversionParams, storage: Storage, max_upload_bytes: usize) -> Self {
        Self {
            inner: Arc::new(AppConfig {
                params,
                storage,
                max_upload_bytes,
            }),
        }
    }
}

/// Build the application router.
pub fn app(state: AppState) -> Router {
    let limit = state.inner.max_upload_bytes;
    Router::new()
        .route("/", get(|| async { "Welcome to scanmesh!" }))
        .route("/upload", post(upload))
        .route("/download/:filename", get(download))
        .layer(DefaultBodyLimit::max(limit))
        .layer(CorsLayer::permissive())
        .with_state(state)
}

// Keep only the last path component of a client supplied name.
fn sanitize_file_name(name: &str) -> Option<String> {
    let base = name.rsplit(['/', '\\']).next().unwrap_or_default();
    match base {
        "" | "." | ".." => None,
        base => Some(base.to_string()),
    }
}

fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty() && name != "." && !name.contains(['/', '\\']) && !name.contains("..")
}

async fn upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<serde_json::Value>, ApiError> {
    let mut saved = None;
    while let Some(mut field) = multipart.next_field().await? {
        if field.name() != Some("file") {
            continue;
        }
        // a part without filename is a plain form value, not a file
        let Some(raw_name) = field.file_name() else {
            return Err(ApiError::NoFile);
        };
        let Some(file_name) = sanitize_file_name(raw_name) else {
            return Err(ApiError::NoSelectedFile);
        };

        let path = state.inner.storage.upload_dir.join(&file_name);
        let mut file = tokio::fs::File::create(&path).await?;
        let mut size = 0usize;
        while let Some(chunk) = field.chunk().await? {
            size += chunk.len();
            file.write_all(&chunk).await?;
        }
        file.flush().await?;

        log::info!("📥 Received {} ({} bytes)", file_name, size);
        saved = Some((path, file_name));
        break;
    }

    let Some((path, file_name)) = saved else {
        return Err(ApiError::NoFile);
    };

    let output = tokio::task::spawn_blocking(move || {
        let config = &state.inner;
        convert_scan(&path, &file_name, &config.params, &config.storage)
    })
    .await??;

    log::info!(
        "🔥 Converted {} points into {} triangles",
        output.num_points,
        output.num_triangles
    );

    Ok(Json(serde_json::json!({
        "message": "File converted successfully",
        "ply_file": output.ply_file,
        "mesh_file": output.mesh_file,
        "num_points": output.num_points,
        "num_triangles": output.num_triangles,
    })))
}

async fn download(
    State(state): State<AppState>,
    UrlPath(filename): UrlPath<String>,
) -> Result<Response, ApiError> {
    if !is_plain_file_name(&filename) {
        return Err(ApiError::NotFound);
    }

    let storage = &state.inner.storage;
    for dir in [&storage.ply_dir, &storage.mesh_dir] {
        let path = dir.join(&filename);
        if !is_file(&path).await {
            continue;
        }
        let bytes = tokio::fs::read(&path).await?;
        log::info!("📤 Sending {}", path.display());
        let headers = [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=\"{filename}\""),
            ),
        ];
        return Ok((headers, bytes).into_response());
    }

    Err(ApiError::NotFound)
}

async fn is_file(path: &Path) -> bool {
    tokio::fs::metadata(path)
        .await
        .map(|m| m.is_file())
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::tests::{test_params, write_grid_scan};
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    const BOUNDARY: &str = "scanmesh-test-boundary";

    fn test_app(root: &Path) -> (Router, Storage) {
        let storage = Storage::under(root);
        storage.create_dirs().unwrap();
        let state = AppState::new(test_params(), storage.clone(), 16 * 1024 * 1024);
        (app(state), storage)
    }

    fn multipart_body(field: &str, file_name: &str, data: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());
        body
    }

    fn form_value_body(field: &str, value: &str) -> Vec<u8> {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n--{BOUNDARY}--\r\n"
        )
        .into_bytes()
    }

    fn upload_request(body: Vec<u8>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn test_sanitize_file_name() {
        assert_eq!(sanitize_file_name("scan.e57").as_deref(), Some("scan.e57"));
        assert_eq!(sanitize_file_name("../../etc/scan.e57").as_deref(), Some("scan.e57"));
        assert_eq!(sanitize_file_name("C:\\data\\scan.e57").as_deref(), Some("scan.e57"));
        assert_eq!(sanitize_file_name(""), None);
        assert_eq!(sanitize_file_name("dir/"), None);
        assert_eq!(sanitize_file_name(".."), None);
    }

    #[tokio::test]
    async fn test_welcome() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let response = app
            .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_upload_without_file() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let response = app
            .oneshot(upload_request(multipart_body("other", "scan.e57", b"data")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_upload_empty_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let response = app
            .oneshot(upload_request(multipart_body("file", "", b"data")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No selected file");
    }

    #[tokio::test]
    async fn test_upload_file_field_without_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        let response = app
            .oneshot(upload_request(form_value_body("file", "scan.e57")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(response).await["error"], "No file provided");
    }

    #[tokio::test]
    async fn test_upload_invalid_scan() {
        let dir = tempfile::tempdir().unwrap();
        let (app, storage) = test_app(dir.path());
        let response = app
            .oneshot(upload_request(multipart_body("file", "broken.e57", b"not a scan")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(json_body(response).await["error"].is_string());
        // the upload is kept byte for byte
        assert_eq!(
            std::fs::read(storage.upload_dir.join("broken.e57")).unwrap(),
            b"not a scan"
        );
    }

    #[tokio::test]
    async fn test_upload_too_sparse() {
        let dir = tempfile::tempdir().unwrap();
        let scan = dir.path().join("small.e57");
        write_grid_scan(&scan, 3, 0.01);
        let data = std::fs::read(&scan).unwrap();

        let (app, _) = test_app(dir.path());
        let response = app
            .oneshot(upload_request(multipart_body("file", "small.e57", &data)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            json_body(response).await["error"],
            "Point cloud is too sparse for meshing"
        );
    }

    #[tokio::test]
    async fn test_upload_then_download() {
        let dir = tempfile::tempdir().unwrap();
        let scan = dir.path().join("source.e57");
        write_grid_scan(&scan, 10, 0.01);
        let data = std::fs::read(&scan).unwrap();

        let (app, storage) = test_app(dir.path());
        let response = app
            .clone()
            .oneshot(upload_request(multipart_body("file", "plane.e57", &data)))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = json_body(response).await;
        assert_eq!(json["message"], "File converted successfully");
        assert_eq!(json["num_points"], 100);
        assert!(json["num_triangles"].as_u64().unwrap() > 0);
        assert_eq!(
            json["ply_file"].as_str().unwrap(),
            storage.ply_dir.join("plane.ply").to_str().unwrap()
        );

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/download/plane.ply")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"plane.ply\""
        );
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        assert_eq!(bytes.as_ref(), std::fs::read(storage.ply_dir.join("plane.ply")).unwrap());

        // meshes are found in the second directory
        let response = app
            .oneshot(
                Request::builder()
                    .uri("/download/plane.obj")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_download_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let (app, _) = test_app(dir.path());
        for uri in ["/download/missing.ply", "/download/..%2Fsecret"] {
            let response = app
                .clone()
                .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::NOT_FOUND);
            assert_eq!(json_body(response).await["error"], "File not found");
        }
    }
}
