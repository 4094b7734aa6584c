//! HTTP API layer with Axum routes.
//!
//! This crate provides:
//! - Upload, URL and delete routes over the configured storage client
//! - Health check
//! - Error-to-response mapping

pub mod error;
pub mod routes;

use std::sync::Arc;

use axum::{Router, extract::DefaultBodyLimit, response::Redirect, routing::get};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use depot_core::storage::{StorageClient, UploadSettings};

/// Room for multipart boundaries and headers on top of the file limit.
const MULTIPART_OVERHEAD: usize = 1024 * 1024;

/// Files accepted by one `POST /upload/files` request.
pub const MAX_FILES_PER_REQUEST: usize = 20;

/// Request body limits derived from the upload policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyLimits {
    /// Single-file routes and every other request.
    pub single: usize,
    /// Multi-file upload route.
    pub multi: usize,
}

impl BodyLimits {
    /// One file for single uploads, [`MAX_FILES_PER_REQUEST`] files for
    /// multi-file uploads, each with multipart overhead.
    #[must_use]
    pub fn from_settings(settings: &UploadSettings) -> Self {
        let file = usize::try_from(settings.max_file_size_bytes()).unwrap_or(usize::MAX);
        Self {
            single: file.saturating_add(MULTIPART_OVERHEAD),
            multi: file
                .saturating_mul(MAX_FILES_PER_REQUEST)
                .saturating_add(MULTIPART_OVERHEAD),
        }
    }
}

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    /// Storage client for the configured backend.
    pub uploader: Arc<StorageClient>,
}

/// Creates the main application router.
pub fn create_router(state: AppState) -> Router {
    let limits = BodyLimits::from_settings(state.uploader.settings());

    Router::new()
        .route("/", get(|| async { Redirect::to("/api/v1/system/health") }))
        .nest("/api/v1", routes::api_routes(limits))
        .layer(DefaultBodyLimit::max(limits.single))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
    };
    use depot_core::storage::{BackendConfig, FilenameStrategy, create_client};
    use depot_shared::config::LocalConfig;
    use http_body_util::BodyExt;
    use serde_json::Value;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "depot-test-boundary";

    fn app() -> (Router, TempDir) {
        let tmp = tempfile::tempdir().expect("tempdir");
        let backend = BackendConfig::Local(LocalConfig {
            path: tmp.path().to_string_lossy().into_owned(),
            url_prefix: "http://localhost:8080/files".into(),
        });
        let settings = UploadSettings::new()
            .with_max_file_size_mb(1)
            .with_allowed_extensions([".txt", ".png"])
            .with_filename_strategy(FilenameStrategy::Original);
        let client = create_client(backend, settings).expect("client");
        let state = AppState {
            uploader: Arc::new(client),
        };
        (create_router(state), tmp)
    }

    fn multipart(field: &str, files: &[(&str, &[u8])]) -> Request<Body> {
        let mut body = Vec::new();
        for (filename, data) in files {
            body.extend_from_slice(
                format!(
                    "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{filename}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
                )
                .as_bytes(),
            );
            body.extend_from_slice(data);
            body.extend_from_slice(b"\r\n");
        }
        body.extend_from_slice(format!("--{BOUNDARY}--\r\n").as_bytes());

        let path = if field == "files" {
            "/api/v1/upload/files"
        } else {
            "/api/v1/upload/file"
        };
        Request::builder()
            .method("POST")
            .uri(path)
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request")
    }

    fn delete(key: &str) -> Request<Body> {
        Request::builder()
            .method("DELETE")
            .uri("/api/v1/upload/file")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "key": key }).to_string()))
            .expect("request")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder().uri(uri).body(Body::empty()).expect("request")
    }

    async fn json(response: axum::response::Response) -> Value {
        let bytes = response
            .into_body()
            .collect()
            .await
            .expect("body")
            .to_bytes();
        serde_json::from_slice(&bytes).expect("json body")
    }

    #[tokio::test]
    async fn test_health_reports_backend() {
        let (app, _tmp) = app();
        let response = app.oneshot(get("/api/v1/system/health")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["status"], "healthy");
        assert_eq!(body["service"], "depot");
        assert_eq!(body["backend"], "local");
    }

    #[tokio::test]
    async fn test_root_redirects_to_health() {
        let (app, _tmp) = app();
        let response = app.oneshot(get("/")).await.expect("response");
        assert!(response.status().is_redirection());
        assert_eq!(
            response.headers()[header::LOCATION],
            "/api/v1/system/health"
        );
    }

    #[tokio::test]
    async fn test_upload_single_file() {
        let (app, tmp) = app();
        let response = app
            .oneshot(multipart("file", &[("test.txt", b"0123456789")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["key"], "test.txt");
        assert_eq!(body["size"], 10);
        assert_eq!(body["mime_type"], "text/plain");
        assert_eq!(body["filename"], "test.txt");
        assert_eq!(body["url"], "http://localhost:8080/files/test.txt");
        assert_eq!(
            std::fs::read(tmp.path().join("test.txt")).expect("stored").len(),
            10
        );
    }

    #[tokio::test]
    async fn test_upload_rejected_extension() {
        let (app, tmp) = app();
        let response = app
            .oneshot(multipart("file", &[("run.exe", b"MZ")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "VALIDATION_ERROR");
        assert!(!tmp.path().join("run.exe").exists());
    }

    #[tokio::test]
    async fn test_upload_without_file_field() {
        let (app, _tmp) = app();
        let response = app
            .oneshot(multipart("attachment", &[("a.txt", b"a")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_upload_over_body_limit() {
        let (app, _tmp) = app();
        let big = vec![b'x'; 3 * 1024 * 1024];
        let response = app
            .oneshot(multipart("file", &[("big.txt", &big)]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn test_upload_multiple_files() {
        let (app, _tmp) = app();
        let response = app
            .oneshot(multipart(
                "files",
                &[("a.txt", b"a"), ("b.exe", b"b"), ("c.png", b"c")],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["success_count"], 2);
        assert_eq!(body["error_count"], 1);
        assert_eq!(body["results"][0]["key"], "a.txt");
        assert_eq!(body["results"][1]["key"], "c.png");
        assert!(
            body["errors"][0]
                .as_str()
                .expect("error message")
                .starts_with("b.exe")
        );
    }

    #[tokio::test]
    async fn test_upload_multiple_files_each_under_limit() {
        let (app, tmp) = app();
        let chunk = vec![b'x'; 900 * 1024];
        let chunk = chunk.as_slice();
        let response = app
            .oneshot(multipart(
                "files",
                &[("one.txt", chunk), ("two.txt", chunk), ("three.txt", chunk)],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["success_count"], 3);
        assert_eq!(body["error_count"], 0);
        assert_eq!(
            std::fs::read(tmp.path().join("three.txt")).expect("stored").len(),
            900 * 1024
        );
    }

    #[tokio::test]
    async fn test_upload_multiple_rejects_oversized_file() {
        let (app, _tmp) = app();
        let big = vec![b'x'; 1024 * 1024 + 1];
        let response = app
            .oneshot(multipart(
                "files",
                &[("small.txt", b"ok".as_slice()), ("big.txt", big.as_slice())],
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = json(response).await;
        assert_eq!(body["success_count"], 1);
        assert_eq!(body["error_count"], 1);
        assert!(
            body["errors"][0]
                .as_str()
                .expect("error message")
                .starts_with("big.txt")
        );
    }

    #[tokio::test]
    async fn test_upload_multiple_caps_file_count() {
        let (app, _tmp) = app();
        let files: Vec<(String, &[u8])> = (0..=MAX_FILES_PER_REQUEST)
            .map(|i| (format!("f{i}.txt"), b"x".as_slice()))
            .collect();
        let files: Vec<(&str, &[u8])> = files.iter().map(|(n, d)| (n.as_str(), *d)).collect();

        let response = app.oneshot(multipart("files", &files)).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn test_body_limits_from_settings() {
        let limits = BodyLimits::from_settings(&UploadSettings::new().with_max_file_size_mb(2));
        assert_eq!(limits.single, 3 * 1024 * 1024);
        assert_eq!(
            limits.multi,
            2 * 1024 * 1024 * MAX_FILES_PER_REQUEST + 1024 * 1024
        );
    }

    #[tokio::test]
    async fn test_delete_outside_root_rejected() {
        let (app, tmp) = app();
        let victim = tmp.path().join("victim.txt");
        std::fs::write(&victim, b"keep").expect("write");

        let response = app
            .clone()
            .oneshot(delete("nested/../../victim.txt"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json(response).await["error"], "BAD_REQUEST");
        assert!(victim.exists());

        let response = app
            .oneshot(get("/api/v1/upload/url?key=../victim.txt"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_empty_filename_is_bad_request() {
        let (app, _tmp) = app();
        let response = app
            .oneshot(multipart("file", &[("", b"abc")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_upload_multiple_without_errors_omits_error_list() {
        let (app, _tmp) = app();
        let response = app
            .oneshot(multipart("files", &[("a.txt", b"a")]))
            .await
            .expect("response");
        let body = json(response).await;
        assert_eq!(body["success_count"], 1);
        assert!(body.get("errors").is_none());
    }

    #[tokio::test]
    async fn test_get_url() {
        let (app, _tmp) = app();
        let response = app
            .clone()
            .oneshot(get("/api/v1/upload/url?key=a/b.png"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        let body = json(response).await;
        assert_eq!(body["url"], "http://localhost:8080/files/a/b.png");
        assert_eq!(body["key"], "a/b.png");

        let response = app.oneshot(get("/api/v1/upload/url")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_then_delete_again() {
        let (app, tmp) = app();
        let response = app
            .clone()
            .oneshot(multipart("file", &[("gone.txt", b"bye")]))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.clone().oneshot(delete("gone.txt")).await.expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json(response).await["deleted"], true);
        assert!(!tmp.path().join("gone.txt").exists());

        let response = app.clone().oneshot(delete("gone.txt")).await.expect("response");
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = app.oneshot(delete("")).await.expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
