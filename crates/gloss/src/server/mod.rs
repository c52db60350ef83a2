//! HTTP API server.
//!
//! | Method | Path             | Handler                 |
//! |--------|------------------|-------------------------|
//! | GET    | `/health`        | [`routes::health`]      |
//! | POST   | `/upload`        | [`routes::upload`]      |
//! | POST   | `/beautify/:id`  | [`routes::beautify`]    |
//! | GET    | `/images/:id`    | [`routes::get_image`]   |

mod error;
mod routes;

use anyhow::Context;
use axum::extract::DefaultBodyLimit;
use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use gloss_core::config::ServerConfig;
use gloss_core::Pipeline;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Application state shared across handlers.
pub struct AppState {
    pub pipeline: Pipeline,
}

/// Build the router with CORS, tracing and the upload size limit applied.
pub fn router(state: Arc<AppState>, config: &ServerConfig) -> anyhow::Result<Router> {
    let origin = HeaderValue::from_str(&config.allowed_origin)
        .with_context(|| format!("Invalid allowed origin: {}", config.allowed_origin))?;
    let body_limit = (config.max_upload_mb as usize).saturating_mul(1024 * 1024);

    let cors = CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::CONTENT_TYPE]);

    Ok(Router::new()
        .route("/health", get(routes::health))
        .route("/upload", post(routes::upload))
        .route("/beautify/:id", post(routes::beautify))
        .route("/images/:id", get(routes::get_image))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state))
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::extract::{Multipart, State};
    use axum::http::{Request, StatusCode};
    use axum::Json;
    use gloss_core::config::{LimitsConfig, TransformConfig};
    use gloss_core::error::UpstreamError;
    use gloss_core::normalize::data_uri;
    use gloss_core::store::MemoryStore;
    use gloss_core::transform::{EditRequest, EditResponse, ImageEditor};
    use gloss_core::error::ClientError;
    use gloss_core::session::Backend;
    use gloss_core::{ApiClient, ImageEditorFactory, ImageId, ImageStore};
    use serde_json::Value;
    use std::io::Cursor;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Mutex;
    use std::time::Duration;
    use tower::ServiceExt;

    const BOUNDARY: &str = "gloss-test-boundary";

    /// Editor that must never be reached.
    struct UnreachableEditor;

    #[async_trait]
    impl ImageEditor for UnreachableEditor {
        fn name(&self) -> &str {
            "unreachable"
        }

        async fn edit(&self, _request: &EditRequest) -> Result<EditResponse, UpstreamError> {
            Err(UpstreamError::Transport("editor should not be called".into()))
        }

        fn timeout(&self) -> Duration {
            Duration::from_secs(1)
        }
    }

    fn encoded(format: image::ImageFormat, width: u32, height: u32) -> Vec<u8> {
        let img = image::RgbImage::from_fn(width, height, |x, y| {
            image::Rgb([(x * 5) as u8, (y * 7) as u8, 90])
        });
        let mut buffer = Cursor::new(Vec::new());
        image::DynamicImage::ImageRgb8(img)
            .write_to(&mut buffer, format)
            .unwrap();
        buffer.into_inner()
    }

    fn app_with(editor: Arc<dyn ImageEditor>, server: &ServerConfig) -> (Router, Arc<dyn ImageStore>) {
        let store: Arc<dyn ImageStore> = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(
            store.clone(),
            editor,
            LimitsConfig::default(),
            &TransformConfig::default(),
        );
        let app = router(Arc::new(AppState { pipeline }), server).unwrap();
        (app, store)
    }

    fn app() -> (Router, Arc<dyn ImageStore>) {
        app_with(Arc::new(UnreachableEditor), &ServerConfig::default())
    }

    fn multipart_request(field: &str, file_name: &str, bytes: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; \
             filename=\"{file_name}\"\r\nContent-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::post("/upload")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    fn empty_post(uri: &str) -> Request<Body> {
        Request::post(uri).body(Body::empty()).unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }

    async fn upload_jpeg(app: &Router) -> ImageId {
        let jpeg = encoded(image::ImageFormat::Jpeg, 40, 30);
        let (status, body) = send(app, multipart_request("image", "product-x.jpg", &jpeg)).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        body["id"].as_str().unwrap().parse().unwrap()
    }

    // --- Fake image-edit API ---

    #[derive(Default)]
    struct FakeUpstream {
        calls: AtomicU32,
        /// Delay applied to the first call only
        first_call_delay: Option<Duration>,
        /// Text fields, image file name and auth header of the last call
        seen: Mutex<Vec<(String, String)>>,
    }

    async fn fake_edit(
        State(fake): State<Arc<FakeUpstream>>,
        headers: axum::http::HeaderMap,
        mut multipart: Multipart,
    ) -> Json<Value> {
        let idx = fake.calls.fetch_add(1, Ordering::SeqCst);

        let mut seen = Vec::new();
        if let Some(auth) = headers.get(header::AUTHORIZATION) {
            seen.push(("authorization".into(), auth.to_str().unwrap().to_string()));
        }
        while let Some(field) = multipart.next_field().await.unwrap() {
            let name = field.name().unwrap_or_default().to_string();
            if name == "image" {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content_type = field.content_type().unwrap_or_default().to_string();
                let bytes = field.bytes().await.unwrap();
                assert_eq!(image::guess_format(&bytes).unwrap(), image::ImageFormat::Png);
                seen.push(("image".into(), file_name));
                seen.push(("image content type".into(), content_type));
            } else {
                let value = field.text().await.unwrap();
                seen.push((name, value));
            }
        }
        *fake.seen.lock().unwrap() = seen;

        if idx == 0 {
            if let Some(delay) = fake.first_call_delay {
                tokio::time::sleep(delay).await;
            }
        }

        let png = encoded(image::ImageFormat::Png, 16, 16);
        let uri = data_uri("image/png", &png);
        let b64 = uri.trim_start_matches("data:image/png;base64,");
        Json(serde_json::json!({ "data": [ { "b64_json": b64 } ] }))
    }

    async fn spawn_fake_upstream(fake: Arc<FakeUpstream>) -> String {
        let app = Router::new()
            .route("/v1/images/edits", post(fake_edit))
            .with_state(fake);
        format!("{}/v1/images/edits", serve(app).await)
    }

    /// Serve `app` on an ephemeral port and return its base URL.
    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn openai_editor(endpoint: String, timeout_ms: u64) -> Arc<dyn ImageEditor> {
        ImageEditorFactory::create(&TransformConfig {
            endpoint,
            api_key: "sk-test".to_string(),
            timeout_ms,
            ..TransformConfig::default()
        })
        .unwrap()
    }

    // --- Tests ---

    #[tokio::test]
    async fn test_health() {
        let (app, _) = app();
        let request = Request::get("/health").body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "ok");
        assert_eq!(body["version"], gloss_core::VERSION);
    }

    #[tokio::test]
    async fn test_upload_jpeg_is_stored_as_png() {
        let (app, store) = app();
        let id = upload_jpeg(&app).await;

        let record = store.get(id).await.unwrap().unwrap();
        assert_eq!(record.name, "product-x.jpg");
        assert_eq!(record.img.content_type, "image/png");
        let decoded = image::load_from_memory(&record.img.data).unwrap();
        assert_eq!(decoded.color(), image::ColorType::Rgba8);

        let request = Request::get(format!("/images/{id}")).body(Body::empty()).unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["contentType"], "image/png");
        assert!(body["preview"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));
        assert!(body["derivedFrom"].is_null());
    }

    #[tokio::test]
    async fn test_upload_without_file_is_bad_request() {
        let (app, store) = app();
        let (status, body) = send(&app, multipart_request("other", "x.png", b"abc")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upload_without_multipart_body_is_json_bad_request() {
        let (app, store) = app();

        let (status, body) = send(&app, empty_post("/upload")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");

        let request = Request::post("/upload")
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(r#"{"image":"x"}"#))
            .unwrap();
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upload_undecodable_file_fails() {
        let (app, store) = app();
        let (status, body) =
            send(&app, multipart_request("image", "notes.txt", b"just some text")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to upload image");
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_upload_over_limit_is_rejected() {
        let server = ServerConfig {
            max_upload_mb: 1,
            ..ServerConfig::default()
        };
        let (app, store) = app_with(Arc::new(UnreachableEditor), &server);
        let big = vec![0u8; 2 * 1024 * 1024];
        let response = app
            .clone()
            .oneshot(multipart_request("image", "huge.png", &big))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_beautify_unknown_id_is_not_found() {
        let (app, store) = app();
        upload_jpeg(&app).await;

        for uri in [
            format!("/beautify/{}", ImageId::new()),
            "/beautify/nonexistent-id".to_string(),
        ] {
            let (status, body) = send(&app, empty_post(&uri)).await;
            assert_eq!(status, StatusCode::NOT_FOUND);
            assert_eq!(body["error"], "Image not found");
        }
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_beautify_through_image_edit_api() {
        let fake = Arc::new(FakeUpstream::default());
        let endpoint = spawn_fake_upstream(fake.clone()).await;
        let (app, store) = app_with(openai_editor(endpoint, 5_000), &ServerConfig::default());
        let source = upload_jpeg(&app).await;
        let before = store.get(source).await.unwrap().unwrap();

        let (status, body) = send(&app, empty_post(&format!("/beautify/{source}"))).await;
        assert_eq!(status, StatusCode::OK, "{body}");
        assert_eq!(body["message"], "Beautified image generated");
        assert!(body["image"]
            .as_str()
            .unwrap()
            .starts_with("data:image/png;base64,"));

        let derived_id: ImageId = body["imageId"].as_str().unwrap().parse().unwrap();
        assert_ne!(derived_id, source);
        let derived = store.get(derived_id).await.unwrap().unwrap();
        assert_eq!(derived.derived_from, Some(source));
        assert_eq!(store.get(source).await.unwrap().unwrap(), before);
        assert_eq!(store.count().await.unwrap(), 2);

        let seen = fake.seen.lock().unwrap().clone();
        let field = |name: &str| {
            seen.iter()
                .find(|(k, _)| k == name)
                .map(|(_, v)| v.clone())
                .unwrap_or_default()
        };
        assert_eq!(field("authorization"), "Bearer sk-test");
        assert_eq!(field("image"), "product-x.png");
        assert_eq!(field("image content type"), "image/png");
        assert_eq!(field("n"), "1");
        assert_eq!(field("size"), "1024x1024");
        assert_eq!(field("response_format"), "b64_json");
        assert!(field("prompt").contains("pure white"));
    }

    #[tokio::test]
    async fn test_upstream_timeout_then_retry() {
        let fake = Arc::new(FakeUpstream {
            first_call_delay: Some(Duration::from_secs(3)),
            ..FakeUpstream::default()
        });
        let endpoint = spawn_fake_upstream(fake.clone()).await;
        let (app, store) = app_with(openai_editor(endpoint, 200), &ServerConfig::default());
        let source = upload_jpeg(&app).await;

        let (status, body) = send(&app, empty_post(&format!("/beautify/{source}"))).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Beautify failed");
        assert!(body["details"].as_str().unwrap().contains("timed out"));
        assert_eq!(store.count().await.unwrap(), 1);

        // Same id is accepted again
        let (status, _) = send(&app, empty_post(&format!("/beautify/{source}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.count().await.unwrap(), 2);
        assert_eq!(fake.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_api_client_against_router() {
        let fake = Arc::new(FakeUpstream::default());
        let endpoint = spawn_fake_upstream(fake).await;
        let (app, store) = app_with(openai_editor(endpoint, 5_000), &ServerConfig::default());
        let client = ApiClient::new(&serve(app).await);

        assert_eq!(client.health().await.unwrap().status, "ok");

        let uploaded = client
            .upload("desk-lamp.jpg", encoded(image::ImageFormat::Jpeg, 24, 24))
            .await
            .unwrap();
        assert_eq!(uploaded.message, "Image uploaded");

        let beautified = client.beautify(uploaded.id).await.unwrap();
        assert_ne!(beautified.image_id, uploaded.id);
        let preview = beautified.image.unwrap();
        assert!(preview.starts_with("data:image/png;base64,"));

        let view = client.image(beautified.image_id).await.unwrap();
        assert_eq!(view.derived_from, Some(uploaded.id));
        assert_eq!(view.preview, preview);
        assert_eq!(store.count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_api_client_reads_error_bodies() {
        let fake = Arc::new(FakeUpstream {
            first_call_delay: Some(Duration::from_secs(3)),
            ..FakeUpstream::default()
        });
        let endpoint = spawn_fake_upstream(fake).await;
        let (app, _) = app_with(openai_editor(endpoint, 200), &ServerConfig::default());
        let client = ApiClient::new(&serve(app).await);

        let err = client
            .upload("notes.txt", b"just some text".to_vec())
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status: 500, ref message } if message == "Failed to upload image"
        ));

        let err = client.beautify(ImageId::new()).await.unwrap_err();
        assert!(matches!(
            err,
            ClientError::Status { status: 404, ref message } if message == "Image not found"
        ));

        let uploaded = client
            .upload("mug.png", encoded(image::ImageFormat::Png, 12, 12))
            .await
            .unwrap();
        match client.beautify(uploaded.id).await.unwrap_err() {
            ClientError::Status { status, message } => {
                assert_eq!(status, 500);
                assert!(message.starts_with("Beautify failed: "), "{message}");
                assert!(message.contains("timed out"), "{message}");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_api_client_fetches_missing_preview() {
        let derived = ImageId::new();
        let app = Router::new()
            .route(
                "/beautify/:id",
                post(move || async move {
                    Json(serde_json::json!({ "message": "ok", "imageId": derived }))
                }),
            )
            .route(
                "/images/:id",
                get(move || async move {
                    Json(serde_json::json!({
                        "id": derived,
                        "name": "beautified_1.png",
                        "contentType": "image/png",
                        "preview": "data:image/png;base64,AA==",
                        "createdAtMs": 1,
                    }))
                }),
            );
        let client = ApiClient::new(&serve(app).await);

        let body = client.beautify(ImageId::new()).await.unwrap();
        assert_eq!(body.image_id, derived);
        assert_eq!(body.image.as_deref(), Some("data:image/png;base64,AA=="));
    }

    #[tokio::test]
    async fn test_cors_allows_configured_origin() {
        let (app, _) = app();
        let request = Request::builder()
            .method(Method::OPTIONS)
            .uri("/upload")
            .header(header::ORIGIN, "http://localhost:8080")
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(Body::empty())
            .unwrap();
        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(
            response
                .headers()
                .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
                .unwrap(),
            "http://localhost:8080"
        );
    }

    #[test]
    fn test_invalid_origin_is_rejected() {
        let server = ServerConfig {
            allowed_origin: "bad\norigin".to_string(),
            ..ServerConfig::default()
        };
        let store: Arc<dyn ImageStore> = Arc::new(MemoryStore::new());
        let pipeline = Pipeline::new(
            store,
            Arc::new(UnreachableEditor),
            LimitsConfig::default(),
            &TransformConfig::default(),
        );
        assert!(router(Arc::new(AppState { pipeline }), &server).is_err());
    }
}
