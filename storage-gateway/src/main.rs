use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use std::{net::SocketAddr, sync::Arc};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::info;

mod config;
mod error;
mod handlers;
mod models;
mod storage;

use config::Config;
use storage::{S3Store, StorageGateway};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<StorageGateway>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    info!("Starting Storage Gateway...");

    // Fail fast: no request is served, and no store call is made, unless
    // the full store configuration is present.
    let config = Config::from_env().context("Configuration is incomplete")?;

    let store = S3Store::new(&config.storage).await;
    let gateway = StorageGateway::new(Arc::new(store), config.links.default_ttl_secs);
    info!("Store client initialized for bucket: {}", config.storage.bucket);

    let state = AppState {
        gateway: Arc::new(gateway),
    };

    let app = create_router(state);

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .context("Invalid listen address")?;
    info!("Storage Gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/file",
            post(handlers::upload)
                .get(handlers::query_files)
                .delete(handlers::delete_file)
                .options(handlers::preflight)
                .fallback(handlers::method_not_allowed),
        )
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors),
        )
}

async fn health_check() -> &'static str {
    "Storage Gateway is healthy"
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::{ListPage, MockObjectStore, ObjectSummary};
    use axum::body::Body;
    use axum::http::{header::CONTENT_TYPE, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::{json, Value};
    use tower::ServiceExt;

    const BOUNDARY: &str = "test-boundary";

    fn test_app(store: MockObjectStore) -> Router {
        let state = AppState {
            gateway: Arc::new(StorageGateway::new(Arc::new(store), 3600)),
        };
        create_router(state)
    }

    fn multipart_request(field_name: &str, file_name: &str, content: &[u8]) -> Request<Body> {
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field_name}\"; \
                 filename=\"{file_name}\"\r\nContent-Type: text/plain\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(content);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/api/file")
            .header(
                CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health_check() {
        let response = test_app(MockObjectStore::new())
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_multipart_upload_succeeds() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .withf(|key, content_type, body| {
                key == "a.txt" && content_type == "text/plain" && body.as_ref() == b"hello"
            })
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_object_url()
            .returning(|key| format!("https://gw.example/bucket/{}", key));

        let response = test_app(store)
            .oneshot(multipart_request("file", "a.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["message"], "Upload successful");
        assert_eq!(body["fileName"], "a.txt");
        assert_eq!(body["sizeInBytes"], 5);
        assert_eq!(body["location"], "https://gw.example/bucket/a.txt");
    }

    #[tokio::test]
    async fn test_upload_without_file_field_is_rejected() {
        // No mock expectations: the store must not be contacted.
        let response = test_app(MockObjectStore::new())
            .oneshot(multipart_request("attachment", "a.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_json_upload_decodes_base64() {
        let mut store = MockObjectStore::new();
        store
            .expect_put_object()
            .withf(|key, _, body| key == "a.txt" && body.as_ref() == b"hello")
            .times(1)
            .returning(|_, _, _| Ok(()));
        store
            .expect_object_url()
            .returning(|key| format!("https://gw.example/bucket/{}", key));

        let request = Request::builder()
            .method("POST")
            .uri("/api/file")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "fileName": "a.txt", "fileContent": "aGVsbG8=" }).to_string(),
            ))
            .unwrap();

        let response = test_app(store).oneshot(request).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["sizeInBytes"], 5);
    }

    #[tokio::test]
    async fn test_json_upload_rejects_bad_base64() {
        let request = Request::builder()
            .method("POST")
            .uri("/api/file")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(
                json!({ "fileName": "a.txt", "fileContent": "not base64!!" }).to_string(),
            ))
            .unwrap();

        let response = test_app(MockObjectStore::new())
            .oneshot(request)
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_list_action_returns_files() {
        let mut store = MockObjectStore::new();
        store.expect_list_page().returning(|_| {
            Ok(ListPage {
                objects: vec![ObjectSummary {
                    key: "a.txt".to_string(),
                    size_in_bytes: 5,
                    last_modified: None,
                }],
                continuation_token: None,
            })
        });

        let response = test_app(store)
            .oneshot(
                Request::builder()
                    .uri("/api/file?action=list")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["files"][0]["name"], "a.txt");
        assert_eq!(body["files"][0]["sizeInBytes"], 5);
    }

    #[tokio::test]
    async fn test_download_action_returns_signed_link() {
        let mut store = MockObjectStore::new();
        store
            .expect_presign_download()
            .withf(|key, ttl| key == "a.txt" && ttl.as_secs() == 3600)
            .returning(|key, _| Ok(format!("https://gw.example/bucket/{}?signed", key)));

        let response = test_app(store)
            .oneshot(
                Request::builder()
                    .uri("/api/file?action=download&filename=a.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["downloadUrl"], "https://gw.example/bucket/a.txt?signed");
        assert!(body["expiresAt"].is_string());
    }

    #[tokio::test]
    async fn test_download_without_filename_is_rejected() {
        let response = test_app(MockObjectStore::new())
            .oneshot(
                Request::builder()
                    .uri("/api/file?action=download")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Invalid action or missing filename");
    }

    #[tokio::test]
    async fn test_unknown_action_is_rejected() {
        let response = test_app(MockObjectStore::new())
            .oneshot(
                Request::builder()
                    .uri("/api/file?action=purge")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_delete_removes_by_filename() {
        let mut store = MockObjectStore::new();
        store
            .expect_delete_object()
            .withf(|key| key == "a.txt")
            .times(1)
            .returning(|_| Ok(()));

        let response = test_app(store)
            .oneshot(
                Request::builder()
                    .method("DELETE")
                    .uri("/api/file?filename=a.txt")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["fileName"], "a.txt");
    }

    #[tokio::test]
    async fn test_options_preflight_is_ok() {
        let response = test_app(MockObjectStore::new())
            .oneshot(
                Request::builder()
                    .method("OPTIONS")
                    .uri("/api/file")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_other_methods_get_405() {
        let response = test_app(MockObjectStore::new())
            .oneshot(
                Request::builder()
                    .method("PATCH")
                    .uri("/api/file")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Method not allowed");
    }

    #[tokio::test]
    async fn test_store_failure_surfaces_details() {
        let mut store = MockObjectStore::new();
        store.expect_put_object().returning(|_, _, _| {
            Err(crate::storage::StoreError(
                "SignatureDoesNotMatch".to_string(),
            ))
        });

        let response = test_app(store)
            .oneshot(multipart_request("file", "a.txt", b"hello"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "Upload failed");
        assert!(body["details"]
            .as_str()
            .unwrap()
            .contains("SignatureDoesNotMatch"));
    }
}
