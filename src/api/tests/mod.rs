use super::*;
use crate::publisher::test_helpers::{create_test_publisher, scripted_registry, wait_for_summary};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use std::time::Duration;
use tower::ServiceExt;


/// Publisher with the scripted "a"/"b" targets, wrapped in Arc
async fn create_test_app_publisher() -> (Arc<Publisher>, tempfile::TempDir) {
    let (publisher, temp_dir) = create_test_publisher(scripted_registry()).await;
    (Arc::new(publisher), temp_dir)
}

/// Router with the publisher's own config
async fn test_router() -> (Router, Arc<Publisher>, tempfile::TempDir) {
    let (publisher, temp_dir) = create_test_app_publisher().await;
    let config = publisher.get_config();
    (create_router(publisher.clone(), config), publisher, temp_dir)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns_and_stops() {
    let (publisher, _temp_dir) = create_test_app_publisher().await;

    // Port 0 = OS assigns a free port
    let mut config = (*publisher.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let (stop_tx, stop_rx) = tokio::sync::oneshot::channel::<()>();
    let api_handle = tokio::spawn(start_api_server(publisher, config, async {
        stop_rx.await.ok();
    }));

    tokio::time::sleep(Duration::from_millis(100)).await;
    stop_tx.send(()).unwrap();

    let result = tokio::time::timeout(Duration::from_secs(5), api_handle)
        .await
        .expect("server should stop after the shutdown signal")
        .unwrap();
    assert!(result.is_ok());
}

#[tokio::test]
async fn test_cors_enabled() {
    let (publisher, _temp_dir) = create_test_app_publisher().await;

    let mut config = (*publisher.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["*".to_string()];
    let app = create_router(publisher, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers().contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_restricted_origin_list() {
    let (publisher, _temp_dir) = create_test_app_publisher().await;

    let mut config = (*publisher.get_config()).clone();
    config.api.cors_enabled = true;
    config.api.cors_origins = vec!["http://allowed.test".to_string()];
    let app = create_router(publisher, Arc::new(config));

    let allowed = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://allowed.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(
        allowed.headers()["access-control-allow-origin"],
        "http://allowed.test"
    );

    let other = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Origin", "http://elsewhere.test")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert!(!other.headers().contains_key("access-control-allow-origin"));
}

#[tokio::test]
async fn test_authentication_with_api_key() {
    let (publisher, _temp_dir) = create_test_app_publisher().await;

    let mut config = (*publisher.get_config()).clone();
    config.api.api_key = Some("test-secret-key".to_string());
    let app = create_router(publisher, Arc::new(config));

    let response = app.clone().oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Api-Key", "test-secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("Authorization", "Bearer test-secret-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/health")
                .header("X-Api-Key", "wrong-key")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(response).await;
    assert_eq!(body["error"]["code"], "unauthorized");
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let (publisher, _temp_dir) = create_test_app_publisher().await;

    let mut config = (*publisher.get_config()).clone();
    config.api.swagger_ui = false;
    let app = create_router(publisher, Arc::new(config));

    let response = app.oneshot(get("/api-docs/openapi.json")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
