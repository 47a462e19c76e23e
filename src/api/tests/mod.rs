use super::*;
use crate::downloader::test_helpers::{
    ScriptedRetriever, StaticMetadata, Step, wait_for_terminal,
};
use crate::types::{JobId, JobSnapshot};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;


const FIRST: &str = "aaaaaaaaaaa";
const SECOND: &str = "bbbbbbbbbbb";

/// Helper to create a test TubeDownloader instance wrapped in Arc
async fn create_test_downloader() -> (Arc<TubeDownloader>, tempfile::TempDir) {
    create_scripted_downloader(ScriptedRetriever::new()).await
}

async fn create_scripted_downloader(
    retriever: Arc<ScriptedRetriever>,
) -> (Arc<TubeDownloader>, tempfile::TempDir) {
    let (downloader, temp_dir) =
        crate::downloader::test_helpers::create_test_downloader(retriever, StaticMetadata::empty())
            .await;
    (Arc::new(downloader), temp_dir)
}

fn app_for(downloader: &Arc<TubeDownloader>) -> Router {
    let config = downloader.get_config();
    create_router(Arc::clone(downloader), config)
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

/// Submit through the router and wait for the job to finish
async fn submit_and_finish(downloader: &Arc<TubeDownloader>, urls: &str) -> JobSnapshot {
    let response = app_for(downloader)
        .oneshot(post_json(
            "/api/download",
            serde_json::json!({ "videoUrls": urls }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CREATED);
    let job_id: JobId = body_json(response).await["job_id"]
        .as_str()
        .unwrap()
        .parse()
        .unwrap();
    wait_for_terminal(downloader, job_id).await
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    // Port 0 = OS assigns a free port
    let mut config = (*downloader.get_config()).clone();
    config.server.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let downloader = downloader.clone();
        let config = config.clone();
        async move { start_api_server(downloader, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");

    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = true;
    config.server.api.cors_origins = vec!["*".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_enabled = false;
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}

#[tokio::test]
async fn test_cors_specific_origin() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.cors_origins = vec!["http://allowed.example".to_string()];
    let app = create_router(downloader, Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://allowed.example")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(
        response.headers()["access-control-allow-origin"],
        "http://allowed.example"
    );
}

#[tokio::test]
async fn test_swagger_ui_enabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = true;
    let app = create_router(downloader, Arc::new(config));

    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::OK,
        "Swagger UI should be accessible when enabled"
    );
    let body = String::from_utf8(body_bytes(response).await).unwrap();
    assert!(
        body.contains("<!DOCTYPE html>") || body.contains("<html"),
        "Response should contain HTML"
    );
}

#[tokio::test]
async fn test_swagger_ui_disabled() {
    let (downloader, _temp_dir) = create_test_downloader().await;

    let mut config = (*downloader.get_config()).clone();
    config.server.api.swagger_ui = false;
    let app = create_router(downloader, Arc::new(config));

    let response = app.oneshot(get("/swagger-ui/")).await.unwrap();

    assert_eq!(
        response.status(),
        StatusCode::NOT_FOUND,
        "Swagger UI should not be accessible when disabled"
    );
}
