//! Tests for the HTTP routes.

use super::*;
use std::time::Duration;

use avp_config::Config;
use avp_testexec::SimulatedTestRunner;
use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::manager::ProjectWorkflowManager;

fn create_test_router() -> Router {
    let manager = ProjectWorkflowManager::in_memory(
        &Config::default(),
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    );
    create_router(Arc::new(AppState::new(Arc::new(manager))))
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(serde_json::to_string(&body).unwrap()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn create_project(app: &Router, body: Value) -> Value {
    let response = app.clone().oneshot(post_json("/projects", body)).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    body_json(response).await
}

#[tokio::test]
async fn test_health_endpoint() {
    let app = create_test_router();
    let response = app.oneshot(get("/health")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = body_json(response).await;
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["version"], env!("CARGO_PKG_VERSION"));
    assert_eq!(body["total_workflows"], 0);
}

#[tokio::test]
async fn test_project_lifecycle() {
    let app = create_test_router();
    let created = create_project(
        &app,
        json!({
            "name": "Side VRU",
            "video_ids": ["v1"],
            "config": { "execution_strategy": "hybrid", "retry_delay_ms": 1 },
        }),
    )
    .await;
    assert_eq!(created["success"], true);
    assert_eq!(created["state"], "completed");
    let project_id = created["project_id"].as_str().unwrap();
    let workflow_id = created["workflow_id"].as_str().unwrap();

    let response = app
        .clone()
        .oneshot(post_json(
            &format!("/projects/{}/videos", project_id),
            json!({ "video_ids": ["v2"] }),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["assigned"], 1);

    let response = app
        .clone()
        .oneshot(post_json(&format!("/projects/{}/tests", project_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["report"]["summary"]["total"], 2);

    let response = app
        .clone()
        .oneshot(get(&format!("/projects/{}/status", project_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let status = body_json(response).await;
    assert_eq!(status["status"]["project"]["videos_assigned"], 2);

    let response = app
        .clone()
        .oneshot(get(&format!("/workflows/{}", workflow_id)))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let progress = body_json(response).await;
    assert_eq!(progress["progress"]["strategy"], "hybrid");
    assert_eq!(progress["progress"]["tasks_completed"], 9);

    let response = app
        .oneshot(post_json(&format!("/workflows/{}/cancel", workflow_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["cancelled"], false);
}

#[tokio::test]
async fn test_missing_name_is_bad_request() {
    let app = create_test_router();
    let response = app
        .oneshot(post_json("/projects", json!({ "description": "nameless" })))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let body = body_json(response).await;
    assert_eq!(body["success"], false);
    assert_eq!(body["message"], "Project creation failed");
}

#[tokio::test]
async fn test_unknown_ids_are_not_found() {
    let app = create_test_router();

    let response = app.clone().oneshot(get("/projects/nope/status")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app.clone().oneshot(get("/workflows/nope")).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .clone()
        .oneshot(post_json("/workflows/nope/cancel", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = app
        .oneshot(post_json("/projects/nope/tests", json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_run_tests_without_sessions_is_bad_request() {
    let app = create_test_router();
    let created = create_project(
        &app,
        json!({ "name": "bare", "config": { "retry_delay_ms": 1 } }),
    )
    .await;
    let project_id = created["project_id"].as_str().unwrap();

    let response = app
        .oneshot(post_json(&format!("/projects/{}/tests", project_id), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = body_json(response).await;
    assert!(body["error"].as_str().unwrap().contains(project_id));
}
