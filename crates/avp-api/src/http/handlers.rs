//! Project and workflow route handlers.
//!
//! - POST /projects                - Create a project and run its workflow
//! - POST /projects/{id}/videos    - Assign videos
//! - POST /projects/{id}/tests     - Run the project's test sessions
//! - GET  /projects/{id}/status    - Combined project status
//! - GET  /workflows/{id}          - Workflow progress
//! - POST /workflows/{id}/cancel   - Cancel a workflow

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde_json::Value;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::integration::error_body;
use crate::state::AppState;

fn reply(operation: &str, result: Result<Value, ApiError>) -> (StatusCode, Json<Value>) {
    match result {
        Ok(body) => (StatusCode::OK, Json(body)),
        Err(e) => {
            let status = e.status_code();
            warn!("{} failed ({}): {}", operation, status, e);
            (status, Json(error_body(operation, &e)))
        }
    }
}

/// POST /projects
pub async fn create_project(
    State(state): State<Arc<AppState>>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.increment_requests();
    info!("Creating project workflow");
    reply("Project creation", state.api.try_create_project(body).await)
}

/// POST /projects/{id}/videos
pub async fn assign_videos(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
    Json(body): Json<Value>,
) -> impl IntoResponse {
    state.increment_requests();
    reply(
        "Video assignment",
        state.api.try_assign_videos(&project_id, body).await,
    )
}

/// POST /projects/{id}/tests
pub async fn run_tests(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    info!("Running tests for project {}", project_id);
    reply("Test execution", state.api.try_run_tests(&project_id).await)
}

/// GET /projects/{id}/status
pub async fn project_status(
    State(state): State<Arc<AppState>>,
    Path(project_id): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    reply("Status lookup", state.api.try_get_status(&project_id).await)
}

/// GET /workflows/{id}
pub async fn workflow_progress(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    reply(
        "Workflow progress lookup",
        state.api.try_get_workflow_progress(&workflow_id).await,
    )
}

/// POST /workflows/{id}/cancel
pub async fn cancel_workflow(
    State(state): State<Arc<AppState>>,
    Path(workflow_id): Path<String>,
) -> impl IntoResponse {
    state.increment_requests();
    info!("Cancel requested for workflow {}", workflow_id);
    reply(
        "Workflow cancellation",
        state.api.try_cancel_workflow(&workflow_id).await,
    )
}
