//! HTTP route definitions.

use std::sync::Arc;

use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::http::handlers;
use crate::http::monitoring;
use crate::state::AppState;

/// Create the main router.
///
/// ```text
/// /projects
///   POST   /projects               - Create project and run its workflow
///   POST   /projects/{id}/videos   - Assign videos
///   POST   /projects/{id}/tests    - Run test sessions
///   GET    /projects/{id}/status   - Project status
///
/// /workflows
///   GET    /workflows/{id}         - Workflow progress
///   POST   /workflows/{id}/cancel  - Cancel workflow
///
/// /health  - Health check
/// ```
pub fn create_router(state: Arc<AppState>) -> Router {
    let project_routes = Router::new()
        .route("/", post(handlers::create_project))
        .route("/{id}/videos", post(handlers::assign_videos))
        .route("/{id}/tests", post(handlers::run_tests))
        .route("/{id}/status", get(handlers::project_status))
        .with_state(state.clone());

    let workflow_routes = Router::new()
        .route("/{id}", get(handlers::workflow_progress))
        .route("/{id}/cancel", post(handlers::cancel_workflow))
        .with_state(state.clone());

    let monitoring_routes = Router::new()
        .route("/health", get(monitoring::health_check))
        .with_state(state);

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .nest("/projects", project_routes)
        .nest("/workflows", workflow_routes)
        .merge(monitoring_routes)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

#[cfg(test)]
#[path = "routes_tests.rs"]
mod tests;
