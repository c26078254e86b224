//! Health check handler.

use std::sync::Arc;

use axum::{Json, extract::State, http::StatusCode, response::IntoResponse};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// Health status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Health check response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub uptime_seconds: u64,
    pub request_count: u64,
    /// Workflows not yet in a terminal state.
    pub active_workflows: usize,
    pub total_workflows: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// GET /health
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let workflows = state.manager().orchestrator().list_workflows().await;

    let (status, code, active, total, message) = match workflows {
        Ok(all) => {
            let active = all.iter().filter(|p| !p.is_terminal()).count();
            (HealthStatus::Healthy, StatusCode::OK, active, all.len(), None)
        }
        Err(e) => (
            HealthStatus::Unhealthy,
            StatusCode::SERVICE_UNAVAILABLE,
            0,
            0,
            Some(e.to_string()),
        ),
    };

    let response = HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime().as_secs(),
        request_count: state.request_count(),
        active_workflows: active,
        total_workflows: total,
        message,
    };
    (code, Json(response))
}
