//! JSON adapter over the project workflow manager.
//!
//! Every operation takes and returns JSON. Successful calls return an
//! object with `"success": true`; failures are folded into
//! `{"success": false, "error": ..., "message": "<operation> failed"}`.

use std::sync::Arc;

use serde::Deserialize;
use serde_json::{Map, Value, json};
use tracing::warn;

use avp_protocols::ProjectData;
use avp_workflow::WorkflowConfiguration;

use crate::error::ApiError;
use crate::manager::ProjectWorkflowManager;

/// Body of a project creation request.
#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    #[serde(flatten)]
    pub project: ProjectData,

    /// Overrides applied on top of the service's default configuration.
    #[serde(default)]
    pub config: Value,

    /// Run the workflow before responding. When false the workflow runs
    /// in the background.
    #[serde(default = "default_wait")]
    pub wait: bool,
}

fn default_wait() -> bool {
    true
}

/// Body of a video assignment request.
#[derive(Debug, Deserialize)]
pub struct AssignVideosRequest {
    pub video_ids: Vec<String>,
}

pub struct WorkflowApi {
    manager: Arc<ProjectWorkflowManager>,
}

impl WorkflowApi {
    pub fn new(manager: Arc<ProjectWorkflowManager>) -> Self {
        Self { manager }
    }

    pub fn manager(&self) -> &Arc<ProjectWorkflowManager> {
        &self.manager
    }

    pub async fn create_project(&self, request: Value) -> Value {
        respond("Project creation", self.try_create_project(request).await)
    }

    pub async fn assign_videos(&self, project_id: &str, request: Value) -> Value {
        respond(
            "Video assignment",
            self.try_assign_videos(project_id, request).await,
        )
    }

    pub async fn run_tests(&self, project_id: &str) -> Value {
        respond("Test execution", self.try_run_tests(project_id).await)
    }

    pub async fn get_status(&self, project_id: &str) -> Value {
        respond("Status lookup", self.try_get_status(project_id).await)
    }

    pub async fn get_workflow_progress(&self, workflow_id: &str) -> Value {
        respond(
            "Workflow progress lookup",
            self.try_get_workflow_progress(workflow_id).await,
        )
    }

    pub async fn cancel_workflow(&self, workflow_id: &str) -> Value {
        respond(
            "Workflow cancellation",
            self.try_cancel_workflow(workflow_id).await,
        )
    }

    pub(crate) async fn try_create_project(&self, request: Value) -> Result<Value, ApiError> {
        let request: CreateProjectRequest = serde_json::from_value(request)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let config = self.build_configuration(&request.config)?;

        let result = if request.wait {
            self.manager
                .create_project_workflow(request.project, config)
                .await?
        } else {
            self.manager
                .start_project_workflow(request.project, config)
                .await?
        };

        Ok(json!({
            "success": true,
            "project_id": result.project_id,
            "workflow_id": result.workflow_id,
            "state": result.state,
            "progress_percentage": result.progress_percentage,
            "message": "Project workflow created",
        }))
    }

    pub(crate) async fn try_assign_videos(
        &self,
        project_id: &str,
        request: Value,
    ) -> Result<Value, ApiError> {
        let request: AssignVideosRequest = serde_json::from_value(request)
            .map_err(|e| ApiError::InvalidRequest(e.to_string()))?;
        let added = self
            .manager
            .assign_videos(project_id, &request.video_ids)
            .await?;

        Ok(json!({
            "success": true,
            "project_id": project_id,
            "assigned": added.len(),
            "assignments": added,
        }))
    }

    pub(crate) async fn try_run_tests(&self, project_id: &str) -> Result<Value, ApiError> {
        let report = self.manager.run_tests(project_id).await?;
        Ok(json!({
            "success": true,
            "project_id": project_id,
            "report": report,
        }))
    }

    pub(crate) async fn try_get_status(&self, project_id: &str) -> Result<Value, ApiError> {
        let status = self.manager.get_project_status(project_id).await?;
        Ok(json!({ "success": true, "status": status }))
    }

    pub(crate) async fn try_get_workflow_progress(
        &self,
        workflow_id: &str,
    ) -> Result<Value, ApiError> {
        let progress = self.manager.get_workflow_progress(workflow_id).await?;
        Ok(json!({ "success": true, "progress": progress }))
    }

    pub(crate) async fn try_cancel_workflow(&self, workflow_id: &str) -> Result<Value, ApiError> {
        let cancelled = self.manager.cancel_workflow(workflow_id).await?;
        Ok(json!({
            "success": true,
            "workflow_id": workflow_id,
            "cancelled": cancelled,
        }))
    }

    /// Default configuration with the request's overrides merged in.
    fn build_configuration(&self, overrides: &Value) -> Result<WorkflowConfiguration, ApiError> {
        let base = self.manager.default_configuration()?;
        match overrides {
            Value::Null => Ok(base),
            Value::Object(fields) => {
                let mut merged = serde_json::to_value(&base)?;
                merge(&mut merged, fields);
                let config: WorkflowConfiguration = serde_json::from_value(merged)
                    .map_err(|e| ApiError::InvalidRequest(format!("config: {}", e)))?;
                check_limits(&config)?;
                Ok(config)
            }
            _ => Err(ApiError::InvalidRequest(
                "config must be an object".to_string(),
            )),
        }
    }
}

fn check_limits(config: &WorkflowConfiguration) -> Result<(), ApiError> {
    if config.timeout_minutes == 0 {
        return Err(ApiError::InvalidRequest(
            "config: timeout_minutes must be at least 1".to_string(),
        ));
    }
    if config.max_concurrent_tests == 0 {
        return Err(ApiError::InvalidRequest(
            "config: max_concurrent_tests must be at least 1".to_string(),
        ));
    }
    Ok(())
}

fn merge(target: &mut Value, overrides: &Map<String, Value>) {
    let Value::Object(target) = target else {
        return;
    };
    for (key, value) in overrides {
        match value {
            Value::Object(nested) if target.get(key).is_some_and(Value::is_object) => {
                if let Some(existing) = target.get_mut(key) {
                    merge(existing, nested);
                }
            }
            _ => {
                target.insert(key.clone(), value.clone());
            }
        }
    }
}

/// Fold a result into the adapter's response shape.
pub fn respond(operation: &str, result: Result<Value, ApiError>) -> Value {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} failed: {}", operation, e);
            error_body(operation, &e)
        }
    }
}

pub(crate) fn error_body(operation: &str, error: &ApiError) -> Value {
    json!({
        "success": false,
        "error": error.to_string(),
        "message": format!("{} failed", operation),
    })
}

#[cfg(test)]
#[path = "integration_tests.rs"]
mod tests;
