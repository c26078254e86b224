//! Task handlers wiring the validation pipeline to its collaborators.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Value, json};
use tracing::{info, warn};

use avp_protocols::{LatencyLevel, PassFailCriteria};
use avp_testexec::TestExecutionError;
use avp_workflow::{
    LoggingTaskHandler, TaskContext, TaskHandler, TaskRegistry, TaskType, WorkflowError,
    WorkflowTask,
};

use crate::coordination::REPORTS;
use crate::error::ApiError;
use crate::services::PipelineServices;

impl From<ApiError> for WorkflowError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Workflow(e) => e,
            ApiError::Protocol(e) => WorkflowError::Collaborator(e),
            ApiError::Coordination(msg) => WorkflowError::Store(msg),
            other => WorkflowError::Custom(other.to_string()),
        }
    }
}

fn project_id(ctx: &TaskContext) -> Result<&str, WorkflowError> {
    ctx.project_id
        .as_deref()
        .ok_or_else(|| WorkflowError::Custom(format!("Workflow {} has no project", ctx.workflow_id)))
}

/// Registry with the pipeline handlers bound to `services`.
pub fn pipeline_registry(services: Arc<PipelineServices>) -> TaskRegistry {
    let registry = TaskRegistry::new();
    registry.register(
        TaskType::ProjectValidation,
        Arc::new(ValidationHandler(Arc::clone(&services))),
    );
    registry.register(TaskType::ResourceAllocation, Arc::new(LoggingTaskHandler));
    registry.register(
        TaskType::VideoAssignment,
        Arc::new(AssignmentHandler(Arc::clone(&services))),
    );
    registry.register(TaskType::GroundTruthLoading, Arc::new(LoggingTaskHandler));
    registry.register(TaskType::TestConfiguration, Arc::new(ConfigurationHandler));
    registry.register(
        TaskType::TestExecution,
        Arc::new(ExecutionHandler(Arc::clone(&services))),
    );
    registry.register(
        TaskType::ResultAnalysis,
        Arc::new(AnalysisHandler(Arc::clone(&services))),
    );
    registry.register(TaskType::ReportGeneration, Arc::new(ReportHandler(services)));
    registry.register(TaskType::Cleanup, Arc::new(LoggingTaskHandler));
    registry
}

/// Checks the project exists and its criteria are usable.
pub struct ValidationHandler(pub Arc<PipelineServices>);

#[async_trait]
impl TaskHandler for ValidationHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let project_id = project_id(ctx)?;
        let project = self.0.project_manager.get_project_progress(project_id).await?;

        let criteria = &ctx.config.pass_fail_criteria;
        PassFailCriteria::from_value(&criteria.to_value())?;

        Ok(json!({ "project": project, "criteria": criteria.to_value() }))
    }
}

/// Assigns the configured videos.
pub struct AssignmentHandler(pub Arc<PipelineServices>);

#[async_trait]
impl TaskHandler for AssignmentHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let project_id = project_id(ctx)?;
        if ctx.config.video_ids.is_empty() {
            return Ok(json!({ "assigned": 0 }));
        }

        let added = self.0.assign_videos(project_id, &ctx.config.video_ids).await?;
        Ok(json!({
            "assigned": added.len(),
            "videos": added.iter().map(|a| a.video_id.as_str()).collect::<Vec<_>>(),
        }))
    }
}

/// Resolves the thresholds the run is graded against.
pub struct ConfigurationHandler;

#[async_trait]
impl TaskHandler for ConfigurationHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let latency = &ctx.config.latency_thresholds;
        if latency.warning_threshold_ms > latency.critical_threshold_ms {
            warn!(
                "Workflow {}: warning latency {}ms above critical {}ms",
                ctx.workflow_id, latency.warning_threshold_ms, latency.critical_threshold_ms
            );
        }
        Ok(json!({
            "execution_strategy": ctx.config.execution_strategy,
            "max_concurrent_tests": ctx.config.max_concurrent_tests,
            "pass_fail_criteria": ctx.config.pass_fail_criteria,
            "latency_thresholds": latency,
        }))
    }
}

/// Runs the project's test sessions.
pub struct ExecutionHandler(pub Arc<PipelineServices>);

#[async_trait]
impl TaskHandler for ExecutionHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let project_id = project_id(ctx)?;
        match self.0.run_tests(project_id, &ctx.config).await {
            Ok(report) => Ok(json!({
                "plan_id": report.plan_id,
                "sessions": report.summary.total,
                "summary": report.summary,
            })),
            Err(ApiError::TestExecution(TestExecutionError::NoTestSessions(_))) => {
                info!("Project {} has no test sessions, skipping execution", project_id);
                Ok(json!({ "sessions": 0, "skipped": true }))
            }
            Err(e) => Err(e.into()),
        }
    }
}

/// Grades the stored test report.
pub struct AnalysisHandler(pub Arc<PipelineServices>);

#[async_trait]
impl TaskHandler for AnalysisHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let project_id = project_id(ctx)?;
        let Some(report) = self.0.stored_results(project_id).await? else {
            return Ok(json!({ "analyzed": false }));
        };

        let thresholds = &ctx.config.latency_thresholds;
        let mut latency_levels: BTreeMap<&str, LatencyLevel> = BTreeMap::new();
        let mut failed_sessions = Vec::new();
        for (session_id, result) in &report.results {
            if let Some(metrics) = &result.metrics {
                latency_levels.insert(session_id.as_str(), thresholds.classify(metrics.latency_ms));
            }
            if !result.passed {
                failed_sessions.push(session_id.as_str());
            }
        }

        Ok(json!({
            "analyzed": true,
            "summary": report.summary,
            "all_passed": report.all_passed(),
            "failed_sessions": failed_sessions,
            "latency_levels": latency_levels,
        }))
    }
}

/// Combines task outputs into the project report.
pub struct ReportHandler(pub Arc<PipelineServices>);

#[async_trait]
impl TaskHandler for ReportHandler {
    async fn handle(&self, _task: &WorkflowTask, ctx: &TaskContext) -> Result<Value, WorkflowError> {
        let project_id = project_id(ctx)?;
        let report = json!({
            "project_id": project_id,
            "workflow_id": ctx.workflow_id,
            "project_name": ctx.config.project_name,
            "validation": ctx.output("validate"),
            "execution": ctx.output("execute"),
            "analysis": ctx.output("analyze"),
        });

        self.0
            .coordination
            .set(REPORTS, project_id, report.clone())
            .await?;
        Ok(report)
    }
}

#[cfg(test)]
#[path = "handlers_tests.rs"]
mod tests;
