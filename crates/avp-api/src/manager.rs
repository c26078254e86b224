//! Project workflow manager.
//!
//! Ties project creation, video assignment and test execution to the
//! workflow orchestrator. Per-project state (configuration, workflow ID,
//! assignments, results, report) lives in a [`CoordinationStore`] so any
//! handler sharing the store sees the same project.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{error, info};

use avp_config::{Config, ConfigLoader, WorkflowSettings};
use avp_protocols::{ProjectData, TestSessionRepository, VideoAssignment};
use avp_testexec::{
    MemoryTestSessionRepository, SimulatedTestRunner, SqliteTestSessionRepository,
    TestExecutionOrchestrator, TestExecutionReport, TestRunner, TestSessionStore,
};
use avp_workflow::orchestrator::WORKFLOW_COMPONENT;
use avp_workflow::{
    ProgressTracker, WorkflowConfiguration, WorkflowError, WorkflowOrchestrator,
    WorkflowProgress, WorkflowState,
};

use crate::coordination::{CONFIGS, CoordinationStore, MemoryCoordinationStore, REPORTS, WORKFLOWS};
use crate::error::ApiError;
use crate::handlers::pipeline_registry;
use crate::project::MemoryProjectManager;
use crate::services::PipelineServices;

/// Outcome of creating a project workflow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectWorkflowResult {
    pub project_id: String,
    pub workflow_id: String,
    pub state: WorkflowState,
    pub progress_percentage: f64,
}

pub struct ProjectWorkflowManager {
    orchestrator: Arc<WorkflowOrchestrator>,
    services: Arc<PipelineServices>,
    settings: WorkflowSettings,
}

impl ProjectWorkflowManager {
    pub fn new(services: PipelineServices, settings: WorkflowSettings) -> Self {
        let services = Arc::new(services);
        let orchestrator = WorkflowOrchestrator::new(Arc::new(pipeline_registry(Arc::clone(
            &services,
        ))))
        .with_tracker(Arc::clone(&services.tracker))
        .with_thresholds(settings.sequential_threshold, settings.parallel_threshold);

        Self {
            orchestrator: Arc::new(orchestrator),
            services,
            settings,
        }
    }

    /// Manager backed by in-memory collaborators.
    pub fn in_memory(config: &Config, runner: Arc<dyn TestRunner>) -> Self {
        Self::assemble(Arc::new(MemoryTestSessionRepository::new()), runner, config)
    }

    /// Manager for a loaded configuration.
    ///
    /// Test sessions go to SQLite when `database.path` is set.
    pub async fn from_config(config: &Config) -> Result<Self, ApiError> {
        let runner: Arc<dyn TestRunner> =
            Arc::new(SimulatedTestRunner::from_settings(&config.test_execution));

        match &config.database.path {
            Some(path) => {
                let path = ConfigLoader::expand_path(&path.to_string_lossy());
                info!("Storing test sessions in {}", path);
                let repository = SqliteTestSessionRepository::open(&path).await?;
                Ok(Self::assemble(Arc::new(repository), runner, config))
            }
            None => Ok(Self::in_memory(config, runner)),
        }
    }

    fn assemble<R>(repository: Arc<R>, runner: Arc<dyn TestRunner>, config: &Config) -> Self
    where
        R: TestSessionStore + 'static,
    {
        let reader: Arc<dyn TestSessionRepository> = repository.clone();
        let test_orchestrator =
            TestExecutionOrchestrator::from_settings(reader, runner, &config.test_execution);

        let services = PipelineServices {
            project_manager: Arc::new(MemoryProjectManager::new()),
            sessions: repository,
            test_orchestrator: Arc::new(test_orchestrator),
            coordination: Arc::new(MemoryCoordinationStore::new()),
            tracker: Arc::new(ProgressTracker::new()),
        };
        Self::new(services, config.workflow.clone())
    }

    pub fn orchestrator(&self) -> &Arc<WorkflowOrchestrator> {
        &self.orchestrator
    }

    pub fn tracker(&self) -> &Arc<ProgressTracker> {
        &self.services.tracker
    }

    pub fn coordination(&self) -> &Arc<dyn CoordinationStore> {
        &self.services.coordination
    }

    /// Workflow configuration seeded from the service settings.
    pub fn default_configuration(&self) -> Result<WorkflowConfiguration, ApiError> {
        Ok(WorkflowConfiguration::from_settings(&self.settings)?)
    }

    /// Create a project and run its validation workflow to completion.
    pub async fn create_project_workflow(
        &self,
        project: ProjectData,
        config: WorkflowConfiguration,
    ) -> Result<ProjectWorkflowResult, ApiError> {
        let (project_id, workflow_id, config) = self.prepare(&project, config).await?;

        if let Err(e) = self.orchestrator.run_workflow(&workflow_id, config).await {
            error!("Workflow {} for project {} failed: {}", workflow_id, project_id, e);
            return Err(e.into());
        }

        let progress = self.orchestrator.get_progress(&workflow_id).await?;
        self.services.tracker.track_progress(
            &project_id,
            WORKFLOW_COMPONENT,
            100.0,
            json!({ "workflow_id": workflow_id, "state": progress.current_state }),
        );

        info!("Project {} workflow {} completed", project_id, workflow_id);
        Ok(ProjectWorkflowResult {
            project_id,
            workflow_id,
            state: progress.current_state,
            progress_percentage: progress.progress_percentage,
        })
    }

    /// Create a project and run its workflow in the background.
    ///
    /// Returns once the workflow is registered; follow it with
    /// [`get_workflow_progress`](Self::get_workflow_progress).
    pub async fn start_project_workflow(
        self: &Arc<Self>,
        project: ProjectData,
        config: WorkflowConfiguration,
    ) -> Result<ProjectWorkflowResult, ApiError> {
        let (project_id, workflow_id, config) = self.prepare(&project, config).await?;

        let this = Arc::clone(self);
        let pid = project_id.clone();
        let wid = workflow_id.clone();
        tokio::spawn(async move {
            match this.orchestrator.run_workflow(&wid, config).await {
                Ok(()) => {
                    this.services.tracker.track_progress(
                        &pid,
                        WORKFLOW_COMPONENT,
                        100.0,
                        json!({ "workflow_id": wid, "state": WorkflowState::Completed }),
                    );
                }
                Err(e) => error!("Workflow {} for project {} failed: {}", wid, pid, e),
            }
        });

        Ok(ProjectWorkflowResult {
            project_id,
            workflow_id,
            state: WorkflowState::Initialized,
            progress_percentage: 0.0,
        })
    }

    /// Create the project, store its configuration and register a workflow.
    async fn prepare(
        &self,
        project: &ProjectData,
        mut config: WorkflowConfiguration,
    ) -> Result<(String, String, WorkflowConfiguration), ApiError> {
        let project_id = self
            .services
            .project_manager
            .create_project_with_criteria(project, &config.pass_fail_criteria)
            .await?;

        config.project_id = Some(project_id.clone());
        if config.project_name.is_empty() {
            config.project_name = project.name.clone();
        }
        if config.video_ids.is_empty() {
            config.video_ids = project.video_ids.clone();
        }

        let coordination = &self.services.coordination;
        coordination
            .set(CONFIGS, &project_id, serde_json::to_value(&config)?)
            .await?;

        let workflow_id = self.orchestrator.register_workflow(&config).await?;
        coordination
            .set(WORKFLOWS, &project_id, json!(workflow_id))
            .await?;

        self.services.tracker.track_progress(
            &project_id,
            WORKFLOW_COMPONENT,
            0.0,
            json!({ "workflow_id": workflow_id, "state": WorkflowState::Initialized }),
        );

        info!(
            "Registered workflow {} for project {} ({} strategy)",
            workflow_id, project_id, config.execution_strategy
        );
        Ok((project_id, workflow_id, config))
    }

    /// Assign more videos to an existing project.
    pub async fn assign_videos(
        &self,
        project_id: &str,
        video_ids: &[String],
    ) -> Result<Vec<VideoAssignment>, ApiError> {
        self.services.assign_videos(project_id, video_ids).await
    }

    /// Run the project's test sessions with its stored configuration.
    pub async fn run_tests(&self, project_id: &str) -> Result<TestExecutionReport, ApiError> {
        let config = self.stored_configuration(project_id).await?;
        self.services.run_tests(project_id, &config).await
    }

    async fn stored_configuration(
        &self,
        project_id: &str,
    ) -> Result<WorkflowConfiguration, ApiError> {
        let value = self
            .services
            .coordination
            .get(CONFIGS, project_id)
            .await?
            .ok_or_else(|| ApiError::ConfigurationMissing(project_id.to_string()))?;
        Ok(serde_json::from_value(value)?)
    }

    async fn workflow_id(&self, project_id: &str) -> Result<Option<String>, ApiError> {
        let value = self.services.coordination.get(WORKFLOWS, project_id).await?;
        Ok(value.and_then(|v| v.as_str().map(str::to_string)))
    }

    /// Combined status of a project.
    pub async fn get_project_status(&self, project_id: &str) -> Result<Value, ApiError> {
        let project = self
            .services
            .project_manager
            .get_project_progress(project_id)
            .await?;

        let workflow = match self.workflow_id(project_id).await? {
            Some(id) => match self.orchestrator.get_progress(&id).await {
                Ok(progress) => serde_json::to_value(progress)?,
                // The record was pruned after finishing.
                Err(WorkflowError::WorkflowNotFound(_)) => {
                    json!({ "workflow_id": id, "pruned": true })
                }
                Err(e) => return Err(e.into()),
            },
            None => Value::Null,
        };
        let overall = self.services.tracker.get_overall_progress(project_id);
        let results = self.services.results_summary(project_id).await?;
        let report = self
            .services
            .coordination
            .get(REPORTS, project_id)
            .await?
            .unwrap_or(Value::Null);

        Ok(json!({
            "project_id": project_id,
            "project": project,
            "workflow": workflow,
            "overall_progress": overall,
            "results": results,
            "report": report,
        }))
    }

    pub async fn get_workflow_progress(
        &self,
        workflow_id: &str,
    ) -> Result<WorkflowProgress, ApiError> {
        Ok(self.orchestrator.get_progress(workflow_id).await?)
    }

    /// Cancel the running workflow of a project.
    ///
    /// Returns `false` when it had already finished.
    pub async fn cancel_project_workflow(&self, project_id: &str) -> Result<bool, ApiError> {
        let workflow_id = self
            .workflow_id(project_id)
            .await?
            .ok_or_else(|| ApiError::NoWorkflow(project_id.to_string()))?;
        self.cancel_workflow(&workflow_id).await
    }

    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<bool, ApiError> {
        Ok(self.orchestrator.cancel_workflow(workflow_id).await?)
    }

    /// Drop finished workflow records past the retention window.
    pub async fn prune_finished(&self) -> Result<usize, ApiError> {
        let retention = Duration::from_secs(self.settings.retain_finished_minutes * 60);
        Ok(self.orchestrator.prune_finished(retention).await?)
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
