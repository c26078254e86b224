//! Collaborators shared by the manager and the pipeline task handlers.

use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use avp_protocols::{ProjectManager, TestSession, TestSessionRepository, VideoAssignment};
use avp_testexec::{TestExecutionOrchestrator, TestExecutionReport, TestSessionStore};
use avp_workflow::{ProgressTracker, WorkflowConfiguration};

use crate::coordination::{ASSIGNMENTS, CoordinationStore, RESULTS};
use crate::error::ApiError;

/// Tracker component for video assignment.
pub const VIDEO_ASSIGNMENT_COMPONENT: &str = "video_assignment";
/// Tracker component for test execution.
pub const TESTING_COMPONENT: &str = "testing";

pub struct PipelineServices {
    pub project_manager: Arc<dyn ProjectManager>,
    pub sessions: Arc<dyn TestSessionStore>,
    pub test_orchestrator: Arc<TestExecutionOrchestrator>,
    pub coordination: Arc<dyn CoordinationStore>,
    pub tracker: Arc<ProgressTracker>,
}

impl PipelineServices {
    /// Link videos to a project and open one test session per video.
    ///
    /// Sessions are opened before the assignment is committed, and only for
    /// videos without one, so a call that failed part way can be retried.
    pub async fn assign_videos(
        &self,
        project_id: &str,
        video_ids: &[String],
    ) -> Result<Vec<VideoAssignment>, ApiError> {
        self.project_manager.get_project_progress(project_id).await?;
        self.open_sessions(project_id, video_ids).await?;

        let added = self
            .project_manager
            .assign_videos_to_project(project_id, video_ids)
            .await?;

        let total = self.record_assignments(project_id, &added).await?;
        self.tracker.track_progress(
            project_id,
            VIDEO_ASSIGNMENT_COMPONENT,
            100.0,
            json!({ "assigned": added.len(), "total": total }),
        );

        info!(
            "Assigned {} videos to project {} ({} total)",
            added.len(),
            project_id,
            total
        );
        Ok(added)
    }

    async fn open_sessions(&self, project_id: &str, video_ids: &[String]) -> Result<(), ApiError> {
        let mut covered: HashSet<String> = self
            .sessions
            .list_sessions(project_id)
            .await?
            .into_iter()
            .map(|session| session.video_id)
            .collect();

        for video_id in video_ids {
            if !covered.insert(video_id.clone()) {
                continue;
            }
            let session = TestSession::new(Uuid::new_v4().to_string(), project_id, video_id.clone())
                .with_name(format!("video-{}", video_id));
            self.sessions.insert_session(&session).await?;
            debug!("Opened session {} for video {}", session.id, video_id);
        }
        Ok(())
    }

    /// Merge new assignments into the stored list. Returns the list length.
    async fn record_assignments(
        &self,
        project_id: &str,
        added: &[VideoAssignment],
    ) -> Result<usize, ApiError> {
        loop {
            let current = self.coordination.get(ASSIGNMENTS, project_id).await?;
            let mut merged: Vec<VideoAssignment> = match &current {
                Some(value) => serde_json::from_value(value.clone())?,
                None => Vec::new(),
            };
            merged.extend(added.iter().cloned());
            let total = merged.len();

            if self
                .coordination
                .compare_and_swap(
                    ASSIGNMENTS,
                    project_id,
                    current.as_ref(),
                    serde_json::to_value(&merged)?,
                )
                .await?
            {
                return Ok(total);
            }
            tokio::task::yield_now().await;
        }
    }

    /// Plan and run every test session of a project, storing the report.
    pub async fn run_tests(
        &self,
        project_id: &str,
        config: &WorkflowConfiguration,
    ) -> Result<TestExecutionReport, ApiError> {
        let plan = self
            .test_orchestrator
            .create_execution_plan(project_id, config)
            .await?;
        self.tracker.track_progress(
            project_id,
            TESTING_COMPONENT,
            0.0,
            json!({ "plan_id": plan.plan_id, "sessions": plan.session_count() }),
        );

        let report = self.test_orchestrator.execute_test_plan(&plan, config).await?;
        self.coordination
            .set(RESULTS, project_id, serde_json::to_value(&report)?)
            .await?;

        self.tracker.track_progress(
            project_id,
            TESTING_COMPONENT,
            100.0,
            json!({ "plan_id": report.plan_id, "summary": report.summary }),
        );
        Ok(report)
    }

    /// Stored report of the last test run.
    pub async fn stored_results(
        &self,
        project_id: &str,
    ) -> Result<Option<TestExecutionReport>, ApiError> {
        match self.coordination.get(RESULTS, project_id).await? {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Stored report summary, or `null`.
    pub async fn results_summary(&self, project_id: &str) -> Result<Value, ApiError> {
        Ok(match self.stored_results(project_id).await? {
            Some(report) => json!({
                "plan_id": report.plan_id,
                "summary": report.summary,
                "all_passed": report.all_passed(),
                "completed_at": report.completed_at,
            }),
            None => Value::Null,
        })
    }
}
