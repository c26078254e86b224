//! Test execution orchestrator - plans and runs a project's test sessions.

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use avp_config::TestExecutionSettings;
use avp_protocols::TestSessionRepository;
use avp_workflow::{ExecutionStrategy, WorkflowConfiguration};

use crate::error::TestExecutionError;
use crate::plan::{SessionResult, TestExecutionPlan, TestExecutionReport};
use crate::runner::TestRunner;

/// Rough wall-clock cost of one session, used for plan estimates.
const ESTIMATED_SESSION_SECS: u64 = 60;

/// Plans and executes test sessions for a project.
pub struct TestExecutionOrchestrator {
    repository: Arc<dyn TestSessionRepository>,
    runner: Arc<dyn TestRunner>,
    /// Bounds sessions running at once inside a parallel group.
    max_workers: usize,
    session_timeout: Duration,
}

impl TestExecutionOrchestrator {
    pub fn new(repository: Arc<dyn TestSessionRepository>, runner: Arc<dyn TestRunner>) -> Self {
        let settings = TestExecutionSettings::default();
        Self {
            repository,
            runner,
            max_workers: settings.max_workers,
            session_timeout: Duration::from_secs(settings.session_timeout_secs),
        }
    }

    pub fn from_settings(
        repository: Arc<dyn TestSessionRepository>,
        runner: Arc<dyn TestRunner>,
        settings: &TestExecutionSettings,
    ) -> Self {
        Self::new(repository, runner)
            .with_max_workers(settings.max_workers)
            .with_session_timeout(Duration::from_secs(settings.session_timeout_secs))
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers.max(1);
        self
    }

    pub fn with_session_timeout(mut self, timeout: Duration) -> Self {
        self.session_timeout = timeout;
        self
    }

    /// Order a project's sessions by creation time and group them.
    pub async fn create_execution_plan(
        &self,
        project_id: &str,
        config: &WorkflowConfiguration,
    ) -> Result<TestExecutionPlan, TestExecutionError> {
        let mut sessions = self.repository.list_sessions(project_id).await?;
        if sessions.is_empty() {
            return Err(TestExecutionError::NoTestSessions(project_id.to_string()));
        }

        sessions.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.id.cmp(&b.id)));
        let execution_order: Vec<String> = sessions.iter().map(|s| s.id.clone()).collect();
        let parallel_groups: Vec<Vec<String>> = execution_order
            .chunks(config.max_concurrent_tests.max(1))
            .map(|chunk| chunk.to_vec())
            .collect();

        let slots = match config.execution_strategy {
            ExecutionStrategy::Sequential => execution_order.len(),
            _ => parallel_groups.len(),
        };

        let plan = TestExecutionPlan {
            plan_id: Uuid::new_v4().to_string(),
            project_id: project_id.to_string(),
            sessions,
            execution_order,
            parallel_groups,
            estimated_duration_secs: slots as u64 * ESTIMATED_SESSION_SECS,
            created_at: Utc::now(),
        };

        info!(
            "Created test plan {} for project {}: {} sessions in {} groups",
            plan.plan_id,
            project_id,
            plan.session_count(),
            plan.parallel_groups.len()
        );
        Ok(plan)
    }

    /// Run every session of a plan and collect the results.
    pub async fn execute_test_plan(
        &self,
        plan: &TestExecutionPlan,
        config: &WorkflowConfiguration,
    ) -> Result<TestExecutionReport, TestExecutionError> {
        let mut report = TestExecutionReport::new(plan, Utc::now());

        match config.execution_strategy {
            ExecutionStrategy::Sequential => self.execute_sequential(plan, config, &mut report).await,
            _ => self.execute_parallel(plan, config, &mut report).await,
        }

        report.finish();
        info!(
            "Test plan {} finished: {}/{} succeeded, {} passed",
            plan.plan_id, report.summary.succeeded, report.summary.total, report.summary.passed
        );
        Ok(report)
    }

    async fn execute_sequential(
        &self,
        plan: &TestExecutionPlan,
        config: &WorkflowConfiguration,
        report: &mut TestExecutionReport,
    ) {
        for session_id in &plan.execution_order {
            let started = Instant::now();
            match self.run_session(session_id, config).await {
                Ok(result) => report.record(result.with_duration(elapsed_ms(started))),
                Err(e) if config.auto_recovery => {
                    warn!("Session {} failed, continuing: {}", session_id, e);
                    report.record(
                        SessionResult::failed(session_id, e.to_string())
                            .with_duration(elapsed_ms(started)),
                    );
                }
                Err(e) => {
                    warn!("Session {} failed, stopping plan {}: {}", session_id, plan.plan_id, e);
                    break;
                }
            }
        }
    }

    async fn execute_parallel(
        &self,
        plan: &TestExecutionPlan,
        config: &WorkflowConfiguration,
        report: &mut TestExecutionReport,
    ) {
        let permits = Arc::new(Semaphore::new(self.max_workers));

        for (index, group) in plan.parallel_groups.iter().enumerate() {
            debug!(
                "Plan {}: running group {} ({} sessions)",
                plan.plan_id,
                index + 1,
                group.len()
            );

            let runs = group.iter().map(|session_id| {
                let permits = Arc::clone(&permits);
                async move {
                    let _permit = permits.acquire_owned().await;
                    let started = Instant::now();
                    let result = match self.run_session(session_id, config).await {
                        Ok(result) => result,
                        Err(e) => {
                            warn!("Session {} failed: {}", session_id, e);
                            SessionResult::failed(session_id, e.to_string())
                        }
                    };
                    result.with_duration(elapsed_ms(started))
                }
            });

            for result in join_all(runs).await {
                report.record(result);
            }
        }
    }

    /// Look a session up, run it under the timeout and grade the metrics.
    async fn run_session(
        &self,
        session_id: &str,
        config: &WorkflowConfiguration,
    ) -> Result<SessionResult, TestExecutionError> {
        let session = self
            .repository
            .get_session(session_id)
            .await?
            .ok_or_else(|| TestExecutionError::SessionNotFound(session_id.to_string()))?;

        let run = self.runner.run(
            &session,
            &config.pass_fail_criteria,
            &config.latency_thresholds,
        );
        let metrics = tokio::time::timeout(self.session_timeout, run)
            .await
            .map_err(|_| {
                TestExecutionError::Timeout(format!(
                    "session {} exceeded {}s",
                    session_id,
                    self.session_timeout.as_secs()
                ))
            })??;

        let outcome = config.pass_fail_criteria.evaluate(&metrics);
        let level = config.latency_thresholds.classify(metrics.latency_ms);
        debug!(
            "Session {}: passed={}, latency {:.1}ms ({:?})",
            session_id, outcome.passed, metrics.latency_ms, level
        );

        Ok(SessionResult::completed(
            session_id,
            metrics,
            outcome.passed,
            outcome.failures,
        ))
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    started.elapsed().as_millis() as u64
}
