//! Workflow orchestrator core - registers, runs and tracks workflows.

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::json;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::complexity::{ComplexityAnalyzer, HeuristicComplexityAnalyzer};
use crate::definition::{
    ExecutionStrategy, WorkflowConfiguration, WorkflowProgress, WorkflowState, WorkflowTask,
};
use crate::error::WorkflowError;
use crate::graph::validate_graph;
use crate::progress_tracker::ProgressTracker;
use crate::registry::{TaskContext, TaskRegistry};
use crate::store::{MemoryWorkflowStateStore, WorkflowStateStore};

/// Tracker component that mirrors workflow progress per project.
pub const WORKFLOW_COMPONENT: &str = "workflow";

/// Runs validation workflows under one of four strategies.
pub struct WorkflowOrchestrator {
    pub(crate) registry: Arc<TaskRegistry>,
    pub(crate) store: Arc<dyn WorkflowStateStore>,
    pub(crate) analyzer: Arc<dyn ComplexityAnalyzer>,
    pub(crate) tracker: Option<Arc<ProgressTracker>>,
    /// Tokens of workflows that are registered but not yet finished.
    cancellations: DashMap<String, CancellationToken>,
    /// Adaptive scores above this run in parallel.
    pub(crate) parallel_threshold: f64,
    /// Adaptive scores below this run sequentially.
    pub(crate) sequential_threshold: f64,
}

impl WorkflowOrchestrator {
    /// Create an orchestrator with an in-memory store and the heuristic analyzer.
    pub fn new(registry: Arc<TaskRegistry>) -> Self {
        Self {
            registry,
            store: Arc::new(MemoryWorkflowStateStore::new()),
            analyzer: Arc::new(HeuristicComplexityAnalyzer),
            tracker: None,
            cancellations: DashMap::new(),
            parallel_threshold: 0.7,
            sequential_threshold: 0.3,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn WorkflowStateStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_analyzer(mut self, analyzer: Arc<dyn ComplexityAnalyzer>) -> Self {
        self.analyzer = analyzer;
        self
    }

    /// Mirror each task completion into a project progress tracker.
    pub fn with_tracker(mut self, tracker: Arc<ProgressTracker>) -> Self {
        self.tracker = Some(tracker);
        self
    }

    /// Set the adaptive selection thresholds.
    pub fn with_thresholds(mut self, sequential: f64, parallel: f64) -> Self {
        self.sequential_threshold = sequential;
        self.parallel_threshold = parallel;
        self
    }

    pub fn registry(&self) -> &Arc<TaskRegistry> {
        &self.registry
    }

    /// Run the standard pipeline to completion and return the workflow ID.
    pub async fn execute_workflow(
        &self,
        config: WorkflowConfiguration,
    ) -> Result<String, WorkflowError> {
        self.execute_workflow_with_tasks(config, WorkflowTask::standard_pipeline())
            .await
    }

    /// Run a caller-provided task list to completion.
    pub async fn execute_workflow_with_tasks(
        &self,
        config: WorkflowConfiguration,
        tasks: Vec<WorkflowTask>,
    ) -> Result<String, WorkflowError> {
        let workflow_id = Uuid::new_v4().to_string();
        self.register(&workflow_id, &config, tasks.len()).await?;
        self.run(&workflow_id, config, tasks).await?;
        Ok(workflow_id)
    }

    /// Register a standard-pipeline workflow without running it.
    ///
    /// Lets callers publish the ID before [`run_workflow`](Self::run_workflow)
    /// blocks, so the run can be observed and cancelled.
    pub async fn register_workflow(
        &self,
        config: &WorkflowConfiguration,
    ) -> Result<String, WorkflowError> {
        let workflow_id = Uuid::new_v4().to_string();
        self.register(&workflow_id, config, WorkflowTask::standard_pipeline().len())
            .await?;
        Ok(workflow_id)
    }

    /// Run a workflow previously returned by
    /// [`register_workflow`](Self::register_workflow).
    pub async fn run_workflow(
        &self,
        workflow_id: &str,
        config: WorkflowConfiguration,
    ) -> Result<(), WorkflowError> {
        let progress = self.get_progress(workflow_id).await?;
        if progress.current_state != WorkflowState::Initialized {
            return Err(WorkflowError::Custom(format!(
                "Workflow {} already started",
                workflow_id
            )));
        }
        self.run(workflow_id, config, WorkflowTask::standard_pipeline())
            .await
    }

    /// Register the standard pipeline and run it in the background.
    ///
    /// The outcome is observable through [`get_progress`](Self::get_progress).
    pub async fn start_workflow(
        self: &Arc<Self>,
        config: WorkflowConfiguration,
    ) -> Result<String, WorkflowError> {
        let workflow_id = self.register_workflow(&config).await?;

        let this = Arc::clone(self);
        let id = workflow_id.clone();
        tokio::spawn(async move {
            if let Err(e) = this.run_workflow(&id, config).await {
                debug!("Background workflow {} ended with error: {}", id, e);
            }
        });

        Ok(workflow_id)
    }

    pub async fn get_progress(&self, workflow_id: &str) -> Result<WorkflowProgress, WorkflowError> {
        self.store
            .get(workflow_id)
            .await?
            .ok_or_else(|| WorkflowError::WorkflowNotFound(workflow_id.to_string()))
    }

    pub async fn list_workflows(&self) -> Result<Vec<WorkflowProgress>, WorkflowError> {
        let mut all = self.store.list().await?;
        all.sort_by(|a, b| a.started_at.cmp(&b.started_at));
        Ok(all)
    }

    /// Request cancellation of a running workflow.
    ///
    /// Returns `false` when the workflow has already finished.
    pub async fn cancel_workflow(&self, workflow_id: &str) -> Result<bool, WorkflowError> {
        if let Some(token) = self.cancellations.get(workflow_id) {
            info!("Cancelling workflow {}", workflow_id);
            token.cancel();
            return Ok(true);
        }
        self.get_progress(workflow_id).await.map(|_| false)
    }

    /// Drop finished records whose completion is older than `older_than`.
    pub async fn prune_finished(&self, older_than: Duration) -> Result<usize, WorkflowError> {
        let age = chrono::Duration::from_std(older_than)
            .map_err(|e| WorkflowError::Custom(format!("Invalid retention: {}", e)))?;
        let cutoff = Utc::now() - age;

        let mut pruned = 0;
        for progress in self.store.list().await? {
            let expired = progress.is_terminal()
                && progress.completed_at.is_some_and(|done| done <= cutoff);
            if expired && self.store.remove(&progress.workflow_id).await? {
                pruned += 1;
            }
        }

        if pruned > 0 {
            debug!("Pruned {} finished workflows", pruned);
        }
        Ok(pruned)
    }

    async fn register(
        &self,
        workflow_id: &str,
        config: &WorkflowConfiguration,
        tasks_total: usize,
    ) -> Result<(), WorkflowError> {
        let progress = WorkflowProgress::new(
            workflow_id,
            config.project_id.clone(),
            config.execution_strategy,
            tasks_total,
        );
        self.store.set(progress).await?;
        self.cancellations
            .insert(workflow_id.to_string(), CancellationToken::new());
        Ok(())
    }

    async fn run(
        &self,
        workflow_id: &str,
        config: WorkflowConfiguration,
        tasks: Vec<WorkflowTask>,
    ) -> Result<(), WorkflowError> {
        let token = self
            .cancellations
            .get(workflow_id)
            .map(|t| t.value().clone())
            .unwrap_or_default();
        let config = Arc::new(config);
        let deadline = config.timeout();

        info!(
            "Starting workflow {} ({} strategy, {} tasks)",
            workflow_id,
            config.execution_strategy,
            tasks.len()
        );

        let outcome = tokio::select! {
            result = tokio::time::timeout(
                deadline,
                self.dispatch(workflow_id, Arc::clone(&config), &tasks, &token),
            ) => match result {
                Ok(r) => r,
                Err(_) => Err(WorkflowError::Timeout(format!(
                    "workflow {} exceeded {} minutes",
                    workflow_id, config.timeout_minutes
                ))),
            },
            _ = token.cancelled() => Err(WorkflowError::Cancelled(workflow_id.to_string())),
        };

        self.cancellations.remove(workflow_id);

        match outcome {
            Ok(()) => {
                self.update_progress(workflow_id, |p| p.transition(WorkflowState::Completed))
                    .await?;
                info!("Workflow {} completed", workflow_id);
                Ok(())
            }
            Err(WorkflowError::Cancelled(id)) => {
                self.update_progress(workflow_id, |p| p.transition(WorkflowState::Cancelled))
                    .await?;
                warn!("Workflow {} cancelled", workflow_id);
                Err(WorkflowError::Cancelled(id))
            }
            Err(e) => {
                let message = e.to_string();
                self.update_progress(workflow_id, move |p| {
                    p.errors.push(message.clone());
                    p.transition(WorkflowState::Failed);
                })
                .await?;
                error!("Workflow {} failed: {}", workflow_id, e);
                Err(e)
            }
        }
    }

    async fn dispatch(
        &self,
        workflow_id: &str,
        config: Arc<WorkflowConfiguration>,
        tasks: &[WorkflowTask],
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        self.registry.ensure_covers(tasks)?;
        validate_graph(tasks)?;

        let ctx = TaskContext::new(workflow_id, Arc::clone(&config));
        match config.execution_strategy {
            ExecutionStrategy::Sequential => self.run_sequential(tasks, &ctx, token).await,
            ExecutionStrategy::Parallel => self.run_parallel(tasks, &ctx, token).await,
            ExecutionStrategy::Hybrid => self.run_hybrid(tasks, &ctx, token).await,
            ExecutionStrategy::Adaptive => self.run_adaptive(tasks, &ctx, token).await,
        }
    }

    /// Apply a mutation to a stored record through compare-and-swap.
    ///
    /// Terminal records are returned unchanged.
    pub(crate) async fn update_progress<F>(
        &self,
        workflow_id: &str,
        mutate: F,
    ) -> Result<WorkflowProgress, WorkflowError>
    where
        F: Fn(&mut WorkflowProgress) + Send + Sync,
    {
        loop {
            let current = self.get_progress(workflow_id).await?;
            if current.is_terminal() {
                return Ok(current);
            }

            let mut next = current.clone();
            mutate(&mut next);
            next.version = current.version + 1;
            next.updated_at = Utc::now();

            if self
                .store
                .compare_and_swap(workflow_id, current.version, next.clone())
                .await?
            {
                return Ok(next);
            }
            tokio::task::yield_now().await;
        }
    }

    /// Run one task: mark it current, run it with retries, count it done.
    pub(crate) async fn execute_task(
        &self,
        task: &WorkflowTask,
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        if token.is_cancelled() {
            return Err(WorkflowError::Cancelled(ctx.workflow_id.clone()));
        }

        let name = task.name.clone();
        let state = task.task_type.state();
        self.update_progress(&ctx.workflow_id, move |p| {
            p.current_task = Some(name.clone());
            p.current_state = state;
        })
        .await?;

        debug!("Workflow {}: starting task {}", ctx.workflow_id, task.id);
        let output = self.run_task(task, ctx).await?;
        ctx.record(task.id.clone(), output);

        let progress = self
            .update_progress(&ctx.workflow_id, |p| p.record_task_completed())
            .await?;
        debug!(
            "Workflow {}: task {} done ({:.1}%)",
            ctx.workflow_id, task.id, progress.progress_percentage
        );

        if let (Some(tracker), Some(project_id)) = (&self.tracker, &ctx.project_id) {
            tracker.track_progress(
                project_id,
                WORKFLOW_COMPONENT,
                progress.progress_percentage,
                json!({
                    "workflow_id": ctx.workflow_id,
                    "task": task.id,
                    "tasks_completed": progress.tasks_completed,
                    "tasks_total": progress.tasks_total,
                }),
            );
        }

        Ok(())
    }

    /// Invoke the task's handler under its timeout, retrying on failure.
    async fn run_task(
        &self,
        task: &WorkflowTask,
        ctx: &TaskContext,
    ) -> Result<serde_json::Value, WorkflowError> {
        let handler = self
            .registry
            .get(task.task_type)
            .ok_or_else(|| WorkflowError::MissingHandler(task.task_type.as_str().to_string()))?;

        let config = &ctx.config;
        let max_retries = if config.auto_recovery {
            task.max_retries.min(config.max_retries)
        } else {
            0
        };

        let mut attempt = 0;
        loop {
            let result = match tokio::time::timeout(task.timeout(), handler.handle(task, ctx)).await
            {
                Ok(r) => r,
                Err(_) => Err(WorkflowError::Timeout(format!(
                    "task {} exceeded {}s",
                    task.id, task.timeout_secs
                ))),
            };

            match result {
                Ok(output) => return Ok(output),
                Err(e) if attempt < max_retries => {
                    attempt += 1;
                    warn!(
                        "Task {} failed (attempt {}/{}), retrying: {}",
                        task.id,
                        attempt,
                        max_retries + 1,
                        e
                    );
                    let note = format!("Task {} retried after error: {}", task.id, e);
                    self.update_progress(&ctx.workflow_id, move |p| p.warnings.push(note.clone()))
                        .await?;
                    let delay = config.retry_delay_ms.saturating_mul(attempt as u64);
                    tokio::time::sleep(Duration::from_millis(delay)).await;
                }
                Err(e) => {
                    return Err(WorkflowError::TaskFailed {
                        task: task.id.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }
    }
}
