//! Execution strategies for the workflow orchestrator.

use futures::future::join_all;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::definition::{ExecutionStrategy, WorkflowTask};
use crate::error::WorkflowError;
use crate::graph::{dependency_levels, topological_order};
use crate::orchestrator::WorkflowOrchestrator;
use crate::registry::TaskContext;

impl WorkflowOrchestrator {
    /// Tasks in list order, one at a time.
    pub(crate) async fn run_sequential(
        &self,
        tasks: &[WorkflowTask],
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        for task in tasks {
            self.execute_task(task, ctx, token).await?;
        }
        Ok(())
    }

    /// Dependency levels in order; every task of a level at once.
    pub(crate) async fn run_parallel(
        &self,
        tasks: &[WorkflowTask],
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        for level in dependency_levels(tasks)? {
            self.run_level(&level, ctx, token).await?;
        }
        Ok(())
    }

    /// Critical tasks one by one, then the rest by dependency level.
    pub(crate) async fn run_hybrid(
        &self,
        tasks: &[WorkflowTask],
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        let (critical, rest): (Vec<WorkflowTask>, Vec<WorkflowTask>) =
            tasks.iter().cloned().partition(|t| t.critical);

        for task in topological_order(&critical)? {
            self.execute_task(&task, ctx, token).await?;
        }
        self.run_parallel(&rest, ctx, token).await
    }

    /// Pick a strategy from the analyzer's complexity score.
    pub(crate) async fn run_adaptive(
        &self,
        tasks: &[WorkflowTask],
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        let score = self.analyzer.analyze(&ctx.config, tasks).await?;
        let chosen = self.select_strategy(score);
        info!(
            "Workflow {}: complexity {:.3}, running {}",
            ctx.workflow_id, score, chosen
        );

        match chosen {
            ExecutionStrategy::Sequential => self.run_sequential(tasks, ctx, token).await,
            ExecutionStrategy::Parallel => self.run_parallel(tasks, ctx, token).await,
            _ => self.run_hybrid(tasks, ctx, token).await,
        }
    }

    pub(crate) fn select_strategy(&self, score: f64) -> ExecutionStrategy {
        if score < self.sequential_threshold {
            ExecutionStrategy::Sequential
        } else if score > self.parallel_threshold {
            ExecutionStrategy::Parallel
        } else {
            ExecutionStrategy::Hybrid
        }
    }

    /// Start all tasks of a level, then wait for every one of them.
    ///
    /// The first failure is returned; later ones are recorded on the workflow.
    async fn run_level(
        &self,
        level: &[WorkflowTask],
        ctx: &TaskContext,
        token: &CancellationToken,
    ) -> Result<(), WorkflowError> {
        let results = join_all(level.iter().map(|task| self.execute_task(task, ctx, token))).await;

        let mut errors = results.into_iter().filter_map(Result::err);
        let Some(first) = errors.next() else {
            return Ok(());
        };

        let others: Vec<String> = errors.map(|e| e.to_string()).collect();
        if !others.is_empty() {
            self.update_progress(&ctx.workflow_id, move |p| {
                p.errors.extend(others.iter().cloned())
            })
            .await?;
        }
        Err(first)
    }
}
