//! Workflow complexity scoring for the adaptive strategy.

use async_trait::async_trait;

use crate::definition::{WorkflowConfiguration, WorkflowPriority, WorkflowTask};
use crate::error::WorkflowError;
use crate::graph::dependency_levels;

/// Scores a workflow in `[0, 1]`; higher means more worth parallelizing.
#[async_trait]
pub trait ComplexityAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        config: &WorkflowConfiguration,
        tasks: &[WorkflowTask],
    ) -> Result<f64, WorkflowError>;
}

/// Score from video count, allowed concurrency, graph width and priority.
pub struct HeuristicComplexityAnalyzer;

impl HeuristicComplexityAnalyzer {
    const VIDEO_SATURATION: f64 = 50.0;
    const CONCURRENCY_SATURATION: f64 = 16.0;

    fn score(config: &WorkflowConfiguration, tasks: &[WorkflowTask]) -> Result<f64, WorkflowError> {
        let videos = (config.video_ids.len() as f64 / Self::VIDEO_SATURATION).min(1.0);
        let concurrency =
            (config.max_concurrent_tests as f64 / Self::CONCURRENCY_SATURATION).min(1.0);

        let parallelism = if tasks.is_empty() {
            0.0
        } else {
            let levels = dependency_levels(tasks)?.len();
            (tasks.len() - levels) as f64 / tasks.len() as f64
        };

        let priority = match config.priority {
            WorkflowPriority::Critical => 0.1,
            WorkflowPriority::High => 0.05,
            _ => 0.0,
        };

        Ok((videos * 0.4 + concurrency * 0.3 + parallelism * 0.2 + priority).clamp(0.0, 1.0))
    }
}

#[async_trait]
impl ComplexityAnalyzer for HeuristicComplexityAnalyzer {
    async fn analyze(
        &self,
        config: &WorkflowConfiguration,
        tasks: &[WorkflowTask],
    ) -> Result<f64, WorkflowError> {
        Self::score(config, tasks)
    }
}
