//! Test runners.

use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use avp_config::TestExecutionSettings;
use avp_protocols::{LatencyThreshold, PassFailCriteria, TestMetrics, TestSession};

use crate::error::TestExecutionError;

/// Runs one test session through the detection model.
#[async_trait]
pub trait TestRunner: Send + Sync {
    async fn run(
        &self,
        session: &TestSession,
        criteria: &PassFailCriteria,
        latency: &LatencyThreshold,
    ) -> Result<TestMetrics, TestExecutionError>;
}

/// Runner that waits a fixed delay and reports fixed metrics.
pub struct SimulatedTestRunner {
    delay: Duration,
    metrics: TestMetrics,
}

impl SimulatedTestRunner {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            metrics: TestMetrics {
                precision: 0.95,
                recall: 0.92,
                f1_score: 0.935,
                latency_ms: 85.0,
                detections: 0,
            },
        }
    }

    pub fn from_settings(settings: &TestExecutionSettings) -> Self {
        Self::new(Duration::from_millis(settings.simulated_duration_ms))
    }

    /// Report these metrics instead of the defaults.
    pub fn with_metrics(mut self, metrics: TestMetrics) -> Self {
        self.metrics = metrics;
        self
    }
}

impl Default for SimulatedTestRunner {
    fn default() -> Self {
        Self::new(Duration::from_secs(1))
    }
}

#[async_trait]
impl TestRunner for SimulatedTestRunner {
    async fn run(
        &self,
        session: &TestSession,
        _criteria: &PassFailCriteria,
        _latency: &LatencyThreshold,
    ) -> Result<TestMetrics, TestExecutionError> {
        debug!(
            "Simulating session {} (video {}) for {:?}",
            session.id, session.video_id, self.delay
        );
        tokio::time::sleep(self.delay).await;
        Ok(self.metrics.clone())
    }
}
