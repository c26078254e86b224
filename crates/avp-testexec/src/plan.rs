//! Execution plans and their results.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use avp_protocols::{TestMetrics, TestSession};

/// Ordered schedule of a project's test sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionPlan {
    pub plan_id: String,
    pub project_id: String,
    /// Sessions sorted by creation time.
    pub sessions: Vec<TestSession>,
    /// Session IDs in run order.
    pub execution_order: Vec<String>,
    /// `execution_order` chunked into groups that may run together.
    pub parallel_groups: Vec<Vec<String>>,
    pub estimated_duration_secs: u64,
    pub created_at: DateTime<Utc>,
}

impl TestExecutionPlan {
    pub fn session_count(&self) -> usize {
        self.execution_order.len()
    }
}

/// Outcome of one session run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionResult {
    pub session_id: String,
    /// The run produced metrics.
    pub success: bool,
    /// The metrics met the pass/fail criteria.
    pub passed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<TestMetrics>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Criteria the metrics missed.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failures: Vec<String>,
    pub duration_ms: u64,
}

impl SessionResult {
    pub fn completed(
        session_id: impl Into<String>,
        metrics: TestMetrics,
        passed: bool,
        failures: Vec<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            success: true,
            passed,
            metrics: Some(metrics),
            error: None,
            failures,
            duration_ms: 0,
        }
    }

    pub fn failed(session_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            success: false,
            passed: false,
            metrics: None,
            error: Some(error.into()),
            failures: Vec::new(),
            duration_ms: 0,
        }
    }

    pub fn with_duration(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }
}

/// Counts over a report's results.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub passed: usize,
}

/// Results of executing a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestExecutionReport {
    pub plan_id: String,
    pub project_id: String,
    pub results: BTreeMap<String, SessionResult>,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub summary: ExecutionSummary,
}

impl TestExecutionReport {
    pub fn new(plan: &TestExecutionPlan, started_at: DateTime<Utc>) -> Self {
        Self {
            plan_id: plan.plan_id.clone(),
            project_id: plan.project_id.clone(),
            results: BTreeMap::new(),
            started_at,
            completed_at: started_at,
            summary: ExecutionSummary::default(),
        }
    }

    pub fn record(&mut self, result: SessionResult) {
        self.results.insert(result.session_id.clone(), result);
    }

    /// Stamp completion and recompute the summary.
    pub fn finish(&mut self) {
        self.completed_at = Utc::now();
        self.summary = ExecutionSummary {
            total: self.results.len(),
            succeeded: self.results.values().filter(|r| r.success).count(),
            failed: self.results.values().filter(|r| !r.success).count(),
            passed: self.results.values().filter(|r| r.passed).count(),
        };
    }

    pub fn all_passed(&self) -> bool {
        !self.results.is_empty() && self.summary.passed == self.summary.total
    }
}
