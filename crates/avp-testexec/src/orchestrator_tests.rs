//! Tests for the test execution orchestrator.

use super::*;
use crate::repository::MemoryTestSessionRepository;
use crate::runner::SimulatedTestRunner;
use async_trait::async_trait;
use avp_protocols::{
    LatencyThreshold, PassFailCriteria, ProtocolError, TestMetrics, TestSession,
};
use chrono::TimeZone;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Repository whose lookups fail for chosen session IDs.
struct FlakyRepository {
    inner: MemoryTestSessionRepository,
    failing: HashSet<String>,
}

#[async_trait]
impl TestSessionRepository for FlakyRepository {
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<TestSession>, ProtocolError> {
        self.inner.list_sessions(project_id).await
    }

    async fn get_session(&self, session_id: &str) -> Result<Option<TestSession>, ProtocolError> {
        if self.failing.contains(session_id) {
            return Err(ProtocolError::QueryError(format!("lookup of {} failed", session_id)));
        }
        self.inner.get_session(session_id).await
    }
}

/// Runner that counts calls and tracks peak concurrency.
struct CountingRunner {
    calls: AtomicUsize,
    running: AtomicUsize,
    peak: AtomicUsize,
    delay: Duration,
}

impl CountingRunner {
    fn new(delay_ms: u64) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            running: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
            delay: Duration::from_millis(delay_ms),
        }
    }
}

#[async_trait]
impl TestRunner for CountingRunner {
    async fn run(
        &self,
        _session: &TestSession,
        _criteria: &PassFailCriteria,
        _latency: &LatencyThreshold,
    ) -> Result<TestMetrics, TestExecutionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        tokio::time::sleep(self.delay).await;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok(TestMetrics {
            precision: 0.95,
            recall: 0.92,
            f1_score: 0.935,
            latency_ms: 85.0,
            detections: 3,
        })
    }
}

/// Sessions s1..=sN for p1, created one minute apart in reverse insertion order.
async fn repository(n: usize) -> MemoryTestSessionRepository {
    let repo = MemoryTestSessionRepository::new();
    let base = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for i in (1..=n).rev() {
        let created = base + chrono::Duration::minutes(i as i64);
        repo.insert(TestSession::new(format!("s{}", i), "p1", format!("v{}", i)).with_created_at(created))
            .await;
    }
    repo
}

fn config(strategy: ExecutionStrategy) -> WorkflowConfiguration {
    WorkflowConfiguration::new("p1").with_strategy(strategy)
}

#[tokio::test]
async fn test_plan_orders_by_creation_and_groups() {
    let orch = TestExecutionOrchestrator::new(
        Arc::new(repository(5).await),
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    );
    let cfg = config(ExecutionStrategy::Parallel).with_max_concurrent_tests(2);
    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();

    assert_eq!(plan.execution_order, vec!["s1", "s2", "s3", "s4", "s5"]);
    assert_eq!(
        plan.parallel_groups,
        vec![vec!["s1", "s2"], vec!["s3", "s4"], vec!["s5"]]
    );
    assert_eq!(plan.estimated_duration_secs, 3 * ESTIMATED_SESSION_SECS);
    assert_eq!(plan.sessions[0].id, "s1");
}

#[tokio::test]
async fn test_plan_ties_broken_by_id() {
    let repo = MemoryTestSessionRepository::new();
    let at = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    for id in ["b", "a", "c"] {
        repo.insert(TestSession::new(id, "p1", "v").with_created_at(at)).await;
    }
    let orch = TestExecutionOrchestrator::new(
        Arc::new(repo),
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    );
    let plan = orch
        .create_execution_plan("p1", &config(ExecutionStrategy::Sequential))
        .await
        .unwrap();
    assert_eq!(plan.execution_order, vec!["a", "b", "c"]);
}

#[tokio::test]
async fn test_plan_without_sessions_fails() {
    let orch = TestExecutionOrchestrator::new(
        Arc::new(MemoryTestSessionRepository::new()),
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    );
    let err = orch
        .create_execution_plan("empty", &config(ExecutionStrategy::Sequential))
        .await
        .unwrap_err();
    assert!(matches!(err, TestExecutionError::NoTestSessions(p) if p == "empty"));
}

#[tokio::test]
async fn test_sequential_run_grades_every_session() {
    let runner = Arc::new(CountingRunner::new(1));
    let orch = TestExecutionOrchestrator::new(Arc::new(repository(3).await), runner.clone());
    let cfg = config(ExecutionStrategy::Sequential);
    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.passed, 3);
    assert!(report.all_passed());
    assert_eq!(runner.peak.load(Ordering::SeqCst), 1);
    assert_eq!(report.plan_id, plan.plan_id);
}

#[tokio::test]
async fn test_sequential_stops_on_failure_without_recovery() {
    let repo = FlakyRepository {
        inner: repository(3).await,
        failing: HashSet::from(["s2".to_string()]),
    };
    let runner = Arc::new(CountingRunner::new(0));
    let orch = TestExecutionOrchestrator::new(Arc::new(repo), runner.clone());
    let cfg = config(ExecutionStrategy::Sequential).with_auto_recovery(false);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    assert_eq!(report.results.len(), 1);
    assert!(report.results.contains_key("s1"));
    assert!(!report.results.contains_key("s3"));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_sequential_continues_with_recovery() {
    let repo = FlakyRepository {
        inner: repository(3).await,
        failing: HashSet::from(["s2".to_string()]),
    };
    let runner = Arc::new(CountingRunner::new(0));
    let orch = TestExecutionOrchestrator::new(Arc::new(repo), runner.clone());
    let cfg = config(ExecutionStrategy::Sequential);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    assert_eq!(report.summary.total, 3);
    assert_eq!(report.summary.failed, 1);
    let failed = &report.results["s2"];
    assert!(!failed.success);
    assert!(failed.error.as_deref().unwrap_or_default().contains("lookup of s2"));
    assert_eq!(runner.calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_parallel_groups_bounded_by_workers() {
    let runner = Arc::new(CountingRunner::new(20));
    let orch = TestExecutionOrchestrator::new(Arc::new(repository(6).await), runner.clone())
        .with_max_workers(2);
    let cfg = config(ExecutionStrategy::Parallel).with_max_concurrent_tests(4);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    assert_eq!(plan.parallel_groups.len(), 2);
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    assert_eq!(report.summary.total, 6);
    assert_eq!(runner.peak.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_parallel_failure_does_not_affect_siblings() {
    let repo = FlakyRepository {
        inner: repository(4).await,
        failing: HashSet::from(["s2".to_string()]),
    };
    let orch = TestExecutionOrchestrator::new(
        Arc::new(repo),
        Arc::new(SimulatedTestRunner::new(Duration::from_millis(1))),
    );
    let cfg = config(ExecutionStrategy::Hybrid).with_auto_recovery(false);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.succeeded, 3);
    assert!(!report.results["s2"].success);
}

#[tokio::test]
async fn test_failing_criteria_marks_not_passed() {
    let runner = SimulatedTestRunner::new(Duration::ZERO).with_metrics(TestMetrics {
        precision: 0.5,
        recall: 0.9,
        f1_score: 0.64,
        latency_ms: 250.0,
        detections: 1,
    });
    let orch = TestExecutionOrchestrator::new(Arc::new(repository(1).await), Arc::new(runner));
    let cfg = config(ExecutionStrategy::Sequential);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    let result = &report.results["s1"];
    assert!(result.success);
    assert!(!result.passed);
    assert_eq!(result.failures.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_session_timeout_recorded() {
    let orch = TestExecutionOrchestrator::new(
        Arc::new(repository(1).await),
        Arc::new(SimulatedTestRunner::new(Duration::from_secs(600))),
    )
    .with_session_timeout(Duration::from_secs(5));
    let cfg = config(ExecutionStrategy::Parallel);

    let plan = orch.create_execution_plan("p1", &cfg).await.unwrap();
    let report = orch.execute_test_plan(&plan, &cfg).await.unwrap();

    let result = &report.results["s1"];
    assert!(!result.success);
    assert!(result.error.as_deref().unwrap_or_default().contains("exceeded 5s"));
}
