//! Tests for the project workflow manager.

use super::*;
use avp_protocols::{ProtocolError, TestMetrics};
use avp_workflow::ExecutionStrategy;

fn manager() -> ProjectWorkflowManager {
    ProjectWorkflowManager::in_memory(
        &Config::default(),
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    )
}

fn videos(ids: &[&str]) -> Vec<String> {
    ids.iter().map(|s| s.to_string()).collect()
}

fn config(manager: &ProjectWorkflowManager, strategy: ExecutionStrategy) -> WorkflowConfiguration {
    manager
        .default_configuration()
        .unwrap()
        .with_strategy(strategy)
        .with_retry_delay_ms(1)
}

#[tokio::test]
async fn test_create_project_workflow_runs_pipeline() {
    let manager = manager();
    let project = ProjectData::new("Front VRU").with_videos(videos(&["v1", "v2", "v3"]));

    let result = manager
        .create_project_workflow(project, config(&manager, ExecutionStrategy::Sequential))
        .await
        .unwrap();
    assert_eq!(result.state, WorkflowState::Completed);
    assert_eq!(result.progress_percentage, 100.0);

    let progress = manager.get_workflow_progress(&result.workflow_id).await.unwrap();
    assert_eq!(progress.project_id.as_deref(), Some(result.project_id.as_str()));
    assert!(progress.errors.is_empty());

    let status = manager.get_project_status(&result.project_id).await.unwrap();
    assert_eq!(status["project"]["name"], "Front VRU");
    assert_eq!(status["project"]["videos_assigned"], 3);
    assert_eq!(status["workflow"]["current_state"], "completed");
    assert_eq!(status["results"]["summary"]["total"], 3);
    assert_eq!(status["results"]["all_passed"], true);
    assert_eq!(status["report"]["analysis"]["all_passed"], true);
    assert_eq!(status["report"]["project_name"], "Front VRU");
}

#[tokio::test]
async fn test_every_strategy_completes() {
    let manager = manager();
    for strategy in [
        ExecutionStrategy::Sequential,
        ExecutionStrategy::Parallel,
        ExecutionStrategy::Hybrid,
        ExecutionStrategy::Adaptive,
    ] {
        let project = ProjectData::new(format!("p-{}", strategy)).with_videos(videos(&["a", "b"]));
        let result = manager
            .create_project_workflow(project, config(&manager, strategy))
            .await
            .unwrap();
        assert_eq!(result.state, WorkflowState::Completed, "{}", strategy);

        let results = manager
            .coordination()
            .get(crate::coordination::RESULTS, &result.project_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(results["summary"]["total"], 2, "{}", strategy);
    }
}

#[tokio::test]
async fn test_project_without_videos_skips_execution() {
    let manager = manager();
    let result = manager
        .create_project_workflow(
            ProjectData::new("empty"),
            config(&manager, ExecutionStrategy::Sequential),
        )
        .await
        .unwrap();
    assert_eq!(result.state, WorkflowState::Completed);

    let status = manager.get_project_status(&result.project_id).await.unwrap();
    assert!(status["results"].is_null());
    assert_eq!(status["report"]["execution"]["skipped"], true);
    assert_eq!(status["report"]["analysis"]["analyzed"], false);
}

#[tokio::test]
async fn test_overall_progress_after_workflow() {
    let manager = manager();
    let project = ProjectData::new("tracked").with_videos(videos(&["v1"]));
    let result = manager
        .create_project_workflow(project, config(&manager, ExecutionStrategy::Parallel))
        .await
        .unwrap();

    let overall = manager.tracker().get_overall_progress(&result.project_id);
    assert_eq!(overall.components.get(WORKFLOW_COMPONENT), Some(&100.0));
    assert_eq!(overall.components.get("video_assignment"), Some(&100.0));
    assert_eq!(overall.components.get("testing"), Some(&100.0));
    assert_eq!(overall.overall_progress, 100.0);
}

#[tokio::test]
async fn test_assign_then_run_tests() {
    let manager = manager();
    let project = ProjectData::new("growing").with_videos(videos(&["v1"]));
    let result = manager
        .create_project_workflow(project, config(&manager, ExecutionStrategy::Sequential))
        .await
        .unwrap();

    let added = manager
        .assign_videos(&result.project_id, &videos(&["v1", "v2", "v3"]))
        .await
        .unwrap();
    assert_eq!(added.len(), 2);

    let stored = manager
        .coordination()
        .get(crate::coordination::ASSIGNMENTS, &result.project_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.as_array().map(Vec::len), Some(3));

    let report = manager.run_tests(&result.project_id).await.unwrap();
    assert_eq!(report.summary.total, 3);
    assert!(report.all_passed());
}

#[tokio::test]
async fn test_failing_metrics_are_reported() {
    let runner = SimulatedTestRunner::new(Duration::ZERO).with_metrics(TestMetrics {
        precision: 0.5,
        recall: 0.92,
        f1_score: 0.9,
        latency_ms: 320.0,
        detections: 4,
    });
    let manager = ProjectWorkflowManager::in_memory(&Config::default(), Arc::new(runner));
    let project = ProjectData::new("weak").with_videos(videos(&["v1"]));
    let result = manager
        .create_project_workflow(project, config(&manager, ExecutionStrategy::Sequential))
        .await
        .unwrap();

    let status = manager.get_project_status(&result.project_id).await.unwrap();
    assert_eq!(status["results"]["all_passed"], false);
    let analysis = &status["report"]["analysis"];
    assert_eq!(analysis["failed_sessions"].as_array().map(Vec::len), Some(1));
    let levels = analysis["latency_levels"].as_object().unwrap();
    assert!(levels.values().all(|level| level == "critical"));
}

#[tokio::test]
async fn test_run_tests_without_configuration() {
    let manager = manager();
    let err = manager.run_tests("missing").await.unwrap_err();
    assert!(matches!(err, ApiError::ConfigurationMissing(_)));
}

#[tokio::test]
async fn test_empty_project_name_rejected() {
    let manager = manager();
    let err = manager
        .create_project_workflow(
            ProjectData::new(""),
            config(&manager, ExecutionStrategy::Sequential),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::Protocol(ProtocolError::InvalidData(_))));
}

#[tokio::test]
async fn test_unknown_project_status() {
    let manager = manager();
    let err = manager.get_project_status("nope").await.unwrap_err();
    assert!(matches!(err, ApiError::Protocol(ProtocolError::ProjectNotFound(_))));
}

#[tokio::test]
async fn test_cancel_finished_and_unknown() {
    let manager = manager();
    assert!(matches!(
        manager.cancel_project_workflow("nope").await,
        Err(ApiError::NoWorkflow(_))
    ));

    let result = manager
        .create_project_workflow(
            ProjectData::new("done"),
            config(&manager, ExecutionStrategy::Sequential),
        )
        .await
        .unwrap();
    assert!(!manager.cancel_project_workflow(&result.project_id).await.unwrap());
}

#[tokio::test]
async fn test_cancel_background_workflow() {
    let manager = Arc::new(ProjectWorkflowManager::in_memory(
        &Config::default(),
        Arc::new(SimulatedTestRunner::new(Duration::from_secs(30))),
    ));
    let project = ProjectData::new("slow").with_videos(videos(&["v1"]));
    let started = manager
        .start_project_workflow(project, config(&manager, ExecutionStrategy::Sequential))
        .await
        .unwrap();
    assert_eq!(started.state, WorkflowState::Initialized);

    let mut executing = false;
    for _ in 0..500 {
        let progress = manager.get_workflow_progress(&started.workflow_id).await.unwrap();
        if progress.current_state == WorkflowState::Executing {
            executing = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(executing);

    assert!(manager.cancel_project_workflow(&started.project_id).await.unwrap());

    let mut final_state = None;
    for _ in 0..500 {
        let progress = manager.get_workflow_progress(&started.workflow_id).await.unwrap();
        if progress.is_terminal() {
            final_state = Some(progress.current_state);
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert_eq!(final_state, Some(WorkflowState::Cancelled));
}

#[tokio::test]
async fn test_from_config_with_sqlite() {
    let dir = tempfile::tempdir().unwrap();
    let mut service_config = Config::default();
    service_config.database.path = Some(dir.path().join("sessions.db"));
    service_config.test_execution.simulated_duration_ms = 0;

    let manager = ProjectWorkflowManager::from_config(&service_config).await.unwrap();
    let project = ProjectData::new("persisted").with_videos(videos(&["v1", "v2"]));
    let result = manager
        .create_project_workflow(project, config(&manager, ExecutionStrategy::Sequential))
        .await
        .unwrap();
    assert_eq!(result.state, WorkflowState::Completed);

    let report = manager.run_tests(&result.project_id).await.unwrap();
    assert_eq!(report.summary.total, 2);
}

#[tokio::test]
async fn test_prune_keeps_recent_workflows() {
    let manager = manager();
    manager
        .create_project_workflow(
            ProjectData::new("recent"),
            config(&manager, ExecutionStrategy::Sequential),
        )
        .await
        .unwrap();

    assert_eq!(manager.prune_finished().await.unwrap(), 0);
    assert_eq!(manager.orchestrator().list_workflows().await.unwrap().len(), 1);
}


#[tokio::test]
async fn test_status_survives_pruned_workflow() {
    let mut service_config = Config::default();
    service_config.workflow.retain_finished_minutes = 0;
    let manager = ProjectWorkflowManager::in_memory(
        &service_config,
        Arc::new(SimulatedTestRunner::new(Duration::ZERO)),
    );
    let result = manager
        .create_project_workflow(
            ProjectData::new("short-lived").with_videos(videos(&["v1"])),
            config(&manager, ExecutionStrategy::Sequential),
        )
        .await
        .unwrap();

    assert_eq!(manager.prune_finished().await.unwrap(), 1);

    let status = manager.get_project_status(&result.project_id).await.unwrap();
    assert_eq!(status["workflow"]["workflow_id"], result.workflow_id.as_str());
    assert_eq!(status["workflow"]["pruned"], true);
    assert_eq!(status["results"]["summary"]["total"], 1);
}
