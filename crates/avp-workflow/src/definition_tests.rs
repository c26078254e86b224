//! Tests for workflow definitions.

use super::*;
use std::collections::HashSet;

#[test]
fn test_standard_pipeline_shape() {
    let tasks = WorkflowTask::standard_pipeline();
    let ids: Vec<&str> = tasks.iter().map(|t| t.id.as_str()).collect();
    assert_eq!(
        ids,
        vec![
            "validate",
            "allocate",
            "assign",
            "ground_truth",
            "configure",
            "execute",
            "analyze",
            "report",
            "cleanup"
        ]
    );

    let types: HashSet<TaskType> = tasks.iter().map(|t| t.task_type).collect();
    assert_eq!(types.len(), TaskType::ALL.len());
}

#[test]
fn test_standard_pipeline_is_fresh_each_call() {
    let mut first = WorkflowTask::standard_pipeline();
    first[0].name = "changed".to_string();
    let second = WorkflowTask::standard_pipeline();
    assert_eq!(second[0].name, "Validate project");
}

#[test]
fn test_every_task_type_maps_to_non_terminal_state() {
    let mut states = HashSet::new();
    for task_type in TaskType::ALL {
        let state = task_type.state();
        assert!(!state.is_terminal());
        assert_ne!(state, WorkflowState::Initialized);
        states.insert(state);
    }
    assert_eq!(states.len(), TaskType::ALL.len());
}

#[test]
fn test_task_type_string_round_trip() {
    for task_type in TaskType::ALL {
        assert_eq!(task_type.as_str().parse::<TaskType>().unwrap(), task_type);
    }
    assert!(matches!(
        "validating".parse::<TaskType>(),
        Err(WorkflowError::UnknownTaskType(_))
    ));
}

#[test]
fn test_strategy_parse() {
    assert_eq!(
        "Parallel".parse::<ExecutionStrategy>().unwrap(),
        ExecutionStrategy::Parallel
    );
    assert!(matches!(
        "greedy".parse::<ExecutionStrategy>(),
        Err(WorkflowError::UnknownStrategy(_))
    ));
}

#[test]
fn test_priority_order_and_parse() {
    assert!(WorkflowPriority::Critical > WorkflowPriority::High);
    assert!(WorkflowPriority::Normal > WorkflowPriority::Low);
    assert_eq!(
        "critical".parse::<WorkflowPriority>().unwrap(),
        WorkflowPriority::Critical
    );
}

#[test]
fn test_state_serializes_snake_case() {
    let json = serde_json::to_value(WorkflowState::AllocatingResources).unwrap();
    assert_eq!(json, "allocating_resources");
    assert_eq!(WorkflowState::CleaningUp.to_string(), "cleaning_up");
}

#[test]
fn test_configuration_from_settings() {
    let settings = WorkflowSettings {
        default_strategy: "hybrid".to_string(),
        max_retries: 1,
        ..Default::default()
    };
    let config = WorkflowConfiguration::from_settings(&settings).unwrap();
    assert_eq!(config.execution_strategy, ExecutionStrategy::Hybrid);
    assert_eq!(config.max_retries, 1);
    assert!(config.project_id.is_none());

    let bad = WorkflowSettings {
        default_strategy: "random".to_string(),
        ..Default::default()
    };
    assert!(WorkflowConfiguration::from_settings(&bad).is_err());
}

#[test]
fn test_configuration_timeout() {
    let config = WorkflowConfiguration::new("p1").with_timeout_minutes(2);
    assert_eq!(config.timeout(), Duration::from_secs(120));
    assert_eq!(config.project_id.as_deref(), Some("p1"));
}

#[test]
fn test_progress_completion_is_clamped() {
    let mut progress =
        WorkflowProgress::new("wf", None, ExecutionStrategy::Sequential, 2);
    progress.record_task_completed();
    assert_eq!(progress.progress_percentage, 50.0);
    progress.record_task_completed();
    progress.record_task_completed();
    assert_eq!(progress.tasks_completed, 2);
    assert_eq!(progress.progress_percentage, 100.0);
}

#[test]
fn test_progress_transition_terminal() {
    let mut progress =
        WorkflowProgress::new("wf", Some("p1".to_string()), ExecutionStrategy::Parallel, 9);
    progress.current_task = Some("Execute tests".to_string());
    progress.transition(WorkflowState::Failed);
    assert!(progress.is_terminal());
    assert!(progress.completed_at.is_some());
    assert!(progress.current_task.is_none());
    assert_eq!(progress.tasks_completed, 0);

    let mut done = WorkflowProgress::new("wf2", None, ExecutionStrategy::Sequential, 9);
    done.record_task_completed();
    done.transition(WorkflowState::Completed);
    assert_eq!(done.tasks_completed, 1);
    assert!((done.progress_percentage - 100.0 / 9.0).abs() < 1e-9);

    let mut empty = WorkflowProgress::new("wf3", None, ExecutionStrategy::Sequential, 0);
    empty.transition(WorkflowState::Completed);
    assert_eq!(empty.progress_percentage, 100.0);
}
