//! Workflow definitions.

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use avp_config::WorkflowSettings;
use avp_protocols::{LatencyThreshold, PassFailCriteria};

use crate::error::WorkflowError;

/// Workflow priority levels.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowPriority {
    Low,
    #[default]
    Normal,
    High,
    Critical,
}

impl WorkflowPriority {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Normal => "normal",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl FromStr for WorkflowPriority {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "normal" => Ok(Self::Normal),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(WorkflowError::Custom(format!("Unknown priority: {}", other))),
        }
    }
}

/// How the task list of a workflow is scheduled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStrategy {
    #[default]
    Sequential,
    Parallel,
    Adaptive,
    Hybrid,
}

impl ExecutionStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Sequential => "sequential",
            Self::Parallel => "parallel",
            Self::Adaptive => "adaptive",
            Self::Hybrid => "hybrid",
        }
    }
}

impl FromStr for ExecutionStrategy {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "sequential" => Ok(Self::Sequential),
            "parallel" => Ok(Self::Parallel),
            "adaptive" => Ok(Self::Adaptive),
            "hybrid" => Ok(Self::Hybrid),
            other => Err(WorkflowError::UnknownStrategy(other.to_string())),
        }
    }
}

impl fmt::Display for ExecutionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Workflow lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowState {
    Initialized,
    Validating,
    AllocatingResources,
    AssigningVideos,
    LoadingGroundTruth,
    Configuring,
    Executing,
    Analyzing,
    Reporting,
    CleaningUp,
    Paused,
    Completed,
    Failed,
    Cancelled,
}

impl WorkflowState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Initialized => "initialized",
            Self::Validating => "validating",
            Self::AllocatingResources => "allocating_resources",
            Self::AssigningVideos => "assigning_videos",
            Self::LoadingGroundTruth => "loading_ground_truth",
            Self::Configuring => "configuring",
            Self::Executing => "executing",
            Self::Analyzing => "analyzing",
            Self::Reporting => "reporting",
            Self::CleaningUp => "cleaning_up",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Completed, failed and cancelled workflows never change state again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }
}

impl fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The kind of work a pipeline task performs. Handlers are registered per type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    ProjectValidation,
    ResourceAllocation,
    VideoAssignment,
    GroundTruthLoading,
    TestConfiguration,
    TestExecution,
    ResultAnalysis,
    ReportGeneration,
    Cleanup,
}

impl TaskType {
    pub const ALL: [TaskType; 9] = [
        TaskType::ProjectValidation,
        TaskType::ResourceAllocation,
        TaskType::VideoAssignment,
        TaskType::GroundTruthLoading,
        TaskType::TestConfiguration,
        TaskType::TestExecution,
        TaskType::ResultAnalysis,
        TaskType::ReportGeneration,
        TaskType::Cleanup,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProjectValidation => "project_validation",
            Self::ResourceAllocation => "resource_allocation",
            Self::VideoAssignment => "video_assignment",
            Self::GroundTruthLoading => "ground_truth_loading",
            Self::TestConfiguration => "test_configuration",
            Self::TestExecution => "test_execution",
            Self::ResultAnalysis => "result_analysis",
            Self::ReportGeneration => "report_generation",
            Self::Cleanup => "cleanup",
        }
    }

    /// State a workflow is in while a task of this type runs.
    pub fn state(&self) -> WorkflowState {
        match self {
            Self::ProjectValidation => WorkflowState::Validating,
            Self::ResourceAllocation => WorkflowState::AllocatingResources,
            Self::VideoAssignment => WorkflowState::AssigningVideos,
            Self::GroundTruthLoading => WorkflowState::LoadingGroundTruth,
            Self::TestConfiguration => WorkflowState::Configuring,
            Self::TestExecution => WorkflowState::Executing,
            Self::ResultAnalysis => WorkflowState::Analyzing,
            Self::ReportGeneration => WorkflowState::Reporting,
            Self::Cleanup => WorkflowState::CleaningUp,
        }
    }
}

impl FromStr for TaskType {
    type Err = WorkflowError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| WorkflowError::UnknownTaskType(s.to_string()))
    }
}

impl fmt::Display for TaskType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static descriptor of one pipeline task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowTask {
    pub id: String,
    pub name: String,
    pub description: String,
    pub task_type: TaskType,
    /// IDs of tasks that must finish first.
    pub dependencies: Vec<String>,
    /// Critical tasks run one at a time under the hybrid strategy.
    pub critical: bool,
    /// Extra attempts after the first failure.
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl WorkflowTask {
    /// Create a task with no dependencies.
    pub fn new(id: impl Into<String>, name: impl Into<String>, task_type: TaskType) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: String::new(),
            task_type,
            dependencies: Vec::new(),
            critical: false,
            max_retries: 2,
            timeout_secs: 300,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_dependencies(mut self, deps: &[&str]) -> Self {
        self.dependencies = deps.iter().map(|d| d.to_string()).collect();
        self
    }

    pub fn critical(mut self) -> Self {
        self.critical = true;
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_timeout(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// The nine-task validation pipeline.
    pub fn standard_pipeline() -> Vec<WorkflowTask> {
        vec![
            WorkflowTask::new("validate", "Validate project", TaskType::ProjectValidation)
                .with_description("Check the project exists and its criteria are usable")
                .critical()
                .with_timeout(60),
            WorkflowTask::new("allocate", "Allocate resources", TaskType::ResourceAllocation)
                .with_description("Reserve inference workers for the run")
                .with_dependencies(&["validate"])
                .critical()
                .with_timeout(120),
            WorkflowTask::new("assign", "Assign videos", TaskType::VideoAssignment)
                .with_description("Link the requested videos to the project")
                .with_dependencies(&["validate"])
                .critical(),
            WorkflowTask::new("ground_truth", "Load ground truth", TaskType::GroundTruthLoading)
                .with_description("Load annotated VRU detections for assigned videos")
                .with_dependencies(&["assign"])
                .critical()
                .with_timeout(600),
            WorkflowTask::new("configure", "Configure tests", TaskType::TestConfiguration)
                .with_description("Apply latency thresholds and pass/fail criteria")
                .with_dependencies(&["allocate", "ground_truth"])
                .critical(),
            WorkflowTask::new("execute", "Execute tests", TaskType::TestExecution)
                .with_description("Run detection over every test session")
                .with_dependencies(&["configure"])
                .critical()
                .with_max_retries(1)
                .with_timeout(3600),
            WorkflowTask::new("analyze", "Analyze results", TaskType::ResultAnalysis)
                .with_description("Score detections against pass/fail criteria")
                .with_dependencies(&["execute"]),
            WorkflowTask::new("report", "Generate report", TaskType::ReportGeneration)
                .with_description("Summarize the validation outcome")
                .with_dependencies(&["analyze"]),
            WorkflowTask::new("cleanup", "Clean up", TaskType::Cleanup)
                .with_description("Release workers and temporary artifacts")
                .with_dependencies(&["execute"])
                .with_max_retries(0)
                .with_timeout(60),
        ]
    }
}

/// Parameters of one workflow invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowConfiguration {
    /// Assigned once the project has been created.
    pub project_id: Option<String>,
    pub project_name: String,
    pub priority: WorkflowPriority,
    pub execution_strategy: ExecutionStrategy,
    pub max_concurrent_tests: usize,
    pub timeout_minutes: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    pub auto_recovery: bool,
    pub latency_thresholds: LatencyThreshold,
    pub pass_fail_criteria: PassFailCriteria,
    pub video_ids: Vec<String>,
}

impl Default for WorkflowConfiguration {
    fn default() -> Self {
        Self {
            project_id: None,
            project_name: String::new(),
            priority: WorkflowPriority::Normal,
            execution_strategy: ExecutionStrategy::Sequential,
            max_concurrent_tests: 4,
            timeout_minutes: 60,
            max_retries: 3,
            retry_delay_ms: 500,
            auto_recovery: true,
            latency_thresholds: LatencyThreshold::default(),
            pass_fail_criteria: PassFailCriteria::default(),
            video_ids: Vec::new(),
        }
    }
}

impl WorkflowConfiguration {
    /// Configuration for an existing project.
    pub fn new(project_id: impl Into<String>) -> Self {
        Self {
            project_id: Some(project_id.into()),
            ..Default::default()
        }
    }

    /// Seed a configuration from service-level settings.
    pub fn from_settings(settings: &WorkflowSettings) -> Result<Self, WorkflowError> {
        Ok(Self {
            execution_strategy: settings.default_strategy.parse()?,
            max_concurrent_tests: settings.max_concurrent_tests,
            timeout_minutes: settings.timeout_minutes,
            max_retries: settings.max_retries,
            retry_delay_ms: settings.retry_delay_ms,
            auto_recovery: settings.auto_recovery,
            ..Default::default()
        })
    }

    pub fn with_project_name(mut self, name: impl Into<String>) -> Self {
        self.project_name = name.into();
        self
    }

    pub fn with_strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.execution_strategy = strategy;
        self
    }

    pub fn with_priority(mut self, priority: WorkflowPriority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_concurrent_tests(mut self, n: usize) -> Self {
        self.max_concurrent_tests = n;
        self
    }

    pub fn with_timeout_minutes(mut self, minutes: u64) -> Self {
        self.timeout_minutes = minutes;
        self
    }

    pub fn with_max_retries(mut self, max: u32) -> Self {
        self.max_retries = max;
        self
    }

    pub fn with_retry_delay_ms(mut self, ms: u64) -> Self {
        self.retry_delay_ms = ms;
        self
    }

    pub fn with_auto_recovery(mut self, enabled: bool) -> Self {
        self.auto_recovery = enabled;
        self
    }

    pub fn with_criteria(mut self, criteria: PassFailCriteria) -> Self {
        self.pass_fail_criteria = criteria;
        self
    }

    pub fn with_latency_thresholds(mut self, thresholds: LatencyThreshold) -> Self {
        self.latency_thresholds = thresholds;
        self
    }

    pub fn with_videos(mut self, video_ids: Vec<String>) -> Self {
        self.video_ids = video_ids;
        self
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_minutes.saturating_mul(60))
    }
}

/// Mutable progress record of one workflow run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkflowProgress {
    pub workflow_id: String,
    pub project_id: Option<String>,
    pub strategy: ExecutionStrategy,
    pub current_state: WorkflowState,
    /// Always within [0, 100].
    pub progress_percentage: f64,
    /// Never exceeds `tasks_total`.
    pub tasks_completed: usize,
    pub tasks_total: usize,
    pub current_task: Option<String>,
    pub started_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    /// Bumped on every stored mutation.
    pub version: u64,
}

impl WorkflowProgress {
    /// Fresh record in the initialized state.
    pub fn new(
        workflow_id: impl Into<String>,
        project_id: Option<String>,
        strategy: ExecutionStrategy,
        tasks_total: usize,
    ) -> Self {
        let now = Utc::now();
        Self {
            workflow_id: workflow_id.into(),
            project_id,
            strategy,
            current_state: WorkflowState::Initialized,
            progress_percentage: 0.0,
            tasks_completed: 0,
            tasks_total,
            current_task: None,
            started_at: now,
            updated_at: now,
            completed_at: None,
            errors: Vec::new(),
            warnings: Vec::new(),
            version: 0,
        }
    }

    /// Count one more finished task and recompute the percentage.
    pub fn record_task_completed(&mut self) {
        self.tasks_completed = (self.tasks_completed + 1).min(self.tasks_total);
        self.recompute_percentage();
    }

    fn recompute_percentage(&mut self) {
        self.progress_percentage = if self.tasks_total == 0 {
            0.0
        } else {
            (self.tasks_completed as f64 / self.tasks_total as f64 * 100.0).clamp(0.0, 100.0)
        };
    }

    /// Enter a state, stamping the completion time for terminal states.
    pub fn transition(&mut self, state: WorkflowState) {
        self.current_state = state;
        if state.is_terminal() {
            self.completed_at = Some(Utc::now());
            self.current_task = None;
        }
        if state == WorkflowState::Completed && self.tasks_total == 0 {
            self.progress_percentage = 100.0;
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.current_state.is_terminal()
    }
}

#[cfg(test)]
#[path = "definition_tests.rs"]
mod tests;
