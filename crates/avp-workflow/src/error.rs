//! Workflow error types.

use thiserror::Error;

/// Workflow error types.
#[derive(Debug, Error)]
pub enum WorkflowError {
    /// No progress record for the workflow ID.
    #[error("Workflow not found: {0}")]
    WorkflowNotFound(String),

    /// A task-type tag that names no known task type.
    #[error("Unknown task type: {0}")]
    UnknownTaskType(String),

    /// Unknown strategy name.
    #[error("Unknown execution strategy: {0}")]
    UnknownStrategy(String),

    /// A task type in the pipeline has no registered handler.
    #[error("No handler registered for task type: {0}")]
    MissingHandler(String),

    /// Duplicate IDs, unknown dependencies or cycles.
    #[error("Invalid task graph: {0}")]
    InvalidTaskGraph(String),

    /// A task failed after exhausting its retries.
    #[error("Task {task} failed: {reason}")]
    TaskFailed { task: String, reason: String },

    /// Deadline exceeded.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Workflow was cancelled.
    #[error("Workflow cancelled: {0}")]
    Cancelled(String),

    /// Collaborator failure surfaced by a task handler.
    #[error("Collaborator error: {0}")]
    Collaborator(#[from] avp_protocols::ProtocolError),

    /// State store failure.
    #[error("State store error: {0}")]
    Store(String),

    /// Generic error.
    #[error("{0}")]
    Custom(String),
}
