//! Test execution error types.

use thiserror::Error;

/// Test execution error types.
#[derive(Debug, Error)]
pub enum TestExecutionError {
    /// The project has no test sessions to plan.
    #[error("No test sessions found for project {0}")]
    NoTestSessions(String),

    /// A planned session no longer exists.
    #[error("Test session not found: {0}")]
    SessionNotFound(String),

    /// The runner failed to produce metrics.
    #[error("Test runner failed: {0}")]
    Runner(String),

    /// A session exceeded its time budget.
    #[error("Timeout: {0}")]
    Timeout(String),

    /// Session repository failure.
    #[error("Repository error: {0}")]
    Repository(#[from] avp_protocols::ProtocolError),
}
