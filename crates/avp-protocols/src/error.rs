//! Collaborator error types.

use thiserror::Error;

/// Errors raised by project and test-session collaborators.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("Project not found: {0}")]
    ProjectNotFound(String),

    #[error("Test session not found: {0}")]
    SessionNotFound(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Storage error: {0}")]
    StorageError(String),

    #[error("Query error: {0}")]
    QueryError(String),
}
