//! API error types.

use axum::http::StatusCode;
use thiserror::Error;

use avp_protocols::ProtocolError;
use avp_testexec::TestExecutionError;
use avp_workflow::WorkflowError;

/// API error types.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request payload.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The project has no stored workflow configuration.
    #[error("No workflow configuration stored for project {0}")]
    ConfigurationMissing(String),

    /// No workflow has been started for the project.
    #[error("No workflow found for project {0}")]
    NoWorkflow(String),

    /// Coordination store failure.
    #[error("Coordination store error: {0}")]
    Coordination(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error(transparent)]
    TestExecution(#[from] TestExecutionError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ApiError {
    /// HTTP status the error maps to.
    ///
    /// Collaborator errors wrapped by the workflow or test layers map the
    /// same as when raised directly.
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidRequest(_) | Self::Serialization(_) => StatusCode::BAD_REQUEST,
            Self::ConfigurationMissing(_) | Self::NoWorkflow(_) => StatusCode::NOT_FOUND,
            Self::Workflow(WorkflowError::WorkflowNotFound(_)) => StatusCode::NOT_FOUND,
            Self::Workflow(WorkflowError::UnknownStrategy(_) | WorkflowError::UnknownTaskType(_)) => {
                StatusCode::BAD_REQUEST
            }
            Self::Workflow(WorkflowError::Collaborator(e)) => protocol_status(e),
            Self::TestExecution(TestExecutionError::NoTestSessions(_)) => StatusCode::BAD_REQUEST,
            Self::TestExecution(TestExecutionError::SessionNotFound(_)) => StatusCode::NOT_FOUND,
            Self::TestExecution(TestExecutionError::Repository(e)) => protocol_status(e),
            Self::Protocol(e) => protocol_status(e),
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

fn protocol_status(err: &ProtocolError) -> StatusCode {
    match err {
        ProtocolError::ProjectNotFound(_) | ProtocolError::SessionNotFound(_) => {
            StatusCode::NOT_FOUND
        }
        ProtocolError::InvalidData(_) => StatusCode::BAD_REQUEST,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(
            ApiError::InvalidRequest("name".to_string()).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(ProtocolError::ProjectNotFound("p1".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(WorkflowError::WorkflowNotFound("wf".to_string())).status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::from(TestExecutionError::NoTestSessions("p1".to_string())).status_code(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            ApiError::from(WorkflowError::Timeout("slow".to_string())).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_wrapped_collaborator_status_codes() {
        let wrapped = WorkflowError::Collaborator(ProtocolError::ProjectNotFound("p1".into()));
        assert_eq!(ApiError::from(wrapped).status_code(), StatusCode::NOT_FOUND);

        let wrapped = WorkflowError::Collaborator(ProtocolError::InvalidData("name".into()));
        assert_eq!(ApiError::from(wrapped).status_code(), StatusCode::BAD_REQUEST);

        let wrapped = TestExecutionError::Repository(ProtocolError::QueryError("locked".into()));
        assert_eq!(
            ApiError::from(wrapped).status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_transparent_display() {
        let err = ApiError::from(ProtocolError::ProjectNotFound("p9".to_string()));
        assert_eq!(err.to_string(), "Project not found: p9");
    }
}
