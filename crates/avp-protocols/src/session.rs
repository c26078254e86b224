//! Test session protocol definitions.
//!
//! A test session pairs a project with one video to be run through the
//! detection model. Rows live in the platform database; this crate only
//! defines the read interface the orchestration layer needs.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Lifecycle of a test session row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestSessionStatus {
    Created,
    Running,
    Completed,
    Failed,
}

impl TestSessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

/// A test session for one video within a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestSession {
    pub id: String,
    pub project_id: String,
    pub video_id: String,
    pub name: String,
    pub status: TestSessionStatus,
    pub created_at: DateTime<Utc>,
}

impl TestSession {
    /// Create a session stamped with the current time.
    pub fn new(
        id: impl Into<String>,
        project_id: impl Into<String>,
        video_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            name: format!("session-{}", id),
            id,
            project_id: project_id.into(),
            video_id: video_id.into(),
            status: TestSessionStatus::Created,
            created_at: Utc::now(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }
}

/// Detection metrics produced by running a test session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestMetrics {
    pub precision: f64,
    pub recall: f64,
    pub f1_score: f64,
    /// Mean per-frame latency in milliseconds.
    pub latency_ms: f64,
    /// Number of VRU detections produced.
    pub detections: u64,
}

/// Read access to test session rows.
#[async_trait]
pub trait TestSessionRepository: Send + Sync {
    /// All sessions belonging to a project, in storage order.
    async fn list_sessions(&self, project_id: &str) -> Result<Vec<TestSession>, ProtocolError>;

    /// Look up a single session.
    async fn get_session(&self, session_id: &str) -> Result<Option<TestSession>, ProtocolError>;
}
