//! Project manager protocol definitions.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::criteria::PassFailCriteria;
use crate::error::ProtocolError;

/// Request payload for creating a validation project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectData {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default)]
    pub camera_model: Option<String>,

    /// Mounting position, e.g. "front-facing VRU".
    #[serde(default)]
    pub camera_view: Option<String>,

    #[serde(default)]
    pub signal_type: Option<String>,

    /// Videos to assign once the project exists.
    #[serde(default)]
    pub video_ids: Vec<String>,
}

impl ProjectData {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_videos(mut self, video_ids: Vec<String>) -> Self {
        self.video_ids = video_ids;
        self
    }
}

/// A video linked to a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoAssignment {
    pub project_id: String,
    pub video_id: String,
    pub assigned_at: DateTime<Utc>,
}

/// Project persistence collaborator.
#[async_trait]
pub trait ProjectManager: Send + Sync {
    /// Persist a project together with its pass/fail criteria and return its ID.
    async fn create_project_with_criteria(
        &self,
        project: &ProjectData,
        criteria: &PassFailCriteria,
    ) -> Result<String, ProtocolError>;

    /// Collaborator-defined progress summary for a project.
    async fn get_project_progress(&self, project_id: &str)
        -> Result<serde_json::Value, ProtocolError>;

    /// Link videos to a project.
    async fn assign_videos_to_project(
        &self,
        project_id: &str,
        video_ids: &[String],
    ) -> Result<Vec<VideoAssignment>, ProtocolError>;
}
