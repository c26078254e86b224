//! In-process project manager.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde_json::{Value, json};
use tracing::{debug, info};
use uuid::Uuid;

use avp_protocols::{PassFailCriteria, ProjectData, ProjectManager, ProtocolError, VideoAssignment};

struct ProjectRecord {
    data: ProjectData,
    criteria: PassFailCriteria,
    created_at: DateTime<Utc>,
    assignments: Vec<VideoAssignment>,
}

/// [`ProjectManager`] keeping projects in memory.
pub struct MemoryProjectManager {
    projects: DashMap<String, ProjectRecord>,
}

impl MemoryProjectManager {
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }

    /// Stored criteria of a project.
    pub fn criteria(&self, project_id: &str) -> Option<PassFailCriteria> {
        self.projects.get(project_id).map(|r| r.criteria.clone())
    }
}

impl Default for MemoryProjectManager {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ProjectManager for MemoryProjectManager {
    async fn create_project_with_criteria(
        &self,
        project: &ProjectData,
        criteria: &PassFailCriteria,
    ) -> Result<String, ProtocolError> {
        if project.name.trim().is_empty() {
            return Err(ProtocolError::InvalidData(
                "project name must not be empty".to_string(),
            ));
        }

        let project_id = Uuid::new_v4().to_string();
        self.projects.insert(
            project_id.clone(),
            ProjectRecord {
                data: project.clone(),
                criteria: criteria.clone(),
                created_at: Utc::now(),
                assignments: Vec::new(),
            },
        );

        info!("Created project {} ({})", project.name, project_id);
        Ok(project_id)
    }

    async fn get_project_progress(&self, project_id: &str) -> Result<Value, ProtocolError> {
        let record = self
            .projects
            .get(project_id)
            .ok_or_else(|| ProtocolError::ProjectNotFound(project_id.to_string()))?;

        Ok(json!({
            "project_id": project_id,
            "name": record.data.name,
            "camera_model": record.data.camera_model,
            "camera_view": record.data.camera_view,
            "videos_assigned": record.assignments.len(),
            "created_at": record.created_at,
        }))
    }

    async fn assign_videos_to_project(
        &self,
        project_id: &str,
        video_ids: &[String],
    ) -> Result<Vec<VideoAssignment>, ProtocolError> {
        let mut record = self
            .projects
            .get_mut(project_id)
            .ok_or_else(|| ProtocolError::ProjectNotFound(project_id.to_string()))?;

        let mut added = Vec::new();
        for video_id in video_ids {
            let known = record.assignments.iter().any(|a| &a.video_id == video_id)
                || added.iter().any(|a: &VideoAssignment| &a.video_id == video_id);
            if known {
                debug!("Video {} already assigned to {}", video_id, project_id);
                continue;
            }
            added.push(VideoAssignment {
                project_id: project_id.to_string(),
                video_id: video_id.clone(),
                assigned_at: Utc::now(),
            });
        }

        record.assignments.extend(added.iter().cloned());
        Ok(added)
    }
}
