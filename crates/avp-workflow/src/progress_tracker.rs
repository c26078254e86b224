//! Per-project, per-component progress board.
//!
//! Writes are last-write-wins with no monotonicity; every write notifies all
//! registered callbacks synchronously. A failing or panicking callback is
//! logged and never affects the stored record or the remaining callbacks.

use std::collections::BTreeMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::WorkflowError;

/// Latest progress reported by one component of one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub project_id: String,
    pub component: String,
    pub progress: f64,
    pub metadata: Value,
    pub updated_at: DateTime<Utc>,
}

/// Aggregate over every component of a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OverallProgress {
    pub project_id: String,
    /// Arithmetic mean of component progress; 0 when nothing is tracked.
    pub overall_progress: f64,
    pub components: BTreeMap<String, f64>,
    pub last_updated: Option<DateTime<Utc>>,
}

/// Callback invoked after each progress write.
pub type ProgressCallback = Arc<dyn Fn(&ProgressRecord) -> Result<(), WorkflowError> + Send + Sync>;

/// Thread-safe progress board keyed by `"{project}:{component}"`.
pub struct ProgressTracker {
    records: DashMap<String, ProgressRecord>,
    callbacks: RwLock<Vec<ProgressCallback>>,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            callbacks: RwLock::new(Vec::new()),
        }
    }

    fn key(project_id: &str, component: &str) -> String {
        format!("{}:{}", project_id, component)
    }

    /// Overwrite a component's progress and notify callbacks.
    pub fn track_progress(
        &self,
        project_id: &str,
        component: &str,
        progress: f64,
        metadata: Value,
    ) -> ProgressRecord {
        let record = ProgressRecord {
            project_id: project_id.to_string(),
            component: component.to_string(),
            progress,
            metadata,
            updated_at: Utc::now(),
        };
        self.records
            .insert(Self::key(project_id, component), record.clone());
        debug!("Progress {}:{} = {:.1}", project_id, component, progress);

        // Snapshot so callbacks may register further callbacks.
        let callbacks: Vec<ProgressCallback> = self.callbacks.read().clone();
        for callback in callbacks {
            match catch_unwind(AssertUnwindSafe(|| callback(&record))) {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!("Progress callback failed: {}", e),
                Err(_) => warn!("Progress callback panicked"),
            }
        }

        record
    }

    pub fn add_callback<F>(&self, callback: F)
    where
        F: Fn(&ProgressRecord) -> Result<(), WorkflowError> + Send + Sync + 'static,
    {
        self.callbacks.write().push(Arc::new(callback));
    }

    pub fn get_progress(&self, project_id: &str, component: &str) -> Option<ProgressRecord> {
        self.records
            .get(&Self::key(project_id, component))
            .map(|r| r.value().clone())
    }

    pub fn get_overall_progress(&self, project_id: &str) -> OverallProgress {
        let mut components = BTreeMap::new();
        let mut last_updated: Option<DateTime<Utc>> = None;

        for entry in self.records.iter() {
            let record = entry.value();
            if record.project_id != project_id {
                continue;
            }
            components.insert(record.component.clone(), record.progress);
            last_updated = Some(match last_updated {
                Some(t) if t >= record.updated_at => t,
                _ => record.updated_at,
            });
        }

        let overall_progress = if components.is_empty() {
            0.0
        } else {
            components.values().sum::<f64>() / components.len() as f64
        };

        OverallProgress {
            project_id: project_id.to_string(),
            overall_progress,
            components,
            last_updated,
        }
    }

    /// Forget every component of a project. Returns how many were removed.
    pub fn clear_project(&self, project_id: &str) -> usize {
        let before = self.records.len();
        self.records.retain(|_, r| r.project_id != project_id);
        before - self.records.len()
    }
}

impl Default for ProgressTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_last_write_wins() {
        let tracker = ProgressTracker::new();
        tracker.track_progress("p1", "testing", 80.0, json!({}));
        tracker.track_progress("p1", "testing", 20.0, json!({ "phase": "retry" }));

        let record = tracker.get_progress("p1", "testing").unwrap();
        assert_eq!(record.progress, 20.0);
        assert_eq!(record.metadata["phase"], "retry");
        assert_eq!(tracker.get_overall_progress("p1").components.len(), 1);
    }

    #[test]
    fn test_overall_is_mean_of_components() {
        let tracker = ProgressTracker::new();
        tracker.track_progress("p1", "a", 50.0, Value::Null);
        tracker.track_progress("p1", "b", 100.0, Value::Null);
        tracker.track_progress("p10", "a", 0.0, Value::Null);

        let overall = tracker.get_overall_progress("p1");
        assert_eq!(overall.overall_progress, 75.0);
        assert_eq!(overall.components.len(), 2);
        assert!(overall.last_updated.is_some());
    }

    #[test]
    fn test_overall_empty_project() {
        let tracker = ProgressTracker::new();
        let overall = tracker.get_overall_progress("ghost");
        assert_eq!(overall.overall_progress, 0.0);
        assert!(overall.components.is_empty());
        assert!(overall.last_updated.is_none());
    }

    #[test]
    fn test_failing_callback_does_not_block_others() {
        let tracker = ProgressTracker::new();
        let calls = Arc::new(AtomicUsize::new(0));

        tracker.add_callback(|_| Err(WorkflowError::Custom("boom".to_string())));
        tracker.add_callback(|_| panic!("callback panic"));
        let seen = calls.clone();
        tracker.add_callback(move |record| {
            assert_eq!(record.component, "testing");
            seen.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });

        let record = tracker.track_progress("p1", "testing", 40.0, Value::Null);
        assert_eq!(record.progress, 40.0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(tracker.get_progress("p1", "testing").unwrap().progress, 40.0);
    }

    #[test]
    fn test_clear_project() {
        let tracker = ProgressTracker::new();
        tracker.track_progress("p1", "a", 10.0, Value::Null);
        tracker.track_progress("p1", "b", 10.0, Value::Null);
        tracker.track_progress("p2", "a", 10.0, Value::Null);

        assert_eq!(tracker.clear_project("p1"), 2);
        assert!(tracker.get_progress("p1", "a").is_none());
        assert!(tracker.get_progress("p2", "a").is_some());
    }
}
