//! Workflow progress store.

use std::collections::HashMap;

use tokio::sync::RwLock;

use crate::definition::WorkflowProgress;
use crate::error::WorkflowError;

/// Shared store of workflow progress records.
///
/// Writers that read-modify-write a record go through
/// [`compare_and_swap`](WorkflowStateStore::compare_and_swap) so that two
/// tasks finishing at once cannot overwrite each other.
#[async_trait::async_trait]
pub trait WorkflowStateStore: Send + Sync {
    /// Load a record by workflow ID.
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowProgress>, WorkflowError>;

    /// Insert or replace a record unconditionally.
    async fn set(&self, progress: WorkflowProgress) -> Result<(), WorkflowError>;

    /// Replace the record only if its stored version equals `expected_version`.
    ///
    /// Returns `false` when the record is missing or was changed in between.
    async fn compare_and_swap(
        &self,
        workflow_id: &str,
        expected_version: u64,
        progress: WorkflowProgress,
    ) -> Result<bool, WorkflowError>;

    /// Delete a record. Returns whether one existed.
    async fn remove(&self, workflow_id: &str) -> Result<bool, WorkflowError>;

    /// All records.
    async fn list(&self) -> Result<Vec<WorkflowProgress>, WorkflowError>;
}

/// In-memory progress store.
pub struct MemoryWorkflowStateStore {
    records: RwLock<HashMap<String, WorkflowProgress>>,
}

impl MemoryWorkflowStateStore {
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl Default for MemoryWorkflowStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl WorkflowStateStore for MemoryWorkflowStateStore {
    async fn get(&self, workflow_id: &str) -> Result<Option<WorkflowProgress>, WorkflowError> {
        let records = self.records.read().await;
        Ok(records.get(workflow_id).cloned())
    }

    async fn set(&self, progress: WorkflowProgress) -> Result<(), WorkflowError> {
        let mut records = self.records.write().await;
        records.insert(progress.workflow_id.clone(), progress);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        workflow_id: &str,
        expected_version: u64,
        progress: WorkflowProgress,
    ) -> Result<bool, WorkflowError> {
        let mut records = self.records.write().await;
        match records.get_mut(workflow_id) {
            Some(current) if current.version == expected_version => {
                *current = progress;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn remove(&self, workflow_id: &str) -> Result<bool, WorkflowError> {
        let mut records = self.records.write().await;
        Ok(records.remove(workflow_id).is_some())
    }

    async fn list(&self) -> Result<Vec<WorkflowProgress>, WorkflowError> {
        let records = self.records.read().await;
        Ok(records.values().cloned().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::ExecutionStrategy;

    fn record(id: &str) -> WorkflowProgress {
        WorkflowProgress::new(id, None, ExecutionStrategy::Sequential, 9)
    }

    #[tokio::test]
    async fn test_set_get_remove() {
        let store = MemoryWorkflowStateStore::new();
        assert!(store.get("wf-1").await.unwrap().is_none());

        store.set(record("wf-1")).await.unwrap();
        let loaded = store.get("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded.tasks_total, 9);
        assert_eq!(store.list().await.unwrap().len(), 1);

        assert!(store.remove("wf-1").await.unwrap());
        assert!(!store.remove("wf-1").await.unwrap());
    }

    #[tokio::test]
    async fn test_compare_and_swap_checks_version() {
        let store = MemoryWorkflowStateStore::new();
        store.set(record("wf-1")).await.unwrap();

        let mut next = record("wf-1");
        next.version = 1;
        next.record_task_completed();
        assert!(store.compare_and_swap("wf-1", 0, next.clone()).await.unwrap());

        // Stale writer still expects version 0.
        let mut stale = record("wf-1");
        stale.version = 1;
        assert!(!store.compare_and_swap("wf-1", 0, stale).await.unwrap());

        let loaded = store.get("wf-1").await.unwrap().unwrap();
        assert_eq!(loaded.tasks_completed, 1);
        assert_eq!(loaded.version, 1);
    }

    #[tokio::test]
    async fn test_compare_and_swap_missing_record() {
        let store = MemoryWorkflowStateStore::new();
        assert!(!store.compare_and_swap("nope", 0, record("nope")).await.unwrap());
    }
}
