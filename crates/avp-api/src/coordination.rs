//! Coordination store shared by the project workflow manager.
//!
//! Values are JSON documents addressed as `"{namespace}/{key}"`.

use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use serde_json::Value;

use crate::error::ApiError;

pub const CONFIGS: &str = "configs";
pub const WORKFLOWS: &str = "workflows";
pub const ASSIGNMENTS: &str = "assignments";
pub const RESULTS: &str = "results";
pub const REPORTS: &str = "reports";

/// Namespaced JSON key-value store.
#[async_trait]
pub trait CoordinationStore: Send + Sync {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ApiError>;

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ApiError>;

    /// Write `value` only if the current value equals `expected`
    /// (`None` meaning absent). Returns whether the write happened.
    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, ApiError>;

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, ApiError>;
}

/// Process-local coordination store.
pub struct MemoryCoordinationStore {
    entries: DashMap<String, Value>,
}

impl MemoryCoordinationStore {
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    fn key(namespace: &str, key: &str) -> String {
        format!("{}/{}", namespace, key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryCoordinationStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CoordinationStore for MemoryCoordinationStore {
    async fn get(&self, namespace: &str, key: &str) -> Result<Option<Value>, ApiError> {
        Ok(self
            .entries
            .get(&Self::key(namespace, key))
            .map(|v| v.value().clone()))
    }

    async fn set(&self, namespace: &str, key: &str, value: Value) -> Result<(), ApiError> {
        self.entries.insert(Self::key(namespace, key), value);
        Ok(())
    }

    async fn compare_and_swap(
        &self,
        namespace: &str,
        key: &str,
        expected: Option<&Value>,
        value: Value,
    ) -> Result<bool, ApiError> {
        let swapped = match self.entries.entry(Self::key(namespace, key)) {
            Entry::Occupied(mut entry) => {
                if expected == Some(entry.get()) {
                    entry.insert(value);
                    true
                } else {
                    false
                }
            }
            Entry::Vacant(entry) => {
                if expected.is_none() {
                    entry.insert(value);
                    true
                } else {
                    false
                }
            }
        };
        Ok(swapped)
    }

    async fn delete(&self, namespace: &str, key: &str) -> Result<bool, ApiError> {
        Ok(self.entries.remove(&Self::key(namespace, key)).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_namespaces_are_separate() {
        let store = MemoryCoordinationStore::new();
        store.set(CONFIGS, "p1", json!({ "a": 1 })).await.unwrap();
        store.set(RESULTS, "p1", json!({ "b": 2 })).await.unwrap();

        assert_eq!(store.get(CONFIGS, "p1").await.unwrap(), Some(json!({ "a": 1 })));
        assert_eq!(store.get(RESULTS, "p1").await.unwrap(), Some(json!({ "b": 2 })));
        assert_eq!(store.get(WORKFLOWS, "p1").await.unwrap(), None);
        assert_eq!(store.len(), 2);
    }

    #[tokio::test]
    async fn test_compare_and_swap() {
        let store = MemoryCoordinationStore::new();

        assert!(store
            .compare_and_swap(ASSIGNMENTS, "p1", None, json!(["v1"]))
            .await
            .unwrap());
        // Absent expected but value now present.
        assert!(!store
            .compare_and_swap(ASSIGNMENTS, "p1", None, json!(["v2"]))
            .await
            .unwrap());

        let current = json!(["v1"]);
        assert!(store
            .compare_and_swap(ASSIGNMENTS, "p1", Some(&current), json!(["v1", "v2"]))
            .await
            .unwrap());
        assert!(!store
            .compare_and_swap(ASSIGNMENTS, "p1", Some(&current), json!([]))
            .await
            .unwrap());
        assert_eq!(
            store.get(ASSIGNMENTS, "p1").await.unwrap(),
            Some(json!(["v1", "v2"]))
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let store = MemoryCoordinationStore::new();
        store.set(REPORTS, "p1", json!(null)).await.unwrap();
        assert!(store.delete(REPORTS, "p1").await.unwrap());
        assert!(!store.delete(REPORTS, "p1").await.unwrap());
        assert!(store.is_empty());
    }
}
