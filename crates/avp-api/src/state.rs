//! Application state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use crate::integration::WorkflowApi;
use crate::manager::ProjectWorkflowManager;

/// Application state shared across handlers.
pub struct AppState {
    pub api: WorkflowApi,
    start_time: Instant,
    request_count: AtomicU64,
}

impl AppState {
    pub fn new(manager: Arc<ProjectWorkflowManager>) -> Self {
        Self {
            api: WorkflowApi::new(manager),
            start_time: Instant::now(),
            request_count: AtomicU64::new(0),
        }
    }

    pub fn manager(&self) -> &Arc<ProjectWorkflowManager> {
        self.api.manager()
    }

    /// Get uptime.
    pub fn uptime(&self) -> std::time::Duration {
        self.start_time.elapsed()
    }

    /// Get request count.
    pub fn request_count(&self) -> u64 {
        self.request_count.load(Ordering::Relaxed)
    }

    /// Increment request count.
    pub fn increment_requests(&self) {
        self.request_count.fetch_add(1, Ordering::Relaxed);
    }
}
