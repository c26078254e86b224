//! Configuration schema definitions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub workflow: WorkflowSettings,

    #[serde(default)]
    pub test_execution: TestExecutionSettings,

    #[serde(default)]
    pub database: DatabaseConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8000
}

/// Defaults applied to every workflow configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowSettings {
    /// One of "sequential", "parallel", "adaptive", "hybrid".
    #[serde(default = "default_strategy")]
    pub default_strategy: String,

    #[serde(default = "default_max_concurrent_tests")]
    pub max_concurrent_tests: usize,

    /// Deadline for a whole workflow run.
    #[serde(default = "default_timeout_minutes")]
    pub timeout_minutes: u64,

    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Base delay between task retries; multiplied by the attempt number.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,

    #[serde(default = "default_true")]
    pub auto_recovery: bool,

    /// Adaptive scores above this run in parallel.
    #[serde(default = "default_parallel_threshold")]
    pub parallel_threshold: f64,

    /// Adaptive scores below this run sequentially.
    #[serde(default = "default_sequential_threshold")]
    pub sequential_threshold: f64,

    /// How long finished workflow records are kept before pruning.
    #[serde(default = "default_retain_finished_minutes")]
    pub retain_finished_minutes: u64,
}

impl Default for WorkflowSettings {
    fn default() -> Self {
        Self {
            default_strategy: default_strategy(),
            max_concurrent_tests: default_max_concurrent_tests(),
            timeout_minutes: default_timeout_minutes(),
            max_retries: default_max_retries(),
            retry_delay_ms: default_retry_delay_ms(),
            auto_recovery: default_true(),
            parallel_threshold: default_parallel_threshold(),
            sequential_threshold: default_sequential_threshold(),
            retain_finished_minutes: default_retain_finished_minutes(),
        }
    }
}

fn default_strategy() -> String {
    "sequential".to_string()
}

fn default_max_concurrent_tests() -> usize {
    4
}

fn default_timeout_minutes() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_ms() -> u64 {
    500
}

fn default_true() -> bool {
    true
}

fn default_parallel_threshold() -> f64 {
    0.7
}

fn default_sequential_threshold() -> f64 {
    0.3
}

fn default_retain_finished_minutes() -> u64 {
    60
}

/// Test execution settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestExecutionSettings {
    /// Upper bound on sessions running at once across a parallel group.
    #[serde(default = "default_max_workers")]
    pub max_workers: usize,

    /// Duration of a simulated session run.
    #[serde(default = "default_simulated_duration_ms")]
    pub simulated_duration_ms: u64,

    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
}

impl Default for TestExecutionSettings {
    fn default() -> Self {
        Self {
            max_workers: default_max_workers(),
            simulated_duration_ms: default_simulated_duration_ms(),
            session_timeout_secs: default_session_timeout_secs(),
        }
    }
}

fn default_max_workers() -> usize {
    10
}

fn default_simulated_duration_ms() -> u64 {
    1000
}

fn default_session_timeout_secs() -> u64 {
    300
}

/// Database configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// SQLite file holding test sessions. In-memory storage when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;
