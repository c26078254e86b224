//! Latency thresholds for detection pipelines.

use serde::{Deserialize, Serialize};

/// Latency budget for a validation workflow, all values in milliseconds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LatencyThreshold {
    #[serde(default = "default_detection")]
    pub detection_latency_ms: f64,

    #[serde(default = "default_processing")]
    pub processing_latency_ms: f64,

    #[serde(default = "default_end_to_end")]
    pub end_to_end_latency_ms: f64,

    #[serde(default = "default_signal_processing")]
    pub signal_processing_latency_ms: f64,

    /// Latency at or above which a run is flagged.
    #[serde(default = "default_warning")]
    pub warning_threshold_ms: f64,

    /// Latency at or above which a run is considered critical.
    #[serde(default = "default_critical")]
    pub critical_threshold_ms: f64,
}

fn default_detection() -> f64 {
    100.0
}

fn default_processing() -> f64 {
    200.0
}

fn default_end_to_end() -> f64 {
    500.0
}

fn default_signal_processing() -> f64 {
    50.0
}

fn default_warning() -> f64 {
    150.0
}

fn default_critical() -> f64 {
    300.0
}

impl Default for LatencyThreshold {
    fn default() -> Self {
        Self {
            detection_latency_ms: default_detection(),
            processing_latency_ms: default_processing(),
            end_to_end_latency_ms: default_end_to_end(),
            signal_processing_latency_ms: default_signal_processing(),
            warning_threshold_ms: default_warning(),
            critical_threshold_ms: default_critical(),
        }
    }
}

/// Severity bucket for an observed latency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LatencyLevel {
    Ok,
    Warning,
    Critical,
}

impl LatencyThreshold {
    /// Classify an observed latency against the warning/critical thresholds.
    pub fn classify(&self, latency_ms: f64) -> LatencyLevel {
        if latency_ms >= self.critical_threshold_ms {
            LatencyLevel::Critical
        } else if latency_ms >= self.warning_threshold_ms {
            LatencyLevel::Warning
        } else {
            LatencyLevel::Ok
        }
    }
}
