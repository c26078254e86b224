//! Pass/fail criteria for validation runs.

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;
use crate::session::TestMetrics;

/// Thresholds a test session must meet to be considered passing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PassFailCriteria {
    /// Minimum detection precision (0.0 - 1.0).
    #[serde(default = "default_min_precision")]
    pub min_precision: f64,

    /// Minimum detection recall (0.0 - 1.0).
    #[serde(default = "default_min_recall")]
    pub min_recall: f64,

    /// Minimum F1 score (0.0 - 1.0).
    #[serde(default = "default_min_f1")]
    pub min_f1_score: f64,

    /// Maximum acceptable mean latency in milliseconds.
    #[serde(default = "default_max_latency")]
    pub max_latency_ms: f64,
}

fn default_min_precision() -> f64 {
    0.90
}

fn default_min_recall() -> f64 {
    0.85
}

fn default_min_f1() -> f64 {
    0.87
}

fn default_max_latency() -> f64 {
    100.0
}

impl Default for PassFailCriteria {
    fn default() -> Self {
        Self {
            min_precision: default_min_precision(),
            min_recall: default_min_recall(),
            min_f1_score: default_min_f1(),
            max_latency_ms: default_max_latency(),
        }
    }
}

/// Result of checking metrics against criteria.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CriteriaOutcome {
    pub passed: bool,
    /// One message per violated threshold.
    pub failures: Vec<String>,
}

impl PassFailCriteria {
    /// Serialize to a JSON object.
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "min_precision": self.min_precision,
            "min_recall": self.min_recall,
            "min_f1_score": self.min_f1_score,
            "max_latency_ms": self.max_latency_ms,
        })
    }

    /// Build from a JSON object. Missing fields take their defaults.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, ProtocolError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        let criteria: Self = serde_json::from_value(value.clone())
            .map_err(|e| ProtocolError::InvalidData(format!("pass/fail criteria: {}", e)))?;
        criteria.check_ranges()?;
        Ok(criteria)
    }

    fn check_ranges(&self) -> Result<(), ProtocolError> {
        for (name, v) in [
            ("min_precision", self.min_precision),
            ("min_recall", self.min_recall),
            ("min_f1_score", self.min_f1_score),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(ProtocolError::InvalidData(format!(
                    "{} must be within [0, 1], got {}",
                    name, v
                )));
            }
        }
        if self.max_latency_ms <= 0.0 {
            return Err(ProtocolError::InvalidData(
                "max_latency_ms must be positive".to_string(),
            ));
        }
        Ok(())
    }

    /// Evaluate a session's metrics.
    pub fn evaluate(&self, metrics: &TestMetrics) -> CriteriaOutcome {
        let mut failures = Vec::new();

        if metrics.precision < self.min_precision {
            failures.push(format!(
                "precision {:.3} below {:.3}",
                metrics.precision, self.min_precision
            ));
        }
        if metrics.recall < self.min_recall {
            failures.push(format!(
                "recall {:.3} below {:.3}",
                metrics.recall, self.min_recall
            ));
        }
        if metrics.f1_score < self.min_f1_score {
            failures.push(format!(
                "f1 {:.3} below {:.3}",
                metrics.f1_score, self.min_f1_score
            ));
        }
        if metrics.latency_ms > self.max_latency_ms {
            failures.push(format!(
                "latency {:.1}ms above {:.1}ms",
                metrics.latency_ms, self.max_latency_ms
            ));
        }

        CriteriaOutcome {
            passed: failures.is_empty(),
            failures,
        }
    }
}
