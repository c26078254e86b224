//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::Config;

const STRATEGIES: [&str; 4] = ["sequential", "parallel", "adaptive", "hybrid"];

/// Validation result.
#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationResult {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, error: ValidationError) {
        self.errors.push(error);
    }

    pub fn add_warning(&mut self, warning: ValidationWarning) {
        self.warnings.push(warning);
    }

    /// Turn the first error into a `ConfigError`.
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(e) => Err(ConfigError::InvalidValue {
                field: e.path,
                message: e.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

/// A validation error.
#[derive(Debug)]
pub struct ValidationError {
    pub path: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// A validation warning.
#[derive(Debug)]
pub struct ValidationWarning {
    pub path: String,
    pub message: String,
}

impl ValidationWarning {
    pub fn new(path: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// Configuration validator.
pub struct ConfigValidator;

impl ConfigValidator {
    /// Validate the configuration.
    pub fn validate(config: &Config) -> ValidationResult {
        let mut result = ValidationResult::default();

        Self::validate_server(config, &mut result);
        Self::validate_workflow(config, &mut result);
        Self::validate_test_execution(config, &mut result);

        result
    }

    fn validate_server(config: &Config, result: &mut ValidationResult) {
        if config.server.port == 0 {
            result.add_error(ValidationError::new("server.port", "Port cannot be 0"));
        }

        if config.server.host.is_empty() {
            result.add_error(ValidationError::new("server.host", "Host cannot be empty"));
        }
    }

    fn validate_workflow(config: &Config, result: &mut ValidationResult) {
        let workflow = &config.workflow;

        if !STRATEGIES.contains(&workflow.default_strategy.as_str()) {
            result.add_error(ValidationError::new(
                "workflow.default_strategy",
                format!(
                    "Unknown strategy '{}', valid values: {:?}",
                    workflow.default_strategy, STRATEGIES
                ),
            ));
        }

        if workflow.max_concurrent_tests == 0 {
            result.add_error(ValidationError::new(
                "workflow.max_concurrent_tests",
                "max_concurrent_tests must be at least 1",
            ));
        }

        if workflow.timeout_minutes == 0 {
            result.add_error(ValidationError::new(
                "workflow.timeout_minutes",
                "timeout_minutes must be greater than 0",
            ));
        }

        let (lo, hi) = (workflow.sequential_threshold, workflow.parallel_threshold);
        if !(0.0..=1.0).contains(&lo) || !(0.0..=1.0).contains(&hi) || lo > hi {
            result.add_error(ValidationError::new(
                "workflow.sequential_threshold",
                format!(
                    "thresholds must satisfy 0 <= sequential ({}) <= parallel ({}) <= 1",
                    lo, hi
                ),
            ));
        }

        if workflow.max_retries > 10 {
            result.add_warning(ValidationWarning::new(
                "workflow.max_retries",
                "max_retries is very high (>10), failing tasks will stall workflows",
            ));
        }
    }

    fn validate_test_execution(config: &Config, result: &mut ValidationResult) {
        let settings = &config.test_execution;

        if settings.max_workers == 0 {
            result.add_error(ValidationError::new(
                "test_execution.max_workers",
                "max_workers must be at least 1",
            ));
        }

        if settings.max_workers > 64 {
            result.add_warning(ValidationWarning::new(
                "test_execution.max_workers",
                "max_workers is very high (>64)",
            ));
        }

        if settings.session_timeout_secs == 0 {
            result.add_error(ValidationError::new(
                "test_execution.session_timeout_secs",
                "session_timeout_secs must be greater than 0",
            ));
        }
    }
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
