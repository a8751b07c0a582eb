//! Configuration validation.

use crate::error::ConfigError;
use crate::schema::{Config, StoreBackend};

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

    /// Convert the first error into a [`ConfigError`].
    pub fn into_result(self) -> Result<Vec<ValidationWarning>, ConfigError> {
        match self.errors.into_iter().next() {
            Some(err) => Err(ConfigError::InvalidValue {
                field: err.path,
                message: err.message,
            }),
            None => Ok(self.warnings),
        }
    }
}

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
    pub fn validate(config: &Config) -> Result<ValidationResult, ConfigError> {
        let mut result = ValidationResult::default();

        Self::validate_xai(config, &mut result);
        Self::validate_x(config, &mut result);
        Self::validate_bus(config, &mut result);
        Self::validate_agent(config, &mut result);
        Self::validate_store(config, &mut result);

        Ok(result)
    }

    fn validate_xai(config: &Config, result: &mut ValidationResult) {
        if !is_http_url(&config.xai.base_url) {
            result.add_error(ValidationError::new(
                "xai.base_url",
                "base_url must start with http:// or https://",
            ));
        }

        if !(0.0..=2.0).contains(&config.xai.temperature) {
            result.add_error(ValidationError::new(
                "xai.temperature",
                "temperature must be between 0 and 2",
            ));
        }

        if config.xai.model.trim().is_empty() {
            result.add_error(ValidationError::new("xai.model", "model cannot be empty"));
        }

        if config.xai.api_key.is_none() {
            result.add_warning(ValidationWarning::new(
                "xai.api_key",
                "API key is not set, it can be stored later with `state set-xai-key`",
            ));
        }
    }

    fn validate_x(config: &Config, result: &mut ValidationResult) {
        if !is_http_url(&config.x.base_url) {
            result.add_error(ValidationError::new(
                "x.base_url",
                "base_url must start with http:// or https://",
            ));
        }
    }

    fn validate_bus(config: &Config, result: &mut ValidationResult) {
        if config.bus.reply_timeout_ms == 0 {
            result.add_error(ValidationError::new(
                "bus.reply_timeout_ms",
                "reply_timeout_ms must be greater than 0",
            ));
        }
    }

    fn validate_agent(config: &Config, result: &mut ValidationResult) {
        let agent = &config.agent;

        if !is_http_url(&agent.build_url) {
            result.add_error(ValidationError::new(
                "agent.build_url",
                "build_url must start with http:// or https://",
            ));
        }

        if agent.control_selector.trim().is_empty() {
            result.add_error(ValidationError::new(
                "agent.control_selector",
                "control_selector cannot be empty",
            ));
        }

        if agent.poll_interval_ms == 0 {
            result.add_error(ValidationError::new(
                "agent.poll_interval_ms",
                "poll_interval_ms must be greater than 0",
            ));
        }

        if agent.poll_timeout_ms < agent.poll_interval_ms {
            result.add_warning(ValidationWarning::new(
                "agent.poll_timeout_ms",
                "poll_timeout_ms is shorter than one poll interval, the control is looked up once",
            ));
        }
    }

    fn validate_store(config: &Config, result: &mut ValidationResult) {
        if config.store.backend == StoreBackend::File && config.store.path.trim().is_empty() {
            result.add_error(ValidationError::new(
                "store.path",
                "path cannot be empty for the file backend",
            ));
        }

        if config.store.backend == StoreBackend::Memory {
            result.add_warning(ValidationWarning::new(
                "store.backend",
                "memory backend does not survive restarts",
            ));
        }
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
