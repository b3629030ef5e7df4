//! Validation utilities for CLI arguments and configuration values

use crate::core::error_handling::ContextualError;
use std::fmt;

/// A configuration or argument value that cannot be used
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationError {
    message: String,
}

impl ValidationError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl ContextualError for ValidationError {
    fn is_user_actionable(&self) -> bool {
        true
    }

    fn user_message(&self) -> Option<&str> {
        Some(&self.message)
    }
}

/// Validate positive integer value (used for the idle timeout in seconds)
pub fn validate_positive_int(value: &str) -> Result<u64, String> {
    match value.trim().parse::<u64>() {
        Ok(0) => Err("Value must be greater than 0".to_string()),
        Ok(n) => Ok(n),
        Err(_) => Err(format!("'{}' is not a valid positive integer", value)),
    }
}

/// Validate that a broker URI uses an AMQP scheme
pub fn validate_amqp_uri(uri: &str) -> Result<String, String> {
    let lower = uri.to_ascii_lowercase();
    if lower.starts_with("amqp://") || lower.starts_with("amqps://") {
        Ok(uri.to_string())
    } else {
        Err(format!(
            "'{}' is not an AMQP URI (expected amqp:// or amqps://)",
            uri
        ))
    }
}
