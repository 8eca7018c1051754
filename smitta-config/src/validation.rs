//! Custom validation functions for configuration.
//!
//! Provides shared validation logic used across multiple configuration modules.

use std::path::Path;

use once_cell::sync::Lazy;
use regex::Regex;
use validator::ValidationError;

static IDENTIFIER: Lazy<Regex> = Lazy::new(|| {
    Regex::new("^[A-Za-z_][A-Za-z0-9_]*$").expect("identifier pattern is valid")
});

static ENTITY_NAME: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_]*(\[[0-9]+\])?$").expect("entity name pattern is valid")
});

/// Validate a duration in seconds: finite and strictly positive.
pub fn validate_positive_seconds(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_positive_seconds"))
    }
}

/// Validate a point in time in seconds: finite and non-negative.
pub fn validate_non_negative_seconds(value: f64) -> Result<(), ValidationError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ValidationError::new("must_be_non_negative_seconds"))
    }
}

/// Validate that a name can be used as a network or module type name.
pub fn validate_identifier(name: &str) -> Result<(), ValidationError> {
    if IDENTIFIER.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_identifier"))
    }
}

/// Validate a submodule name such as `ddosApp` or `app[0]`.
pub fn validate_entity_name(name: &str) -> Result<(), ValidationError> {
    if ENTITY_NAME.is_match(name) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_entity_name"))
    }
}

pub fn validate_non_empty_path(path: &Path) -> Result<(), ValidationError> {
    if path.as_os_str().is_empty() {
        Err(ValidationError::new("empty_path"))
    } else {
        Ok(())
    }
}

/// Validate the list of resolvable destination hosts.
pub fn validate_hosts(hosts: &[String]) -> Result<(), ValidationError> {
    if hosts.iter().all(|host| validate_identifier(host).is_ok()) {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_host_name"))
    }
}

/// Validate a tracing filter level.
pub fn validate_log_level(level: &str) -> Result<(), ValidationError> {
    let valid = ["trace", "debug", "info", "warn", "error"]
        .contains(&level.to_lowercase().as_str());
    if valid {
        Ok(())
    } else {
        Err(ValidationError::new("invalid_log_level"))
    }
}
