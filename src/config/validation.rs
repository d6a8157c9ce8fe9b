//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, ports valid)
//! - Check size strings and enumerated options
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::security::limits::parse_byte_size;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("upstream.host must not be empty")]
    EmptyUpstreamHost,

    #[error("{field} must be a non-zero port")]
    InvalidPort { field: &'static str },

    #[error("timeouts.request_ms must be greater than zero")]
    ZeroTimeout,

    #[error("timeouts.long_running_multiplier must be at least 1")]
    ZeroMultiplier,

    #[error("limits.body_limit '{0}' is not a valid non-zero size")]
    InvalidBodyLimit(String),

    #[error("observability.log_format '{0}' must be 'pretty' or 'json'")]
    InvalidLogFormat(String),
}

/// Validate a configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.upstream.host.trim().is_empty() {
        errors.push(ValidationError::EmptyUpstreamHost);
    }
    if config.upstream.port == 0 {
        errors.push(ValidationError::InvalidPort { field: "upstream.port" });
    }
    if config.listener.port == 0 {
        errors.push(ValidationError::InvalidPort { field: "listener.port" });
    }
    if config.timeouts.request_ms == 0 {
        errors.push(ValidationError::ZeroTimeout);
    }
    if config.timeouts.long_running_multiplier == 0 {
        errors.push(ValidationError::ZeroMultiplier);
    }
    match parse_byte_size(&config.limits.body_limit) {
        Some(limit) if limit > 0 => {}
        _ => errors.push(ValidationError::InvalidBodyLimit(
            config.limits.body_limit.clone(),
        )),
    }
    if !matches!(config.observability.log_format.as_str(), "pretty" | "json") {
        errors.push(ValidationError::InvalidLogFormat(
            config.observability.log_format.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(validate_config(&ProxyConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_all_errors() {
        let mut config = ProxyConfig::default();
        config.upstream.host = " ".into();
        config.upstream.port = 0;
        config.timeouts.request_ms = 0;
        config.limits.body_limit = "lots".into();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 4);
        assert!(errors.contains(&ValidationError::EmptyUpstreamHost));
        assert!(errors.contains(&ValidationError::InvalidPort { field: "upstream.port" }));
        assert!(errors.contains(&ValidationError::ZeroTimeout));
        assert!(errors.contains(&ValidationError::InvalidBodyLimit("lots".into())));
    }

    #[test]
    fn test_rejects_unknown_log_format() {
        let mut config = ProxyConfig::default();
        config.observability.log_format = "xml".into();
        assert_eq!(
            validate_config(&config).unwrap_err(),
            vec![ValidationError::InvalidLogFormat("xml".into())]
        );
    }
}
