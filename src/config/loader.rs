//! Configuration loading from disk and the environment.

use std::fs;
use std::path::Path;
use std::str::FromStr;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::ValidationError;

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Values supplied through environment variables or command-line flags.
///
/// Kept as raw strings so that malformed numbers fall back to the
/// previous value instead of aborting startup.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub upstream_host: Option<String>,
    pub upstream_port: Option<String>,
    pub listen_port: Option<String>,
    pub request_timeout_ms: Option<String>,
    pub body_limit: Option<String>,
}

/// Parse a TOML configuration file without validating it.
pub fn parse_config_file(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Apply overrides on top of a configuration.
pub fn apply_overrides(config: &mut ProxyConfig, overrides: &Overrides) {
    if let Some(host) = non_empty(&overrides.upstream_host) {
        config.upstream.host = host.to_string();
    }
    if let Some(limit) = non_empty(&overrides.body_limit) {
        config.limits.body_limit = limit.to_string();
    }

    override_number(&mut config.upstream.port, &overrides.upstream_port, "OLLAMA_PORT");
    override_number(&mut config.listener.port, &overrides.listen_port, "OLLAMA_PROXY_PORT");
    override_number(
        &mut config.timeouts.request_ms,
        &overrides.request_timeout_ms,
        "OLLAMA_PROXY_REQUEST_TIMEOUT",
    );
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn override_number<T>(target: &mut T, raw: &Option<String>, name: &str)
where
    T: FromStr + std::fmt::Display,
{
    let Some(raw) = non_empty(raw) else {
        return;
    };
    match raw.parse::<T>() {
        Ok(value) => *target = value,
        Err(_) => tracing::warn!(
            setting = name,
            value = raw,
            fallback = %target,
            "Ignoring non-numeric setting"
        ),
    }
}
