//! Resolved, read-only settings consumed by the proxy pipeline.

use std::time::Duration;

use crate::config::loader::ConfigError;
use crate::config::schema::{FeatureConfig, ProxyConfig};
use crate::config::validation::{validate_config, ValidationError};
use crate::security::limits::parse_byte_size;

/// Process-wide proxy settings, built once at startup and shared via `Arc`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProxySettings {
    pub upstream_host: String,
    pub upstream_port: u16,
    pub max_idle_connections: usize,
    pub bind_address: String,
    pub listen_port: u16,
    pub base_timeout: Duration,
    pub long_running_multiplier: u32,
    pub body_limit: usize,
    pub features: FeatureConfig,
}

impl ProxySettings {
    /// Validate a configuration and resolve it into settings.
    pub fn from_config(config: &ProxyConfig) -> Result<Self, ConfigError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let body_limit = parse_byte_size(&config.limits.body_limit).ok_or_else(|| {
            ConfigError::Validation(vec![ValidationError::InvalidBodyLimit(
                config.limits.body_limit.clone(),
            )])
        })?;

        Ok(Self {
            upstream_host: config.upstream.host.trim().to_string(),
            upstream_port: config.upstream.port,
            max_idle_connections: config.upstream.max_idle_connections,
            bind_address: config.listener.bind_address.clone(),
            listen_port: config.listener.port,
            base_timeout: Duration::from_millis(config.timeouts.request_ms),
            long_running_multiplier: config.timeouts.long_running_multiplier,
            body_limit,
            features: config.features,
        })
    }

    /// `host:port` of the upstream, bracketing bare IPv6 literals.
    pub fn upstream_authority(&self) -> String {
        if self.upstream_host.contains(':') && !self.upstream_host.starts_with('[') {
            format!("[{}]:{}", self.upstream_host, self.upstream_port)
        } else {
            format!("{}:{}", self.upstream_host, self.upstream_port)
        }
    }

    /// Address the listener binds to.
    pub fn listen_address(&self) -> String {
        format!("{}:{}", self.bind_address, self.listen_port)
    }
}

impl Default for ProxySettings {
    fn default() -> Self {
        let config = ProxyConfig::default();
        Self {
            upstream_host: config.upstream.host,
            upstream_port: config.upstream.port,
            max_idle_connections: config.upstream.max_idle_connections,
            bind_address: config.listener.bind_address,
            listen_port: config.listener.port,
            base_timeout: Duration::from_millis(config.timeouts.request_ms),
            long_running_multiplier: config.timeouts.long_running_multiplier,
            body_limit: 50 * 1024 * 1024,
            features: config.features,
        }
    }
}
