//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, port).
    pub listener: ListenerConfig,

    /// The single Ollama server every request is forwarded to.
    pub upstream: UpstreamConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Optional pipeline behaviours.
    pub features: FeatureConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Interface to bind (e.g., "0.0.0.0").
    pub bind_address: String,

    /// Port the proxy listens on.
    pub port: u16,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: 4000,
        }
    }
}

/// Upstream server configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Upstream hostname or IP.
    pub host: String,

    /// Upstream port.
    pub port: u16,

    /// Idle connections kept per host. Zero opens a fresh connection
    /// for every request.
    pub max_idle_connections: usize,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 11434,
            max_idle_connections: 0,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Base request timeout in milliseconds.
    pub request_ms: u64,

    /// Factor applied to the base timeout for long-running endpoints
    /// (model pull, push, create, show).
    pub long_running_multiplier: u32,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_ms: 120_000,
            long_running_multiplier: 3,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum request body size, e.g. "50mb", "512kb" or "1048576".
    pub body_limit: String,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            body_limit: "50mb".to_string(),
        }
    }
}

/// Toggles for behaviours that differ between deployments.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct FeatureConfig {
    /// Add CORS headers to relayed responses and answer preflights.
    pub cors_headers: bool,

    /// Give long-running endpoints the multiplied timeout.
    pub long_running_tiering: bool,

    /// Tag requests with `x-request-id` and include it in error bodies.
    pub correlation_ids: bool,

    /// Force `content-type: application/json` on forwarded POSTs.
    pub force_json_content_type: bool,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            cors_headers: true,
            long_running_tiering: true,
            correlation_ids: true,
            force_json_content_type: true,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "json").
    pub log_format: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "pretty".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
