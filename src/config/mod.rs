//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! defaults
//!     → loader.rs (optional TOML file, then env/CLI overrides)
//!     → validation.rs (semantic checks)
//!     → settings.rs (ProxySettings: resolved, immutable)
//!     → shared via Arc with the proxy pipeline
//! ```
//!
//! # Design Decisions
//! - Settings are immutable once loaded; no runtime reload
//! - All fields have defaults to allow running with no config at all
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod settings;
pub mod validation;

pub use loader::{apply_overrides, parse_config_file, ConfigError, Overrides};
pub use schema::{
    FeatureConfig, LimitsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, TimeoutConfig,
    UpstreamConfig,
};
pub use settings::ProxySettings;
