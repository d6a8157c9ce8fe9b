//! Streaming reverse proxy for a local Ollama server.
//!
//! Forwards the native `/api/*` endpoints and the OpenAI-compatible `/v1/*`
//! endpoints to one upstream, relaying responses chunk by chunk.

pub mod config;
pub mod error;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod security;

pub use config::{ProxyConfig, ProxySettings};
pub use error::ProxyError;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
