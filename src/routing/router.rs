//! Endpoint resolution and per-request classification.
//!
//! # Responsibilities
//! - Look up the endpoint for a request path
//! - Derive method, streaming flag and timeout for the matched endpoint
//! - Return an explicit no-match rather than a silent default
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) prefix scan in table order (nineteen entries)
//! - The client's method is ignored; the table decides what upstream sees

use std::time::Duration;

use axum::http::Method;
use serde_json::Value;

use crate::config::ProxySettings;
use crate::routing::table::{EndpointRoute, EndpointTable};

/// Everything the pipeline needs to know about a matched request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointClassification {
    pub matched_prefix: String,
    pub method: Method,
    pub is_streaming: bool,
    pub is_long_running: bool,
    pub timeout: Duration,
}

impl EndpointClassification {
    pub fn timeout_ms(&self) -> u128 {
        self.timeout.as_millis()
    }
}

/// Resolves paths against the endpoint table and classifies matches.
#[derive(Debug, Clone)]
pub struct Router {
    table: EndpointTable,
    base_timeout: Duration,
    long_running_multiplier: u32,
    tiering: bool,
}

impl Router {
    pub fn new(table: EndpointTable, settings: &ProxySettings) -> Self {
        Self {
            table,
            base_timeout: settings.base_timeout,
            long_running_multiplier: settings.long_running_multiplier,
            tiering: settings.features.long_running_tiering,
        }
    }

    /// Router over the built-in Ollama endpoint table.
    pub fn from_settings(settings: &ProxySettings) -> Self {
        Self::new(EndpointTable::ollama(), settings)
    }

    pub fn table(&self) -> &EndpointTable {
        &self.table
    }

    /// First route whose prefix the path starts with.
    pub fn resolve(&self, path: &str) -> Option<&EndpointRoute> {
        self.table.resolve(path)
    }

    /// Classify a matched route given the normalised request body.
    pub fn classify(&self, route: &EndpointRoute, body: Option<&Value>) -> EndpointClassification {
        let is_long_running = self.tiering && route.long_running;
        let timeout = if is_long_running {
            self.base_timeout * self.long_running_multiplier
        } else {
            self.base_timeout
        };

        EndpointClassification {
            matched_prefix: route.prefix().to_string(),
            method: route.method.clone(),
            is_streaming: route.streaming && requests_stream(body),
            is_long_running,
            timeout,
        }
    }

    /// Resolve and classify in one step.
    pub fn match_request(&self, path: &str, body: Option<&Value>) -> Option<EndpointClassification> {
        self.resolve(path).map(|route| self.classify(route, body))
    }
}

/// True only for a JSON object whose `stream` field is boolean `true`.
fn requests_stream(body: Option<&Value>) -> bool {
    body.and_then(Value::as_object)
        .and_then(|object| object.get("stream"))
        .and_then(Value::as_bool)
        .unwrap_or(false)
}
