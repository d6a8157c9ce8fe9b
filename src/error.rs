//! Error handling for the proxy pipeline.
//!
//! Every failure is resolved at the edge of the pipeline into a JSON body
//! with at least an `error` field. Upstream transport failures also carry
//! `details`, and `requestId` is added when correlation ids are enabled.

use std::error::Error as StdError;
use std::io;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Map, Value};
use thiserror::Error;

/// Caller-visible failures of the proxy pipeline.
///
/// The `Display` text is the caller-facing message.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProxyError {
    #[error("Unknown endpoint")]
    UnknownEndpoint,

    #[error("Invalid JSON body")]
    InvalidJsonBody,

    #[error("Request body too large")]
    PayloadTooLarge { limit: usize },

    /// The caller's body failed mid-read; nobody is left to answer.
    #[error("Request aborted")]
    RequestAborted { detail: String },

    #[error("Ollama service unavailable")]
    UpstreamUnavailable { detail: String },

    #[error("Connection closed unexpectedly")]
    ConnectionClosed { detail: String },

    #[error("Request timeout")]
    Timeout { timeout_ms: u128 },

    #[error("Proxy error")]
    Upstream { detail: String },
}

impl ProxyError {
    /// Map a transport failure on the outbound connection.
    ///
    /// Walks the source chain looking for a refused connect or a peer that
    /// hung up mid-exchange; anything else is a generic upstream error.
    pub fn from_transport(err: &(dyn StdError + 'static)) -> Self {
        let detail = error_chain(err);

        let mut current: Option<&(dyn StdError + 'static)> = Some(err);
        while let Some(e) = current {
            if let Some(io_err) = e.downcast_ref::<io::Error>() {
                match io_err.kind() {
                    io::ErrorKind::ConnectionRefused => {
                        return ProxyError::UpstreamUnavailable { detail };
                    }
                    io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::UnexpectedEof
                    | io::ErrorKind::BrokenPipe => {
                        return ProxyError::ConnectionClosed { detail };
                    }
                    _ => {}
                }
            }
            if let Some(hyper_err) = e.downcast_ref::<hyper::Error>() {
                if hyper_err.is_incomplete_message() {
                    return ProxyError::ConnectionClosed { detail };
                }
            }
            current = e.source();
        }

        ProxyError::Upstream { detail }
    }

    /// HTTP status code returned to the caller.
    pub fn status_code(&self) -> StatusCode {
        match self {
            ProxyError::UnknownEndpoint => StatusCode::NOT_FOUND,
            ProxyError::InvalidJsonBody => StatusCode::BAD_REQUEST,
            ProxyError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ProxyError::RequestAborted { .. } => StatusCode::BAD_REQUEST,
            ProxyError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            ProxyError::ConnectionClosed { .. } | ProxyError::Upstream { .. } => {
                StatusCode::BAD_GATEWAY
            }
            ProxyError::Timeout { .. } => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Raw transport error text, for upstream failures only.
    pub fn details(&self) -> Option<&str> {
        match self {
            ProxyError::UpstreamUnavailable { detail }
            | ProxyError::ConnectionClosed { detail }
            | ProxyError::Upstream { detail } => Some(detail),
            _ => None,
        }
    }

    /// Short label used in metrics and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProxyError::UnknownEndpoint => "unknown_endpoint",
            ProxyError::InvalidJsonBody => "invalid_json",
            ProxyError::PayloadTooLarge { .. } => "payload_too_large",
            ProxyError::RequestAborted { .. } => "request_aborted",
            ProxyError::UpstreamUnavailable { .. } => "upstream_unavailable",
            ProxyError::ConnectionClosed { .. } => "connection_closed",
            ProxyError::Timeout { .. } => "timeout",
            ProxyError::Upstream { .. } => "upstream_error",
        }
    }

    /// JSON body for this error.
    pub fn body(&self, request_id: Option<&str>) -> Value {
        let mut body = Map::new();
        body.insert("error".into(), json!(self.to_string()));
        if let Some(details) = self.details() {
            body.insert("details".into(), json!(details));
        }
        if let Some(id) = request_id {
            body.insert("requestId".into(), json!(id));
        }
        Value::Object(body)
    }

    /// Render the error, tagging it with a correlation id if one is given.
    pub fn into_response_with_id(self, request_id: Option<&str>) -> Response {
        (self.status_code(), Json(self.body(request_id))).into_response()
    }
}

impl IntoResponse for ProxyError {
    fn into_response(self) -> Response {
        self.into_response_with_id(None)
    }
}

/// Display every error in the source chain, outermost first.
fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut current: Option<&(dyn StdError + 'static)> = Some(err);
    while let Some(e) = current {
        let text = e.to_string();
        if parts.last() != Some(&text) {
            parts.push(text);
        }
        current = e.source();
    }
    parts.join(": ")
}
