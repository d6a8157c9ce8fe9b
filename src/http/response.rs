//! Response handling and transformation.
//!
//! # Responsibilities
//! - Relay the upstream status and headers to the caller
//! - Add CORS headers when enabled
//! - Stream the upstream body chunk by chunk
//! - Answer CORS preflight requests locally
//!
//! # Design Decisions
//! - Streaming responses never buffer the entire body; hyper pulls the next
//!   chunk only once the previous one is written, so backpressure follows
//!   the caller
//! - Once headers are sent the status cannot change: a stalled or broken
//!   upstream ends the body with an error and the connection is closed

use std::pin::Pin;
use std::time::{Duration, Instant};

use axum::{
    body::{Body, BodyDataStream, Bytes, HttpBody},
    http::{
        header::{
            ACCESS_CONTROL_ALLOW_HEADERS, ACCESS_CONTROL_ALLOW_METHODS,
            ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_LENGTH,
        },
        HeaderMap, HeaderValue, StatusCode,
    },
    response::{IntoResponse, Response},
    BoxError,
};
use futures_util::stream;

use crate::observability::metrics;
use crate::resilience::timeouts::next_within;

pub const CORS_ALLOW_ORIGIN: &str = "*";
pub const CORS_ALLOW_METHODS: &str = "GET, POST, OPTIONS";
pub const CORS_ALLOW_HEADERS: &str = "Content-Type, Authorization";

/// Set the three CORS headers, replacing any the upstream sent.
pub fn apply_cors(headers: &mut HeaderMap) {
    headers.insert(
        ACCESS_CONTROL_ALLOW_ORIGIN,
        HeaderValue::from_static(CORS_ALLOW_ORIGIN),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(CORS_ALLOW_METHODS),
    );
    headers.insert(
        ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(CORS_ALLOW_HEADERS),
    );
}

/// 200 with CORS headers and no body.
pub fn preflight_response() -> Response {
    let mut response = StatusCode::OK.into_response();
    apply_cors(response.headers_mut());
    response
}

/// Per-request details carried into the body relay for logging.
#[derive(Debug, Clone)]
pub struct RelayContext {
    pub request_id: String,
    pub endpoint: String,
    pub started: Instant,
    pub idle_timeout: Duration,
}

/// Turn the upstream response into the caller response.
pub fn relay<B>(upstream: hyper::Response<B>, cors: bool, ctx: RelayContext) -> Response
where
    B: HttpBody<Data = Bytes> + Send + 'static,
    B::Error: Into<BoxError>,
{
    let (mut parts, body) = upstream.into_parts();
    if cors {
        apply_cors(&mut parts.headers);
    }

    // hyper stops polling a body once `Content-Length` bytes are written,
    // so the relay has to notice the end itself.
    let expected = body.size_hint().exact().or_else(|| declared_length(&parts.headers));
    let relay = Relay {
        inner: Box::pin(Body::new(body).into_data_stream()),
        ctx,
        bytes: 0,
        expected,
        finished: false,
    };

    let body = if relay.is_done() {
        relay.complete();
        Body::empty()
    } else {
        Body::from_stream(relay_stream(relay))
    };
    Response::from_parts(parts, body)
}

fn declared_length(headers: &HeaderMap) -> Option<u64> {
    headers
        .get(CONTENT_LENGTH)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse().ok())
}

struct Relay {
    inner: Pin<Box<BodyDataStream>>,
    ctx: RelayContext,
    bytes: u64,
    expected: Option<u64>,
    finished: bool,
}

impl Relay {
    /// Every declared byte has been relayed.
    fn is_done(&self) -> bool {
        self.expected.is_some_and(|expected| self.bytes >= expected)
    }

    fn complete(self) {
        metrics::record_duration(&self.ctx.endpoint, self.ctx.started);
        tracing::info!(
            request_id = %self.ctx.request_id,
            endpoint = %self.ctx.endpoint,
            bytes = self.bytes,
            elapsed_ms = self.ctx.started.elapsed().as_millis() as u64,
            "Response complete"
        );
        self.finish();
    }

    fn finish(mut self) {
        self.finished = true;
    }
}

impl Drop for Relay {
    fn drop(&mut self) {
        if !self.finished {
            tracing::warn!(
                request_id = %self.ctx.request_id,
                bytes = self.bytes,
                elapsed_ms = self.ctx.started.elapsed().as_millis() as u64,
                "Caller went away, aborting upstream response"
            );
        }
    }
}

fn relay_stream(
    relay: Relay,
) -> impl futures_util::Stream<Item = std::io::Result<Bytes>> + Send + 'static {
    stream::unfold(Some(relay), |state| async move {
        let mut relay = state?;
        let idle = relay.ctx.idle_timeout;

        let next = next_within(&mut relay.inner, idle).await;
        match next {
            Ok(Some(Ok(chunk))) => {
                relay.bytes += chunk.len() as u64;
                if relay.is_done() {
                    relay.complete();
                    Some((Ok(chunk), None))
                } else {
                    Some((Ok(chunk), Some(relay)))
                }
            }
            Ok(None) => {
                relay.complete();
                None
            }
            Ok(Some(Err(e))) => {
                tracing::error!(
                    request_id = %relay.ctx.request_id,
                    error = %e,
                    "Upstream body failed mid-stream, closing connection"
                );
                metrics::record_upstream_error("stream_error");
                relay.finish();
                Some((Err(std::io::Error::other(e)), None))
            }
            Err(e) => {
                tracing::error!(
                    request_id = %relay.ctx.request_id,
                    timeout_ms = idle.as_millis() as u64,
                    "Proxy request timed out after headers were sent, closing connection"
                );
                metrics::record_upstream_error("timeout");
                relay.finish();
                Some((Err(e), None))
            }
        }
    })
}
