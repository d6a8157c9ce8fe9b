//! HTTP server setup and the proxy pipeline.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID)
//! - Run the pipeline: body limit → normalise → resolve → classify →
//!   dispatch → relay
//! - Map every failure to a structured JSON error

use std::sync::Arc;
use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{HeaderMap, Request},
    response::Response,
    routing::{any, get, options, MethodRouter},
    Json, Router,
};
use chrono::{SecondsFormat, Utc};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::trace::TraceLayer;

use crate::config::ProxySettings;
use crate::error::ProxyError;
use crate::http::request::{
    propagate_request_id_layer, request_id, set_request_id_layer, RequestBody,
};
use crate::http::response::{preflight_response, relay, RelayContext};
use crate::http::upstream::Dispatcher;
use crate::observability::metrics;
use crate::routing::Router as ProxyRouter;
use crate::security::limits::read_body;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<ProxySettings>,
    pub router: Arc<ProxyRouter>,
    pub dispatcher: Dispatcher,
}

impl AppState {
    pub fn new(settings: ProxySettings) -> Self {
        Self {
            router: Arc::new(ProxyRouter::from_settings(&settings)),
            dispatcher: Dispatcher::new(&settings),
            settings: Arc::new(settings),
        }
    }

    /// Correlation id for a request, if the feature is on.
    fn request_id(&self, headers: &HeaderMap) -> Option<String> {
        if self.settings.features.correlation_ids {
            request_id(headers)
        } else {
            None
        }
    }
}

/// HTTP server for the proxy.
pub struct HttpServer {
    router: Router,
    settings: Arc<ProxySettings>,
}

impl HttpServer {
    /// Create a new HTTP server with the given settings.
    pub fn new(settings: ProxySettings) -> Self {
        let state = AppState::new(settings);
        let settings = state.settings.clone();
        let router = Self::build_router(state);
        Self { router, settings }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        let features = state.settings.features;
        tracing::debug!(
            endpoints = state.router.table().routes().len(),
            cors = features.cors_headers,
            correlation_ids = features.correlation_ids,
            "Building router"
        );

        let api: MethodRouter<AppState> = if features.cors_headers {
            options(preflight).fallback(proxy_handler)
        } else {
            any(proxy_handler)
        };

        let router = Router::new()
            .route("/", get(health).fallback(unknown_endpoint))
            .route("/api/{*rest}", api.clone())
            .route("/v1/{*rest}", api)
            .fallback(unknown_endpoint)
            .with_state(state);

        let router = if features.correlation_ids {
            router
                .layer(propagate_request_id_layer())
                .layer(set_request_id_layer())
        } else {
            router
        };

        router.layer(TraceLayer::new_for_http())
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown channel fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.settings.upstream_authority(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router.into_make_service())
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Health/status endpoint.
async fn health() -> Json<Value> {
    Json(json!({
        "status": "running",
        "message": "Ollama Proxy Server is running!",
        "timestamp": Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true),
    }))
}

/// CORS preflight for the proxied path space.
async fn preflight() -> Response {
    preflight_response()
}

/// Paths outside `/api/*` and `/v1/*`.
async fn unknown_endpoint(State(state): State<AppState>, request: Request<Body>) -> Response {
    tracing::warn!(
        method = %request.method(),
        path = %request.uri().path(),
        "No endpoint matched"
    );
    metrics::record_request(request.method().as_str(), "none", 404);
    ProxyError::UnknownEndpoint.into_response_with_id(state.request_id(request.headers()).as_deref())
}

/// Main proxy handler.
async fn proxy_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let started = Instant::now();
    let request_id = state.request_id(request.headers());
    let log_id = request_id.clone().unwrap_or_else(|| "-".to_string());
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match forward(&state, request, &log_id, started).await {
        Ok(response) => response,
        Err(ProxyError::RequestAborted { detail }) => {
            tracing::debug!(
                request_id = %log_id,
                path = %path,
                error = %detail,
                "Caller aborted before the request was read"
            );
            ProxyError::RequestAborted { detail }.into_response_with_id(request_id.as_deref())
        }
        Err(err) => {
            let endpoint = state
                .router
                .resolve(&path)
                .map(|route| route.prefix())
                .unwrap_or("none");
            metrics::record_request(method.as_str(), endpoint, err.status_code().as_u16());

            match &err {
                ProxyError::Timeout { timeout_ms } => tracing::error!(
                    request_id = %log_id,
                    timeout_ms = *timeout_ms as u64,
                    "Proxy request timed out"
                ),
                ProxyError::UpstreamUnavailable { detail }
                | ProxyError::ConnectionClosed { detail }
                | ProxyError::Upstream { detail } => tracing::error!(
                    request_id = %log_id,
                    kind = err.kind(),
                    error = %detail,
                    "Proxy error"
                ),
                _ => tracing::warn!(
                    request_id = %log_id,
                    method = %method,
                    path = %path,
                    status = err.status_code().as_u16(),
                    "Request rejected: {}",
                    err
                ),
            }

            err.into_response_with_id(request_id.as_deref())
        }
    }
}

async fn forward(
    state: &AppState,
    request: Request<Body>,
    request_id: &str,
    started: Instant,
) -> Result<Response, ProxyError> {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path();

    let bytes = read_body(body, state.settings.body_limit).await?;
    let body = RequestBody::normalize(path, &parts.headers, bytes)?;

    let classification = state
        .router
        .match_request(path, body.as_json())
        .ok_or(ProxyError::UnknownEndpoint)?;

    if parts.method != classification.method {
        tracing::debug!(
            request_id = %request_id,
            inbound = %parts.method,
            forwarded = %classification.method,
            "Endpoint table overrides inbound method"
        );
    }

    let upstream_request =
        state
            .dispatcher
            .build_request(&classification, &parts.uri, &parts.headers, &body)?;

    tracing::info!(
        request_id = %request_id,
        method = %classification.method,
        upstream = %state.dispatcher.authority(),
        path = %upstream_request.uri().path(),
        streaming = classification.is_streaming,
        has_body = !body.is_empty(),
        timeout_ms = classification.timeout_ms() as u64,
        "Proxying request"
    );

    let response = state
        .dispatcher
        .dispatch(upstream_request, classification.timeout)
        .await?;

    let status = response.status();
    tracing::info!(
        request_id = %request_id,
        status = status.as_u16(),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Received response"
    );
    metrics::record_request(
        classification.method.as_str(),
        &classification.matched_prefix,
        status.as_u16(),
    );

    let ctx = RelayContext {
        request_id: request_id.to_string(),
        endpoint: classification.matched_prefix,
        started,
        idle_timeout: classification.timeout,
    };
    Ok(relay(response, state.settings.features.cors_headers, ctx))
}
