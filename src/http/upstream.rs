//! Upstream dispatch.
//!
//! # Responsibilities
//! - Build the outbound request: table method, verbatim path and query,
//!   sanitised headers, re-serialised JSON body
//! - Send it to the single configured upstream under the classified timeout
//! - Translate transport failures into caller-visible errors
//!
//! # Design Decisions
//! - Idle pooling defaults to zero, so every request opens its own connection
//! - Dropping the returned future aborts the outbound request; this is how
//!   caller disconnects and timeouts cancel work

use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderMap, Method, Request, Uri},
};
use hyper::body::Incoming;
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};

use crate::config::ProxySettings;
use crate::error::ProxyError;
use crate::http::request::RequestBody;
use crate::observability::metrics;
use crate::resilience::timeouts::await_headers;
use crate::routing::EndpointClassification;
use crate::security::headers::upstream_headers;

pub type UpstreamClient = Client<HttpConnector, Body>;

/// Sends classified requests to the upstream.
#[derive(Clone)]
pub struct Dispatcher {
    client: UpstreamClient,
    authority: String,
    force_json: bool,
}

impl Dispatcher {
    pub fn new(settings: &ProxySettings) -> Self {
        let mut connector = HttpConnector::new();
        connector.set_nodelay(true);

        let client = Client::builder(TokioExecutor::new())
            .pool_max_idle_per_host(settings.max_idle_connections)
            .build(connector);

        Self {
            client,
            authority: settings.upstream_authority(),
            force_json: settings.features.force_json_content_type,
        }
    }

    /// `host:port` requests are sent to.
    pub fn authority(&self) -> &str {
        &self.authority
    }

    /// Build the outbound request for a classified inbound request.
    ///
    /// Only POSTs carry a body; GET endpoints never forward a payload.
    pub fn build_request(
        &self,
        classification: &EndpointClassification,
        inbound_uri: &Uri,
        inbound_headers: &HeaderMap,
        body: &RequestBody,
    ) -> Result<Request<Body>, ProxyError> {
        let path_and_query = inbound_uri
            .path_and_query()
            .map(|pq| pq.as_str())
            .unwrap_or("/");
        let uri: Uri = format!("http://{}{}", self.authority, path_and_query)
            .parse()
            .map_err(|e: axum::http::uri::InvalidUri| ProxyError::Upstream {
                detail: e.to_string(),
            })?;

        let method = classification.method.clone();
        let payload = if method == Method::POST {
            body.payload()
        } else {
            None
        };

        let mut request = Request::builder()
            .method(method.clone())
            .uri(uri)
            .body(payload.map(Body::from).unwrap_or_else(Body::empty))
            .map_err(|e| ProxyError::Upstream {
                detail: e.to_string(),
            })?;
        *request.headers_mut() = upstream_headers(inbound_headers, &method, self.force_json);

        Ok(request)
    }

    /// Send the request and wait for response headers.
    pub async fn dispatch(
        &self,
        request: Request<Body>,
        timeout: Duration,
    ) -> Result<hyper::Response<Incoming>, ProxyError> {
        match await_headers(timeout, self.client.request(request)).await {
            Ok(Ok(response)) => Ok(response),
            Ok(Err(e)) => {
                let err = ProxyError::from_transport(&e);
                metrics::record_upstream_error(err.kind());
                Err(err)
            }
            Err(timeout) => {
                metrics::record_upstream_error(timeout.kind());
                Err(timeout)
            }
        }
    }
}
