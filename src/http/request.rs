//! Request handling and transformation.
//!
//! # Responsibilities
//! - Tag each request with a correlation id (`x-request-id`)
//! - Normalise the request body into JSON where the API expects it
//! - Produce the payload forwarded to the upstream
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - JSON and form bodies are parsed by content type; other bytes on API
//!   paths are re-parsed as JSON text, elsewhere they stay raw
//! - Parsed bodies are re-serialised, so the upstream always sees compact JSON

use axum::body::Bytes;
use axum::http::{header::CONTENT_TYPE, HeaderMap, HeaderName};
use serde_json::{Map, Value};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};

use crate::error::ProxyError;

/// Header carrying the correlation id.
pub const X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Path prefixes whose raw bodies are re-parsed as JSON.
const API_PREFIXES: [&str; 2] = ["/api/", "/v1/"];

/// Layer assigning a UUID v4 `x-request-id` to requests that lack one.
pub fn set_request_id_layer() -> SetRequestIdLayer<MakeRequestUuid> {
    SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid)
}

/// Layer copying the request's `x-request-id` onto the response.
pub fn propagate_request_id_layer() -> PropagateRequestIdLayer {
    PropagateRequestIdLayer::new(X_REQUEST_ID.clone())
}

/// Read the correlation id from request headers.
pub fn request_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

/// A request body after normalisation.
#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Raw(Bytes),
}

impl RequestBody {
    /// Normalise raw body bytes according to content type and path.
    pub fn normalize(path: &str, headers: &HeaderMap, bytes: Bytes) -> Result<Self, ProxyError> {
        if bytes.is_empty() {
            return Ok(RequestBody::Empty);
        }

        match content_kind(headers) {
            ContentKind::Json => parse_json(&bytes).map(RequestBody::Json),
            ContentKind::Form => Ok(RequestBody::Json(decode_form(&bytes))),
            ContentKind::Other if is_api_path(path) => parse_json(&bytes).map(RequestBody::Json),
            ContentKind::Other => Ok(RequestBody::Raw(bytes)),
        }
    }

    pub fn as_json(&self) -> Option<&Value> {
        match self {
            RequestBody::Json(value) => Some(value),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, RequestBody::Empty)
    }

    /// Bytes to send upstream, `None` when there is no body.
    pub fn payload(&self) -> Option<Bytes> {
        match self {
            RequestBody::Empty => None,
            RequestBody::Json(value) => serde_json::to_vec(value).ok().map(Bytes::from),
            RequestBody::Raw(bytes) => Some(bytes.clone()),
        }
    }
}

enum ContentKind {
    Json,
    Form,
    Other,
}

fn content_kind(headers: &HeaderMap) -> ContentKind {
    let essence = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|v| v.trim().to_ascii_lowercase())
        .unwrap_or_default();

    if essence == "application/json" || essence.ends_with("+json") {
        ContentKind::Json
    } else if essence == "application/x-www-form-urlencoded" {
        ContentKind::Form
    } else {
        ContentKind::Other
    }
}

fn is_api_path(path: &str) -> bool {
    API_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
}

fn parse_json(bytes: &[u8]) -> Result<Value, ProxyError> {
    serde_json::from_slice(bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejecting unparseable JSON body");
        ProxyError::InvalidJsonBody
    })
}

/// Decode a form body into a JSON object of strings.
///
/// Bracketed keys nest (`options[temperature]=0.7` becomes
/// `{"options": {"temperature": "0.7"}}`), `key[]` appends to an array and
/// repeated plain keys become arrays.
fn decode_form(bytes: &[u8]) -> Value {
    let mut root = Value::Object(Map::new());
    for (key, value) in url::form_urlencoded::parse(bytes) {
        insert_form_value(&mut root, &key_path(&key), Value::String(value.into_owned()));
    }
    root
}

/// Split `a[b][]` into `["a", "b", ""]`; malformed brackets keep the key whole.
fn key_path(key: &str) -> Vec<&str> {
    let open = match key.find('[') {
        Some(open) if open > 0 => open,
        _ => return vec![key],
    };

    let mut path = vec![&key[..open]];
    let mut rest = &key[open..];
    while let Some(inner) = rest.strip_prefix('[') {
        let Some(close) = inner.find(']') else {
            return vec![key];
        };
        path.push(&inner[..close]);
        rest = &inner[close + 1..];
    }

    if rest.is_empty() {
        path
    } else {
        vec![key]
    }
}

fn insert_form_value(target: &mut Value, path: &[&str], value: Value) {
    let Some((segment, rest)) = path.split_first() else {
        return;
    };

    match target {
        Value::Array(items) if segment.is_empty() => {
            if rest.is_empty() {
                items.push(value);
            } else {
                let mut child = Value::Object(Map::new());
                insert_form_value(&mut child, rest, value);
                items.push(child);
            }
        }
        Value::Object(map) if !segment.is_empty() => {
            if let Some(next) = rest.first() {
                let child = map
                    .entry(segment.to_string())
                    .or_insert_with(|| empty_container(next));
                insert_form_value(child, rest, value);
                return;
            }
            match map.get_mut(*segment) {
                Some(Value::Array(values)) => values.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    map.insert(segment.to_string(), value);
                }
            }
        }
        _ => tracing::debug!(key = %segment, "Dropping form field that conflicts with an earlier one"),
    }
}

fn empty_container(next: &str) -> Value {
    if next.is_empty() {
        Value::Array(Vec::new())
    } else {
        Value::Object(Map::new())
    }
}
