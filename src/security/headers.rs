//! Header sanitation for upstream requests.
//!
//! # Responsibilities
//! - Copy inbound headers onto the upstream request
//! - Strip framing headers invalidated by re-serialising the body
//! - Force a JSON content type on POSTs when configured
//!
//! # Design Decisions
//! - Only `host`, `content-length` and `transfer-encoding` are removed;
//!   hyper recomputes framing for the new body
//! - Repeated headers keep every value

use axum::http::{
    header::{CONTENT_LENGTH, CONTENT_TYPE, HOST, TRANSFER_ENCODING},
    HeaderMap, HeaderName, HeaderValue, Method,
};

/// Headers never copied to the upstream request.
pub const STRIPPED_HEADERS: [HeaderName; 3] = [HOST, CONTENT_LENGTH, TRANSFER_ENCODING];

/// Build the header set for the upstream request.
pub fn upstream_headers(inbound: &HeaderMap, method: &Method, force_json: bool) -> HeaderMap {
    let mut headers = HeaderMap::with_capacity(inbound.len());
    for (name, value) in inbound {
        if !STRIPPED_HEADERS.contains(name) {
            headers.append(name.clone(), value.clone());
        }
    }

    if force_json && method == Method::POST {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }

    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inbound() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(HOST, HeaderValue::from_static("proxy:4000"));
        headers.insert(CONTENT_LENGTH, HeaderValue::from_static("42"));
        headers.insert(TRANSFER_ENCODING, HeaderValue::from_static("chunked"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        headers.insert("authorization", HeaderValue::from_static("Bearer t"));
        headers.append("x-tag", HeaderValue::from_static("a"));
        headers.append("x-tag", HeaderValue::from_static("b"));
        headers
    }

    #[test]
    fn test_strips_framing_headers() {
        let headers = upstream_headers(&inbound(), &Method::GET, true);

        assert!(headers.get(HOST).is_none());
        assert!(headers.get(CONTENT_LENGTH).is_none());
        assert!(headers.get(TRANSFER_ENCODING).is_none());
        assert_eq!(headers["authorization"], "Bearer t");
        assert_eq!(headers.get_all("x-tag").iter().count(), 2);
    }

    #[test]
    fn test_forces_json_on_post() {
        let headers = upstream_headers(&inbound(), &Method::POST, true);
        assert_eq!(headers[CONTENT_TYPE], "application/json");
    }

    #[test]
    fn test_get_keeps_content_type() {
        let headers = upstream_headers(&inbound(), &Method::GET, true);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
    }

    #[test]
    fn test_force_disabled_keeps_content_type() {
        let headers = upstream_headers(&inbound(), &Method::POST, false);
        assert_eq!(headers[CONTENT_TYPE], "text/plain");
    }
}
