//! Request body limits.
//!
//! # Responsibilities
//! - Parse human-readable size strings ("50mb", "512kb")
//! - Read request bodies without exceeding the configured limit
//!
//! # Design Decisions
//! - Limit is enforced while reading, before the body reaches the resolver
//! - Oversized bodies are rejected with 413 Payload Too Large

use std::error::Error as StdError;

use axum::body::{Body, Bytes};
use http_body_util::LengthLimitError;

use crate::error::ProxyError;

/// Parse a size such as `"50mb"`, `"10 MB"`, `"512kb"` or `"1048576"` into bytes.
///
/// Units are binary (1kb = 1024 bytes). Returns `None` for malformed input.
pub fn parse_byte_size(input: &str) -> Option<usize> {
    let normalized = input.trim().to_ascii_lowercase();
    let split = normalized
        .find(|c: char| !c.is_ascii_digit() && c != '.')
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    let multiplier: f64 = match unit.trim() {
        "" | "b" => 1.0,
        "kb" | "k" => 1024.0,
        "mb" | "m" => 1024.0 * 1024.0,
        "gb" | "g" => 1024.0 * 1024.0 * 1024.0,
        _ => return None,
    };

    let value: f64 = number.parse().ok()?;
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    Some((value * multiplier).floor() as usize)
}

/// Collect the request body, failing once more than `limit` bytes arrive.
///
/// Any other read failure means the caller went away mid-upload.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ProxyError> {
    axum::body::to_bytes(body, limit).await.map_err(|e| {
        if exceeds_limit(&e) {
            tracing::warn!(limit, "Request body over limit");
            ProxyError::PayloadTooLarge { limit }
        } else {
            tracing::debug!(error = %e, "Request body aborted");
            ProxyError::RequestAborted {
                detail: e.to_string(),
            }
        }
    })
}

fn exceeds_limit(err: &(dyn StdError + 'static)) -> bool {
    let mut current = Some(err);
    while let Some(e) = current {
        if e.is::<LengthLimitError>() {
            return true;
        }
        current = e.source();
    }
    false
}
