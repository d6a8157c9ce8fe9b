//! Timeout enforcement for upstream calls.
//!
//! # Responsibilities
//! - Bound the wait for upstream response headers
//! - Bound the gap between body chunks once streaming has started
//!
//! # Design Decisions
//! - Uses Tokio's timeout facilities; the timed-out future is dropped,
//!   which aborts the outbound connection
//! - Header timeouts become `ProxyError::Timeout` (504)
//! - Body timeouts become `io::ErrorKind::TimedOut`, which closes the
//!   caller connection since the status line is already sent

use std::future::Future;
use std::io;
use std::time::Duration;

use futures_util::{Stream, StreamExt};

use crate::error::ProxyError;

/// Await `fut`, failing with a 504-mapped error after `limit`.
pub async fn await_headers<F: Future>(limit: Duration, fut: F) -> Result<F::Output, ProxyError> {
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| ProxyError::Timeout {
            timeout_ms: limit.as_millis(),
        })
}

/// Pull the next item of `stream`, failing if nothing arrives within `idle`.
pub async fn next_within<S>(stream: &mut S, idle: Duration) -> io::Result<Option<S::Item>>
where
    S: Stream + Unpin,
{
    tokio::time::timeout(idle, stream.next())
        .await
        .map_err(|_| idle_timeout_error(idle))
}

pub fn idle_timeout_error(idle: Duration) -> io::Error {
    io::Error::new(
        io::ErrorKind::TimedOut,
        format!("no data from upstream for {}ms", idle.as_millis()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures_util::stream;

    #[tokio::test]
    async fn test_await_headers_in_time() {
        let value = await_headers(Duration::from_millis(100), async { 7 }).await.unwrap();
        assert_eq!(value, 7);
    }

    #[tokio::test]
    async fn test_await_headers_times_out() {
        let err = await_headers(
            Duration::from_millis(50),
            tokio::time::sleep(Duration::from_secs(10)),
        )
        .await
        .unwrap_err();
        assert_eq!(err, ProxyError::Timeout { timeout_ms: 50 });
    }

    #[tokio::test]
    async fn test_next_within() {
        let mut ready = stream::iter([1, 2]);
        assert_eq!(next_within(&mut ready, Duration::from_millis(10)).await.unwrap(), Some(1));

        let mut stalled = stream::pending::<u8>();
        let err = next_within(&mut stalled, Duration::from_millis(10)).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }
}
