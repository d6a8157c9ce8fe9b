//! Shared utilities for integration tests: a raw-TCP mock Ollama and a
//! helper to run the proxy in front of it.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};

use ollama_proxy::{HttpServer, ProxySettings, Shutdown};

/// What the mock upstream does with each connection.
#[derive(Debug, Clone)]
pub enum Behavior {
    /// Answer with a complete response.
    Respond {
        status: u16,
        content_type: &'static str,
        body: String,
    },
    /// Send chunked body parts with a pause between each.
    Stream {
        chunks: Vec<&'static str>,
        gap: Duration,
    },
    /// Send headers and one chunk, then go silent.
    StallAfterHeaders,
    /// Keep sending chunks until the proxy hangs up.
    Endless { gap: Duration },
    /// Read the request, then close without answering.
    HangUp,
    /// Read the request and never answer.
    Stall,
}

/// A request as seen by the upstream.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub method: String,
    pub target: String,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl CapturedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap()
    }
}

pub struct MockUpstream {
    pub addr: SocketAddr,
    connections: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<CapturedRequest>>>,
    aborted: Arc<AtomicBool>,
}

impl MockUpstream {
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<CapturedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// True once a write to the proxy failed because it hung up.
    pub fn aborted(&self) -> bool {
        self.aborted.load(Ordering::SeqCst)
    }
}

/// Start a mock upstream on an ephemeral port.
pub async fn start_mock_upstream(behavior: Behavior) -> MockUpstream {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let connections = Arc::new(AtomicUsize::new(0));
    let requests = Arc::new(Mutex::new(Vec::new()));
    let aborted = Arc::new(AtomicBool::new(false));

    let (conn_count, captured, abort_flag) = (connections.clone(), requests.clone(), aborted.clone());
    tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, _)) => {
                    conn_count.fetch_add(1, Ordering::SeqCst);
                    let behavior = behavior.clone();
                    let captured = captured.clone();
                    let abort_flag = abort_flag.clone();
                    tokio::spawn(async move {
                        handle(socket, behavior, captured, abort_flag).await;
                    });
                }
                Err(_) => break,
            }
        }
    });

    MockUpstream {
        addr,
        connections,
        requests,
        aborted,
    }
}

/// A port with nothing listening on it.
pub fn closed_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

async fn handle(
    mut socket: TcpStream,
    behavior: Behavior,
    captured: Arc<Mutex<Vec<CapturedRequest>>>,
    aborted: Arc<AtomicBool>,
) {
    let Some(request) = read_request(&mut socket).await else {
        return;
    };
    captured.lock().unwrap().push(request);

    match behavior {
        Behavior::Respond {
            status,
            content_type,
            body,
        } => {
            let response = format!(
                "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nX-Upstream: mock\r\nConnection: close\r\n\r\n{}",
                status,
                reason(status),
                content_type,
                body.len(),
                body
            );
            let _ = socket.write_all(response.as_bytes()).await;
            let _ = socket.shutdown().await;
        }
        Behavior::Stream { chunks, gap } => {
            if write_stream_head(&mut socket).await.is_err() {
                return;
            }
            for (i, chunk) in chunks.iter().enumerate() {
                if i > 0 {
                    tokio::time::sleep(gap).await;
                }
                if write_chunk(&mut socket, chunk).await.is_err() {
                    return;
                }
            }
            let _ = socket.write_all(b"0\r\n\r\n").await;
            let _ = socket.shutdown().await;
        }
        Behavior::StallAfterHeaders => {
            let _ = write_stream_head(&mut socket).await;
            let _ = write_chunk(&mut socket, "{\"response\":\"partial\"}\n").await;
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
        Behavior::Endless { gap } => {
            if write_stream_head(&mut socket).await.is_err() {
                aborted.store(true, Ordering::SeqCst);
                return;
            }
            loop {
                if write_chunk(&mut socket, "{\"response\":\"tok\"}\n").await.is_err() {
                    aborted.store(true, Ordering::SeqCst);
                    return;
                }
                tokio::time::sleep(gap).await;
            }
        }
        Behavior::HangUp => {
            drop(socket);
        }
        Behavior::Stall => {
            tokio::time::sleep(Duration::from_secs(30)).await;
        }
    }
}

async fn write_stream_head(socket: &mut TcpStream) -> std::io::Result<()> {
    socket
        .write_all(
            b"HTTP/1.1 200 OK\r\nContent-Type: application/x-ndjson\r\nTransfer-Encoding: chunked\r\n\r\n",
        )
        .await?;
    socket.flush().await
}

async fn write_chunk(socket: &mut TcpStream, chunk: &str) -> std::io::Result<()> {
    let frame = format!("{:x}\r\n{}\r\n", chunk.len(), chunk);
    socket.write_all(frame.as_bytes()).await?;
    socket.flush().await
}

async fn read_request(socket: &mut TcpStream) -> Option<CapturedRequest> {
    let mut buf = Vec::new();
    let mut tmp = [0u8; 4096];

    let head_end = loop {
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos;
        }
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            return None;
        }
        buf.extend_from_slice(&tmp[..n]);
    };

    let head = String::from_utf8_lossy(&buf[..head_end]).to_string();
    let mut lines = head.split("\r\n");
    let mut request_line = lines.next()?.split_whitespace();
    let method = request_line.next()?.to_string();
    let target = request_line.next()?.to_string();
    let headers: Vec<(String, String)> = lines
        .filter_map(|line| line.split_once(':'))
        .map(|(k, v)| (k.trim().to_ascii_lowercase(), v.trim().to_string()))
        .collect();

    let content_length = headers
        .iter()
        .find(|(k, _)| k == "content-length")
        .and_then(|(_, v)| v.parse::<usize>().ok())
        .unwrap_or(0);

    let mut body = buf[head_end + 4..].to_vec();
    while body.len() < content_length {
        let n = socket.read(&mut tmp).await.ok()?;
        if n == 0 {
            break;
        }
        body.extend_from_slice(&tmp[..n]);
    }

    Some(CapturedRequest {
        method,
        target,
        headers,
        body,
    })
}

fn reason(status: u16) -> &'static str {
    match status {
        200 => "OK",
        404 => "Not Found",
        500 => "Internal Server Error",
        _ => "OK",
    }
}

/// Settings pointing at `upstream_port` on localhost.
pub fn settings_for(upstream_port: u16) -> ProxySettings {
    ProxySettings {
        upstream_host: "127.0.0.1".into(),
        upstream_port,
        bind_address: "127.0.0.1".into(),
        listen_port: 0,
        ..Default::default()
    }
}

/// Run the proxy on an ephemeral port.
pub async fn start_proxy(settings: ProxySettings) -> (SocketAddr, Shutdown) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(settings);
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    (addr, shutdown)
}

/// Log lines written while a capture guard is held on this thread.
#[derive(Clone, Default)]
pub struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

impl CapturedLogs {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }

    pub fn count(&self, message: &str) -> usize {
        self.contents().matches(message).count()
    }
}

impl std::io::Write for CapturedLogs {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

/// Route this thread's tracing output into a buffer.
///
/// `#[tokio::test]` runs a current-thread runtime, so spawned server tasks
/// log through the same guard.
pub fn capture_logs() -> (CapturedLogs, tracing::subscriber::DefaultGuard) {
    let logs = CapturedLogs::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    (logs, tracing::subscriber::set_default(subscriber))
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder()
        .pool_max_idle_per_host(0)
        .no_proxy()
        .build()
        .unwrap()
}
