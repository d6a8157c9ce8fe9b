//! Ollama proxy server.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────┐
//!                         │                  OLLAMA PROXY                     │
//!                         │                                                   │
//!     Client Request      │  ┌─────────┐   ┌───────────┐   ┌─────────────┐   │
//!     ────────────────────┼─▶│  limits │──▶│  request  │──▶│   routing   │   │
//!                         │  │ (body)  │   │ normalise │   │ + classify  │   │
//!                         │  └─────────┘   └───────────┘   └──────┬──────┘   │
//!                         │                                       │          │
//!                         │                                       ▼          │
//!     Client Response     │  ┌─────────┐   ┌───────────┐   ┌─────────────┐   │
//!     ◀───────────────────┼──│response │◀──│ timeouts  │◀──│  upstream   │◀──┼──── Ollama
//!                         │  │  relay  │   │ (idle)    │   │  dispatch   │   │
//!                         │  └─────────┘   └───────────┘   └─────────────┘   │
//!                         └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use ollama_proxy::config::{
    apply_overrides, parse_config_file, Overrides, ProxyConfig, ProxySettings,
};
use ollama_proxy::observability::{logging, metrics};
use ollama_proxy::{HttpServer, Shutdown};

#[derive(Parser, Debug)]
#[command(name = "ollama-proxy")]
#[command(about = "Streaming reverse proxy in front of a local Ollama server", version)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "OLLAMA_PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream Ollama host.
    #[arg(long, env = "OLLAMA_HOST")]
    host: Option<String>,

    /// Upstream Ollama port.
    #[arg(long, env = "OLLAMA_PORT")]
    upstream_port: Option<String>,

    /// Port to listen on.
    #[arg(short, long, env = "OLLAMA_PROXY_PORT")]
    port: Option<String>,

    /// Base request timeout in milliseconds.
    #[arg(long, env = "OLLAMA_PROXY_REQUEST_TIMEOUT")]
    timeout_ms: Option<String>,

    /// Maximum request body size (e.g. "50mb").
    #[arg(long, env = "OLLAMA_PROXY_REQUEST_BODY_LIMIT")]
    body_limit: Option<String>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            upstream_host: self.host.clone(),
            upstream_port: self.upstream_port.clone(),
            listen_port: self.port.clone(),
            request_timeout_ms: self.timeout_ms.clone(),
            body_limit: self.body_limit.clone(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => parse_config_file(path)?,
        None => ProxyConfig::default(),
    };
    logging::init_logging(&config.observability)?;
    apply_overrides(&mut config, &cli.overrides());

    tracing::info!("ollama-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let settings = ProxySettings::from_config(&config)?;
    tracing::info!(
        upstream = %settings.upstream_authority(),
        request_timeout_ms = settings.base_timeout.as_millis() as u64,
        body_limit = settings.body_limit,
        cors = settings.features.cors_headers,
        long_running_tiering = settings.features.long_running_tiering,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr)?,
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(settings.listen_address()).await?;
    let local_addr = listener.local_addr()?;
    tracing::info!(address = %local_addr, "Ollama proxy listening");
    tracing::info!(upstream = %settings.upstream_authority(), "Proxying to Ollama");

    let shutdown = Shutdown::new();
    shutdown.trigger_on_signal();

    let server = HttpServer::new(settings);
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
