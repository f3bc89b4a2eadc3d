//! Clevertime Server - HTTP API for the configuration advisors

mod api;

use clevertime_core::config::DEFAULT_PARSE_SERVER;
use std::net::SocketAddr;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// HTTP listen address
    pub http_addr: SocketAddr,
    /// Database server used for remote SQL parsing
    pub parse_server: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: SocketAddr::from(([0, 0, 0, 0], 8088)),
            parse_server: DEFAULT_PARSE_SERVER.to_string(),
        }
    }
}

impl ServerConfig {
    /// Defaults overridden by `CLEVERTIME_HTTP_ADDR` and `CLEVERTIME_PARSE_SERVER`
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("CLEVERTIME_HTTP_ADDR") {
            match addr.parse() {
                Ok(addr) => config.http_addr = addr,
                Err(e) => warn!("Ignoring CLEVERTIME_HTTP_ADDR={}: {}", addr, e),
            }
        }
        if let Ok(server) = std::env::var("CLEVERTIME_PARSE_SERVER") {
            if !server.trim().is_empty() {
                config.parse_server = server;
            }
        }

        config
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize logging
    FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_thread_ids(false)
        .pretty()
        .init();

    let config = ServerConfig::from_env();

    info!("Starting Clevertime server...");
    info!("Remote parse server: {}", config.parse_server);

    let state = api::build_state(&config)?;
    let app = api::create_router(state);

    let listener = tokio::net::TcpListener::bind(&config.http_addr).await?;
    info!("Clevertime server listening on http://{}", config.http_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
