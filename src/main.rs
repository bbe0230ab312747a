//! push-server
//!
//! A raw-socket HTTP/1.0/1.1 server with server-sent event streams.
//!
//! # Architecture Overview
//!
//! ```text
//!                        ┌──────────────────────────────────────────────────┐
//!                        │                   PUSH SERVER                    │
//!                        │                                                  │
//!   Client Request       │  ┌─────────┐   ┌─────────┐   ┌──────────────┐    │
//!   ─────────────────────┼─▶│   net   │──▶│ session │──▶│  redirector  │    │
//!                        │  │listener │   │ + codec │   │  + router    │    │
//!                        │  │  + tls  │   └────┬────┘   └──────┬───────┘    │
//!                        │  └─────────┘        │               ▼            │
//!                        │                     │        ┌──────────────┐    │
//!   Client Response      │                     │◀───────│   handlers   │    │
//!   ◀────────────────────┼─────────────────────┘        └──────┬───────┘    │
//!                        │                                     │ upgrade    │
//!   Event stream         │                              ┌──────▼───────┐    │
//!   ◀────────────────────┼──────────────────────────────│ broadcaster  │◀───┼── POST /api
//!                        │                              └──────────────┘    │
//!                        └──────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;

use push_server::config::{load_config, ServerConfig};
use push_server::lifecycle;
use push_server::observability::logging;

#[derive(Parser)]
#[command(name = "push-server", version)]
#[command(about = "HTTP/1.x server with keep-alive, TLS redirect and server-sent events", long_about = None)]
struct Cli {
    /// TOML configuration file; built-in defaults are used when absent.
    #[arg(short, long, env = "PUSH_SERVER_CONFIG")]
    config: Option<PathBuf>,

    /// Log filter, overriding `observability.log_level`.
    #[arg(long)]
    log_level: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => ServerConfig::default(),
    };
    if let Some(level) = cli.log_level {
        config.observability.log_level = level;
    }

    logging::init(&config.observability)?;
    tracing::info!("push-server v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        config_path = ?cli.config,
        bind_host = %config.listener.bind_host,
        plain_port = config.listener.plain_port,
        secure_port = ?config.listener.tls.as_ref().map(|tls| tls.port),
        max_connections = config.listener.max_connections,
        idle_timeout_secs = config.timeouts.idle_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    lifecycle::run(config).await?;
    Ok(())
}
