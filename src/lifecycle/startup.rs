//! Startup orchestration.
//!
//! # Responsibilities
//! - Initialize subsystems in dependency order
//! - Start background tasks (metrics, heartbeats)
//! - Bind listeners and begin accepting traffic
//! - Drain on shutdown
//!
//! # Design Decisions
//! - Fail fast: failing to bind either port or load TLS material is fatal
//! - Listeners start last (traffic only when ready)
//! - Shutdown has a deadline: in-flight sessions get `shutdown_grace_secs`

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::ServerConfig;
use crate::events::Broadcaster;
use crate::http::server::{AppState, HttpServer};
use crate::lifecycle::shutdown::Shutdown;
use crate::lifecycle::signals::wait_for_shutdown_signal;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::{Listener, ListenerError};
use crate::net::tls::{TlsAcceptor, TlsError};
use crate::observability::metrics;

/// Fatal startup failures.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error(transparent)]
    Tls(#[from] TlsError),
}

/// A running server.
#[derive(Debug)]
pub struct ServerHandle {
    plain_addr: SocketAddr,
    secure_addr: Option<SocketAddr>,
    broadcaster: Arc<Broadcaster>,
    tracker: ConnectionTracker,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// Bound address of the plain listener.
    pub fn plain_addr(&self) -> SocketAddr {
        self.plain_addr
    }

    /// Bound address of the secure listener, when TLS is configured.
    pub fn secure_addr(&self) -> Option<SocketAddr> {
        self.secure_addr
    }

    /// The broadcaster external event sources publish through.
    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    pub fn active_connections(&self) -> u64 {
        self.tracker.active_count()
    }

    /// Stop accepting, close event streams, and wait up to `grace` for
    /// in-flight sessions.
    pub async fn shutdown(self, grace: Duration) {
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(error) = task.await {
                tracing::error!(%error, "Server task failed");
            }
        }

        let closed = self.broadcaster.close_all();
        tracing::info!(event_streams = closed, "Event streams closed");

        if self.tracker.wait_for_drain(grace).await {
            tracing::info!("All connections drained");
        } else {
            tracing::warn!(
                remaining = self.tracker.active_count(),
                grace_secs = grace.as_secs(),
                "Shutdown deadline passed with connections still open"
            );
        }
    }
}

/// Bind listeners and start serving `config`.
pub async fn start(config: &ServerConfig) -> Result<ServerHandle, StartupError> {
    let broadcaster = Arc::new(Broadcaster::new(config.timeouts.sse_write()));
    let state = AppState::from_config(config, Arc::clone(&broadcaster));
    tracing::info!(
        routes = state.router.len(),
        secure_only_routes = ?config.redirect.secure_only_routes,
        "Routing configured"
    );

    // Both ports are bound before either one serves.
    let plain = Listener::bind(config.listener.plain_addr(), config.listener.max_connections).await?;
    let secure = match (&config.listener.tls, config.listener.secure_addr()) {
        (Some(tls), Some(addr)) => {
            let acceptor = TlsAcceptor::from_config(tls).await?;
            let listener = Listener::bind(addr, config.listener.max_connections).await?;
            Some((listener, acceptor))
        }
        _ => None,
    };

    let server = HttpServer::new(state);
    let shutdown = Shutdown::new();
    let plain_addr = plain.local_addr();
    let secure_addr = secure.as_ref().map(|(listener, _)| listener.local_addr());
    let mut tasks = Vec::new();

    {
        let server = server.clone();
        let signal = shutdown.subscribe();
        tasks.push(tokio::spawn(async move { server.serve(plain, None, signal).await }));
    }
    if let Some((listener, acceptor)) = secure {
        let server = server.clone();
        let signal = shutdown.subscribe();
        tasks.push(tokio::spawn(async move {
            server.serve(listener, Some(acceptor), signal).await
        }));
    }
    if let Some(every) = config.sse.heartbeat() {
        tasks.push(broadcaster.spawn_heartbeat(every, shutdown.subscribe()));
    }

    Ok(ServerHandle {
        plain_addr,
        secure_addr,
        broadcaster,
        tracker: server.tracker().clone(),
        shutdown,
        tasks,
    })
}

/// Run the server until SIGINT/SIGTERM, then drain.
pub async fn run(config: ServerConfig) -> Result<(), StartupError> {
    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let handle = start(&config).await?;
    tracing::info!(
        plain_addr = %handle.plain_addr(),
        secure_addr = ?handle.secure_addr(),
        "Server ready"
    );

    let signal = wait_for_shutdown_signal().await;
    tracing::info!(signal, "Shutdown signal received");
    handle.shutdown(config.timeouts.shutdown_grace()).await;
    tracing::info!("Shutdown complete");
    Ok(())
}
