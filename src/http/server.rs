//! HTTP server setup and the accept loop.
//!
//! # Responsibilities
//! - Build the shared application state (router, redirector, broadcaster)
//! - Accept connections on a listener, plain or TLS
//! - Spawn one session task per connection
//! - Stop accepting on shutdown without touching handed-off streams

use std::sync::Arc;
use std::time::Duration;

use crate::config::ServerConfig;
use crate::events::Broadcaster;
use crate::handlers::default_router;
use crate::http::codec::CodecLimits;
use crate::http::request::{ConnectionInfo, Scheme};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionTracker;
use crate::net::listener::Listener;
use crate::net::session::{Outcome, Session};
use crate::net::tls::TlsAcceptor;
use crate::routing::{Redirector, Router};

/// Pause after an accept error so a persistent failure (e.g. fd exhaustion)
/// does not spin the loop.
const ACCEPT_ERROR_BACKOFF: Duration = Duration::from_millis(50);

/// State shared by every session.
#[derive(Debug)]
pub struct AppState {
    pub router: Router,
    pub redirector: Redirector,
    pub broadcaster: Arc<Broadcaster>,
    pub limits: CodecLimits,
    pub idle_timeout: Duration,
    pub request_timeout: Duration,
    pub write_timeout: Duration,
    pub server_name: String,
}

impl AppState {
    pub fn from_config(config: &ServerConfig, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            router: default_router(Arc::clone(&broadcaster), &config.static_files),
            redirector: Redirector::from_config(config),
            broadcaster,
            limits: CodecLimits::from(&config.limits),
            idle_timeout: config.timeouts.idle(),
            request_timeout: config.timeouts.request(),
            write_timeout: config.timeouts.write(),
            server_name: config.listener.server_name.clone(),
        }
    }
}

/// Accepts connections and runs sessions.
#[derive(Debug, Clone)]
pub struct HttpServer {
    state: Arc<AppState>,
    tracker: ConnectionTracker,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state: Arc::new(state),
            tracker: ConnectionTracker::new(),
        }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    pub fn tracker(&self) -> &ConnectionTracker {
        &self.tracker
    }

    /// Accept on `listener` until shutdown. With `tls`, every connection is
    /// handshaken before its session starts.
    pub async fn serve(&self, listener: Listener, tls: Option<TlsAcceptor>, mut shutdown: ShutdownSignal) {
        let scheme = if tls.is_some() { Scheme::Secure } else { Scheme::Plain };
        let local_addr = listener.local_addr();
        tracing::info!(address = %local_addr, scheme = %scheme, "HTTP server accepting");

        loop {
            let accepted = tokio::select! {
                _ = shutdown.recv() => break,
                accepted = listener.accept() => accepted,
            };
            let (stream, peer_addr, permit) = match accepted {
                Ok(accepted) => accepted,
                Err(error) => {
                    tracing::warn!(address = %local_addr, %error, "Accept failed");
                    tokio::time::sleep(ACCEPT_ERROR_BACKOFF).await;
                    continue;
                }
            };
            if let Err(error) = stream.set_nodelay(true) {
                tracing::trace!(%error, "Failed to set TCP_NODELAY");
            }

            let guard = self.tracker.track(scheme);
            let id = guard.id();
            let info = ConnectionInfo {
                client_addr: peer_addr,
                server_port: local_addr.port(),
                scheme,
            };
            let state = Arc::clone(&self.state);
            let tls = tls.clone();
            let session_shutdown = shutdown.clone();

            tokio::spawn(async move {
                let _permit = permit;
                let _guard = guard;
                tracing::debug!(connection_id = %id, peer_addr = %peer_addr, scheme = %scheme, "Session started");

                let outcome = match tls {
                    None => Session::new(stream, info, state, id).run(session_shutdown).await,
                    Some(acceptor) => match acceptor.accept(stream).await {
                        Ok(stream) => Session::new(stream, info, state, id).run(session_shutdown).await,
                        Err(error) => {
                            tracing::debug!(connection_id = %id, peer_addr = %peer_addr, %error, "TLS handshake failed");
                            Outcome::Closed
                        }
                    },
                };
                tracing::debug!(connection_id = %id, outcome = ?outcome, "Session ended");
            });
        }

        tracing::info!(address = %local_addr, "HTTP server stopped accepting");
    }
}
