//! Per-connection session state machine.
//!
//! # Responsibilities
//! - Drive the codec over one socket: read, dispatch, write, repeat
//! - Decide reuse-or-close after every response
//! - Hand the socket to the broadcaster on an event-stream upgrade
//! - Turn every failure into a well-defined close, never a dangling socket
//!
//! # States
//! ```text
//! AwaitingRequest ──line──▶ ReadingRequest ──ok──▶ Dispatching ──▶ Writing
//!       ▲  │ idle timeout / EOF / shutdown     │ codec error / 408         │
//!       │  ▼                                   ▼                           │
//!       │ Closed ◀──────────── error response, close ◀────────────────────┤
//!       └──────────────────────── keep-alive ◀────────────────────────────┤
//!                                   event stream ──▶ HandedOff (socket now
//!                                                    owned by broadcaster)
//! ```
//!
//! # Design Decisions
//! - The idle timeout bounds the wait for a request line; the request
//!   timeout bounds headers and body; the write timeout bounds every
//!   response, so a peer that stops reading cannot pin the session
//! - Redirects, handler failures and protocol errors always close
//! - Handler panics are caught and answered with 500

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use futures_util::FutureExt;
use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, ReadHalf, WriteHalf};
use uuid::Uuid;

use crate::events::{Sink, SinkId};
use crate::http::codec::{read_request, read_request_line, write_response};
use crate::http::server::AppState;
use crate::http::{CodecError, ConnectionInfo, Method, Request, Response, StatusCode, Version};
use crate::lifecycle::ShutdownSignal;
use crate::net::connection::ConnectionId;
use crate::observability::metrics;

/// How a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The socket was closed.
    Closed,
    /// The socket now belongs to the broadcaster as this sink.
    HandedOff(SinkId),
}

/// A response ready to be written, plus what to do afterwards.
struct Prepared {
    response: Response,
    head_only: bool,
    keep_alive: bool,
}

/// One connection's request/response loop.
pub struct Session<S> {
    reader: BufReader<ReadHalf<S>>,
    writer: WriteHalf<S>,
    info: ConnectionInfo,
    state: Arc<AppState>,
    id: ConnectionId,
}

impl<S> Session<S>
where
    S: AsyncRead + AsyncWrite + Send + Unpin + 'static,
{
    pub fn new(stream: S, info: ConnectionInfo, state: Arc<AppState>, id: ConnectionId) -> Self {
        let (read_half, writer) = tokio::io::split(stream);
        Self {
            reader: BufReader::new(read_half),
            writer,
            info,
            state,
            id,
        }
    }

    /// Serve requests until the connection closes or is handed off.
    pub async fn run(mut self, mut shutdown: ShutdownSignal) -> Outcome {
        let limits = self.state.limits;
        loop {
            let next_line = tokio::select! {
                biased;
                _ = shutdown.recv() => {
                    tracing::debug!(connection_id = %self.id, "Closing idle connection for shutdown");
                    return self.close().await;
                }
                read = tokio::time::timeout(
                    self.state.idle_timeout,
                    read_request_line(&mut self.reader, &limits),
                ) => read,
            };

            let line = match next_line {
                Err(_) => {
                    tracing::debug!(connection_id = %self.id, "Idle timeout");
                    return self.close().await;
                }
                Ok(Ok(None)) => {
                    tracing::trace!(connection_id = %self.id, "Peer closed connection");
                    return self.close().await;
                }
                Ok(Ok(Some(line))) => line,
                Ok(Err(error)) => return self.reject(error, None).await,
            };

            let version = Version::parse(&line.version);
            let started = Instant::now();
            let read = tokio::time::timeout(
                self.state.request_timeout,
                read_request(&mut self.reader, line, self.info, &limits),
            )
            .await;
            let request = match read {
                Err(_) => {
                    tracing::warn!(connection_id = %self.id, peer_addr = %self.info.client_addr, "Request timed out");
                    metrics::record_protocol_error("timeout");
                    return self.reply_error(StatusCode::REQUEST_TIMEOUT, version).await;
                }
                Ok(Err(error)) => return self.reject(error, version).await,
                Ok(Ok(request)) => request,
            };

            let prepared = self.dispatch(&request).await;
            let status = prepared.response.status();
            metrics::record_request(request.method().as_str(), status.as_u16(), started);

            if prepared.response.is_event_stream() && !prepared.head_only {
                return self.hand_off(prepared.response).await;
            }

            if !self.write(prepared.response, prepared.head_only).await {
                return Outcome::Closed;
            }
            if !prepared.keep_alive {
                return self.close().await;
            }
        }
    }

    /// Produce the response for `request`.
    async fn dispatch(&self, request: &Request) -> Prepared {
        let state = &self.state;
        let version = request.version();
        let request_id = Uuid::new_v4().to_string();
        let head_only = *request.method() == Method::Head;
        let mut keep_alive = request.wants_keep_alive();
        let mut response = Response::new(version);

        if let Some(location) =
            state
                .redirector
                .should_redirect(request.scheme(), request.target(), request.header("Host"))
        {
            tracing::info!(
                connection_id = %self.id,
                request_id = %request_id,
                request_target = request.target(),
                location = %location,
                "Redirecting to secure listener"
            );
            metrics::record_redirect();
            response = Response::redirect(StatusCode::MOVED_PERMANENTLY, &location, version);
            keep_alive = false;
        } else {
            let handler = state.router.route(request.target());
            let outcome = match request.method() {
                Method::Get | Method::Head => {
                    AssertUnwindSafe(handler.handle_get(request, &mut response))
                        .catch_unwind()
                        .await
                }
                Method::Post => {
                    AssertUnwindSafe(handler.handle_post(request, &mut response))
                        .catch_unwind()
                        .await
                }
                _ => {
                    response.set_error(StatusCode::NOT_IMPLEMENTED);
                    Ok(Ok(()))
                }
            };

            match outcome {
                Ok(Ok(())) => {}
                Ok(Err(error)) => {
                    tracing::error!(
                        connection_id = %self.id,
                        request_id = %request_id,
                        handler = handler.name(),
                        %error,
                        "Handler failed"
                    );
                    response = Response::error(StatusCode::INTERNAL_SERVER_ERROR, version);
                    keep_alive = false;
                }
                Err(_) => {
                    tracing::error!(
                        connection_id = %self.id,
                        request_id = %request_id,
                        handler = handler.name(),
                        "Handler panicked"
                    );
                    response = Response::error(StatusCode::INTERNAL_SERVER_ERROR, version);
                    keep_alive = false;
                }
            }
        }

        if response.headers().has_token("Connection", "close") {
            keep_alive = false;
        }
        self.apply_defaults(&mut response);
        response.set_header("X-Request-Id", request_id.as_str());
        if !response.is_event_stream() {
            response.set_header("Connection", if keep_alive { "keep-alive" } else { "close" });
        }

        tracing::info!(
            connection_id = %self.id,
            request_id = %request_id,
            peer_addr = %request.client_addr(),
            scheme = %request.scheme(),
            method = %request.method(),
            request_target = request.target(),
            version = %version,
            status = response.status().as_u16(),
            keep_alive,
            "Request handled"
        );

        Prepared {
            response,
            head_only,
            keep_alive,
        }
    }

    fn apply_defaults(&self, response: &mut Response) {
        let headers = response.headers_mut();
        headers.set_default("Server", self.state.server_name.as_str());
        headers.set_default("Date", http_date());
    }

    /// Write the event-stream head and give the socket to the broadcaster.
    async fn hand_off(mut self, response: Response) -> Outcome {
        if !self.write(response, false).await {
            return Outcome::Closed;
        }

        let Session {
            reader,
            writer,
            info,
            state,
            id,
        } = self;
        let sink = Arc::new(Sink::new(writer).with_peer(info.client_addr));
        let sink_id = sink.id();

        if !state.broadcaster.register_client(Arc::clone(&sink)) {
            return Outcome::Closed;
        }
        state.broadcaster.watch_disconnect(&sink, reader);

        tracing::info!(connection_id = %id, sink_id = %sink_id, "Connection handed off to broadcaster");
        Outcome::HandedOff(sink_id)
    }

    /// Answer a decoding failure (when possible) and close.
    ///
    /// `version` is the request's version once its request line was read.
    async fn reject(self, error: CodecError, version: Option<Version>) -> Outcome {
        metrics::record_protocol_error(error.kind());
        match error.status() {
            Some(status) => {
                tracing::warn!(
                    connection_id = %self.id,
                    peer_addr = %self.info.client_addr,
                    phase = ?error.phase(),
                    status = status.as_u16(),
                    %error,
                    "Rejecting request"
                );
                self.reply_error(status, version).await
            }
            None => {
                tracing::debug!(connection_id = %self.id, %error, "Connection dropped mid-request");
                Outcome::Closed
            }
        }
    }

    async fn reply_error(mut self, status: StatusCode, version: Option<Version>) -> Outcome {
        let mut response = Response::error(status, version.unwrap_or(Version::Http11));
        self.apply_defaults(&mut response);
        response.set_header("Connection", "close");
        if !self.write(response, false).await {
            return Outcome::Closed;
        }
        self.close().await
    }

    /// Write `response` within the write timeout. False means the connection
    /// is unusable and must be dropped without a graceful shutdown.
    async fn write(&mut self, response: Response, head_only: bool) -> bool {
        let write = write_response(&mut self.writer, response, head_only);
        match tokio::time::timeout(self.state.write_timeout, write).await {
            Ok(Ok(())) => true,
            Ok(Err(error)) => {
                tracing::debug!(connection_id = %self.id, %error, "Failed to write response");
                false
            }
            Err(_) => {
                tracing::warn!(
                    connection_id = %self.id,
                    peer_addr = %self.info.client_addr,
                    timeout_secs = self.state.write_timeout.as_secs(),
                    "Response write timed out"
                );
                metrics::record_protocol_error("write_timeout");
                false
            }
        }
    }

    async fn close(mut self) -> Outcome {
        if let Err(error) = self.writer.shutdown().await {
            tracing::trace!(connection_id = %self.id, %error, "Shutdown after close failed");
        }
        Outcome::Closed
    }
}

/// Current time in IMF-fixdate form, e.g. `Sun, 06 Nov 1994 08:49:37 GMT`.
pub fn http_date() -> String {
    Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}
