//! Event-stream broadcaster.
//!
//! # Responsibilities
//! - Keep the registry of live sinks
//! - Deliver each event to every sink in call order
//! - Evict a sink on its first failed or stalled write
//! - Watch handed-off connections for client disconnects
//!
//! # Design Decisions
//! - The registry is an immutable snapshot behind `ArcSwap`; register and
//!   remove build a new vector and swap it in, broadcasts read one snapshot
//!   without locking
//! - A single async mutex sequences deliveries, so every sink sees frames in
//!   the order `broadcast` was called
//! - Writes within one delivery run concurrently, each bounded by
//!   `write_timeout`, so one slow client cannot stall the others for longer
//!   than that bound
//! - Failures never reach the caller of `broadcast`

use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use futures_util::future::join_all;
use tokio::io::{AsyncRead, AsyncReadExt};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::frame::{encode_event, HEARTBEAT};
use super::sink::{Sink, SinkId};
use crate::lifecycle::ShutdownSignal;
use crate::observability::metrics;

/// Registry of push channels and fan-out of events to them.
#[derive(Debug)]
pub struct Broadcaster {
    clients: ArcSwap<Vec<Arc<Sink>>>,
    sequencer: Mutex<()>,
    write_timeout: Duration,
}

impl Broadcaster {
    pub fn new(write_timeout: Duration) -> Self {
        Self {
            clients: ArcSwap::from_pointee(Vec::new()),
            sequencer: Mutex::new(()),
            write_timeout,
        }
    }

    /// Add `sink` to the registry.
    ///
    /// Returns false when a sink with the same identity is already present or
    /// the sink has been closed.
    pub fn register_client(&self, sink: Arc<Sink>) -> bool {
        if sink.is_closed() {
            return false;
        }
        let id = sink.id();
        let previous = self.clients.rcu(|current| {
            if current.iter().any(|s| s.id() == id) {
                return Arc::clone(current);
            }
            let mut next = Vec::with_capacity(current.len() + 1);
            next.extend(current.iter().cloned());
            next.push(Arc::clone(&sink));
            Arc::new(next)
        });
        if previous.iter().any(|s| s.id() == id) {
            return false;
        }

        let count = self.client_count();
        metrics::set_sse_clients(count);
        tracing::info!(sink_id = %id, peer_addr = ?sink.peer(), clients = count, "Event stream client registered");
        true
    }

    /// Remove the sink `id` and mark it closed. Absent ids are a no-op.
    pub fn remove_client(&self, id: SinkId) -> bool {
        let previous = self.clients.rcu(|current| {
            if !current.iter().any(|s| s.id() == id) {
                return Arc::clone(current);
            }
            Arc::new(current.iter().filter(|s| s.id() != id).cloned().collect())
        });
        let Some(removed) = previous.iter().find(|s| s.id() == id) else {
            return false;
        };

        removed.mark_closed();
        let count = self.client_count();
        metrics::set_sse_clients(count);
        tracing::info!(sink_id = %id, peer_addr = ?removed.peer(), clients = count, "Event stream client removed");
        true
    }

    pub fn client_count(&self) -> usize {
        self.clients.load().len()
    }

    /// The current registry view.
    pub fn snapshot(&self) -> Arc<Vec<Arc<Sink>>> {
        self.clients.load_full()
    }

    /// Send `payload` as one event to every registered sink.
    ///
    /// Returns how many sinks received the frame.
    pub async fn broadcast(&self, payload: &str) -> usize {
        let frame = encode_event(payload);
        let delivered = self.deliver(frame.as_bytes()).await;
        metrics::record_sse_event(delivered);
        tracing::debug!(delivered, bytes = frame.len(), "Event broadcast");
        delivered
    }

    /// Send a comment frame to every sink; dead sinks are evicted as usual.
    pub async fn heartbeat(&self) -> usize {
        self.deliver(HEARTBEAT.as_bytes()).await
    }

    async fn deliver(&self, frame: &[u8]) -> usize {
        let _turn = self.sequencer.lock().await;
        let snapshot = self.clients.load_full();
        if snapshot.is_empty() {
            return 0;
        }

        let writes = snapshot.iter().map(|sink| async move {
            let outcome = tokio::time::timeout(self.write_timeout, sink.send(frame)).await;
            (sink, outcome)
        });

        let mut delivered = 0;
        for (sink, outcome) in join_all(writes).await {
            match outcome {
                Ok(Ok(())) => delivered += 1,
                Ok(Err(error)) => {
                    tracing::debug!(sink_id = %sink.id(), %error, "Event write failed");
                    self.evict(sink.id(), "write_error");
                }
                Err(_) => {
                    tracing::warn!(
                        sink_id = %sink.id(),
                        timeout_ms = self.write_timeout.as_millis() as u64,
                        "Event write timed out"
                    );
                    self.evict(sink.id(), "timeout");
                }
            }
        }
        delivered
    }

    fn evict(&self, id: SinkId, reason: &'static str) {
        if self.remove_client(id) {
            metrics::record_sse_eviction(reason);
        }
    }

    /// Remove every sink, e.g. on shutdown. Returns how many were dropped.
    pub fn close_all(&self) -> usize {
        let previous = self.clients.swap(Arc::new(Vec::new()));
        for sink in previous.iter() {
            sink.mark_closed();
        }
        metrics::set_sse_clients(0);
        previous.len()
    }

    /// Watch the read half of a handed-off connection.
    ///
    /// Event-stream clients never send after the request, so end of stream or
    /// a read error means the client is gone and its sink is removed. The
    /// task also ends when the sink is closed by anyone else, releasing the
    /// read half.
    pub fn watch_disconnect<R>(self: &Arc<Self>, sink: &Sink, mut reader: R) -> JoinHandle<()>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let broadcaster = Arc::clone(self);
        let id = sink.id();
        let mut closed = sink.closed_signal();

        tokio::spawn(async move {
            if *closed.borrow_and_update() {
                return;
            }
            let mut scratch = [0u8; 256];
            loop {
                tokio::select! {
                    read = reader.read(&mut scratch) => match read {
                        Ok(0) | Err(_) => {
                            if broadcaster.remove_client(id) {
                                tracing::debug!(sink_id = %id, "Event stream client disconnected");
                            }
                            break;
                        }
                        Ok(_) => continue,
                    },
                    changed = closed.changed() => {
                        if changed.is_err() || *closed.borrow_and_update() {
                            break;
                        }
                    }
                }
            }
        })
    }

    /// Send a heartbeat every `every` until shutdown.
    pub fn spawn_heartbeat(self: &Arc<Self>, every: Duration, mut shutdown: ShutdownSignal) -> JoinHandle<()> {
        let broadcaster = Arc::clone(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        broadcaster.heartbeat().await;
                    }
                    _ = shutdown.recv() => break,
                }
            }
            tracing::debug!("Heartbeat task stopped");
        })
    }
}
