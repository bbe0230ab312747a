//! A registered push channel.

use std::fmt;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{watch, Mutex};

static SINK_ID_COUNTER: AtomicU64 = AtomicU64::new(1);

/// Identity of a sink, used for removal. Never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SinkId(u64);

impl SinkId {
    pub fn next() -> Self {
        Self(SINK_ID_COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for SinkId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sink-{}", self.0)
    }
}

type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Write side of an event-stream connection.
///
/// Once closed a sink refuses further frames; the socket is released when the
/// last reference is dropped.
pub struct Sink {
    id: SinkId,
    peer: Option<SocketAddr>,
    writer: Mutex<BoxedWriter>,
    closed: watch::Sender<bool>,
}

impl Sink {
    pub fn new<W>(writer: W) -> Self
    where
        W: AsyncWrite + Send + Unpin + 'static,
    {
        let (closed, _) = watch::channel(false);
        Self {
            id: SinkId::next(),
            peer: None,
            writer: Mutex::new(Box::new(writer)),
            closed,
        }
    }

    pub fn with_peer(mut self, peer: SocketAddr) -> Self {
        self.peer = Some(peer);
        self
    }

    pub fn id(&self) -> SinkId {
        self.id
    }

    pub fn peer(&self) -> Option<SocketAddr> {
        self.peer
    }

    /// Write one frame and flush it.
    pub async fn send(&self, frame: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        if self.is_closed() {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "sink closed"));
        }
        writer.write_all(frame).await?;
        writer.flush().await
    }

    pub fn is_closed(&self) -> bool {
        *self.closed.borrow()
    }

    /// Mark the sink closed. Returns false if it already was.
    pub fn mark_closed(&self) -> bool {
        !self.closed.send_replace(true)
    }

    /// Receiver that flips to `true` when the sink is closed.
    pub fn closed_signal(&self) -> watch::Receiver<bool> {
        self.closed.subscribe()
    }
}

impl fmt::Debug for Sink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sink")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("closed", &self.is_closed())
            .finish()
    }
}
