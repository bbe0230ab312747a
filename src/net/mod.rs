//! Network layer subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming TCP connection
//!     → listener.rs (accept loop, connection limits)
//!     → tls.rs (handshake on the secure port)
//!     → connection.rs (identity, lifecycle tracking)
//!     → session.rs (request/response loop or hand-off)
//!
//! Session States:
//!     AwaitingRequest → ReadingRequest → Dispatching → Writing
//!         → AwaitingRequest (keep-alive) | Closed | HandedOff
//! ```
//!
//! # Design Decisions
//! - Bounded accept queue prevents resource exhaustion
//! - Each connection tracked for graceful shutdown
//! - Sessions are generic over the stream, so plain and TLS share one loop

pub mod connection;
pub mod listener;
pub mod session;
pub mod tls;

pub use connection::{ConnectionGuard, ConnectionId, ConnectionTracker};
pub use listener::{ConnectionPermit, Listener, ListenerError};
pub use session::{Outcome, Session};
pub use tls::{TlsAcceptor, TlsError};
