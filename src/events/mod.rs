//! Server-push (event-stream) subsystem.
//!
//! # Data Flow
//! ```text
//! Session upgrades a GET to text/event-stream
//!     → writes the head, wraps its write half in a Sink
//!     → broadcaster.rs registers the Sink, watches the read half
//!
//! Producer calls broadcast(payload)
//!     → frame.rs ("data: ...\n\n")
//!     → broadcaster.rs (ordered fan-out, evict on failure)
//!     → sink.rs (write + flush)
//! ```

pub mod broadcaster;
pub mod frame;
pub mod sink;

pub use broadcaster::Broadcaster;
pub use frame::{encode_event, HEARTBEAT};
pub use sink::{Sink, SinkId};
