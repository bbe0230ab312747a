//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Decoded Request (scheme, target, Host)
//!     → redirect.rs (plain request to a secure-only prefix? → 301)
//!     → router.rs (endpoint lookup)
//!     → handler.rs (Handler::handle_get / handle_post)
//!
//! Route setup (at startup):
//!     endpoints registered once
//!     → Freeze as immutable Router shared via Arc
//! ```
//!
//! # Design Decisions
//! - Routes registered at startup, immutable at runtime
//! - No regex in hot path (suffix and prefix matching only)
//! - Deterministic: same input always matches same route
//! - Unmatched targets go to a default responder

pub mod handler;
pub mod redirect;
pub mod router;

pub use handler::{Handler, HandlerError};
pub use redirect::Redirector;
pub use router::Router;
