//! HTTP/1.x push server library.
//!
//! A raw-socket HTTP/1.0/1.1 engine with keep-alive, plain-to-secure
//! redirection, and connections that upgrade into server-sent event streams
//! fed by a concurrent broadcaster.

// Core subsystems
pub mod config;
pub mod http;
pub mod net;
pub mod routing;

// Server push
pub mod events;
pub mod handlers;

// Cross-cutting concerns
pub mod lifecycle;
pub mod observability;

pub use config::ServerConfig;
pub use events::Broadcaster;
pub use http::HttpServer;
pub use lifecycle::{ServerHandle, Shutdown};
