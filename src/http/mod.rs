//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! Raw byte stream (plain or TLS)
//!     → codec.rs (request line, headers, Content-Length body)
//!     → request.rs (parsed Request, cookies, keep-alive intent)
//!     → [session decides redirect / route / handler]
//!     → response.rs (status, headers, body source)
//!     → codec.rs (status line, computed Content-Length, body)
//!     → Byte stream back to the client
//! ```

pub mod codec;
pub mod error;
pub mod headers;
pub mod request;
pub mod response;
pub mod server;
pub mod status;

pub use codec::CodecLimits;
pub use error::{CodecError, PayloadError, Phase, ProtocolError};
pub use headers::Headers;
pub use request::{ConnectionInfo, Method, Request, Scheme, Version};
pub use response::{Body, Response};
pub use server::{AppState, HttpServer};
pub use status::StatusCode;
