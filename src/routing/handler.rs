//! Request handler capability.

use std::fmt;

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::http::{Request, Response};

/// Failure inside a handler. The session answers 500 and closes.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Internal(String),
}

/// Something that can answer GET and POST requests for a route.
///
/// Handlers fill in the response they are given; the session owns it and
/// applies connection-level headers afterwards.
pub trait Handler: Send + Sync + fmt::Debug {
    /// Name for logs and metrics.
    fn name(&self) -> &'static str;

    fn handle_get<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;

    fn handle_post<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>>;
}
