//! `/api`: JSON status and the in-process event source.
//!
//! - `GET` reports how many event-stream clients are registered
//! - `POST` broadcasts the request body as one event and reports how many
//!   clients received it

use std::sync::Arc;

use futures_util::future::BoxFuture;
use serde::Serialize;

use crate::events::Broadcaster;
use crate::http::{Request, Response, StatusCode};
use crate::routing::{Handler, HandlerError};

#[derive(Debug, Serialize)]
struct Status {
    clients: usize,
}

#[derive(Debug, Serialize)]
struct Delivery {
    delivered: usize,
}

#[derive(Debug, Serialize)]
struct ApiError<'a> {
    error: &'a str,
}

#[derive(Debug)]
pub struct ApiHandler {
    broadcaster: Arc<Broadcaster>,
}

impl ApiHandler {
    pub fn new(broadcaster: Arc<Broadcaster>) -> Self {
        Self { broadcaster }
    }
}

impl Handler for ApiHandler {
    fn name(&self) -> &'static str {
        "api"
    }

    fn handle_get<'a>(
        &'a self,
        _request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            response.set_header("Cache-Control", "no-cache");
            response.set_json(&Status {
                clients: self.broadcaster.client_count(),
            })?;
            Ok(())
        })
    }

    fn handle_post<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            if request.body().is_empty() {
                response.set_status(StatusCode::BAD_REQUEST);
                response.set_json(&ApiError {
                    error: "event body is empty",
                })?;
                return Ok(());
            }

            let payload = String::from_utf8_lossy(request.body());
            let delivered = self.broadcaster.broadcast(&payload).await;
            tracing::info!(
                peer_addr = %request.client_addr(),
                bytes = request.body().len(),
                delivered,
                "Event published"
            );

            response.set_status(StatusCode::ACCEPTED);
            response.set_json(&Delivery { delivered })?;
            Ok(())
        })
    }
}
