//! `/events`: event-stream subscription endpoint.

use futures_util::future::BoxFuture;

use crate::http::{Request, Response, StatusCode};
use crate::routing::{Handler, HandlerError};

/// Upgrades GET requests to an event stream. The session performs the
/// hand-off to the broadcaster once the head is written.
#[derive(Debug, Default)]
pub struct EventHandler;

impl Handler for EventHandler {
    fn name(&self) -> &'static str {
        "events"
    }

    fn handle_get<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            tracing::debug!(peer_addr = %request.client_addr(), "Event stream requested");
            response.upgrade_to_event_stream();
            Ok(())
        })
    }

    fn handle_post<'a>(
        &'a self,
        _request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            response.set_error(StatusCode::METHOD_NOT_ALLOWED);
            response.set_header("Allow", "GET");
            Ok(())
        })
    }
}
