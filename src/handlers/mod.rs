//! Built-in request handlers.
//!
//! | endpoint  | handler             | GET                  | POST                 |
//! |-----------|---------------------|----------------------|----------------------|
//! | `events`  | `EventHandler`      | event-stream upgrade | 405                  |
//! | `api`     | `ApiHandler`        | client count (JSON)  | broadcast body (202) |
//! | otherwise | `StaticFileHandler` | file under root      | 501                  |

pub mod api;
pub mod events;
pub mod static_files;

use std::sync::Arc;

pub use api::ApiHandler;
pub use events::EventHandler;
pub use static_files::StaticFileHandler;

use crate::config::StaticFilesConfig;
use crate::events::Broadcaster;
use crate::routing::Router;

/// The default route table.
pub fn default_router(broadcaster: Arc<Broadcaster>, static_files: &StaticFilesConfig) -> Router {
    Router::new(Arc::new(StaticFileHandler::from_config(static_files)))
        .register("api", Arc::new(ApiHandler::new(broadcaster)))
        .register("events", Arc::new(EventHandler))
}
