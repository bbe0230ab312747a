//! Route lookup.
//!
//! # Responsibilities
//! - Store registered endpoints and their handlers
//! - Map a request target to a handler
//! - Fall back to the default responder when nothing matches
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - Targets are normalized: query and fragment dropped, lower-cased,
//!   surrounding `/` trimmed
//! - An endpoint matches when the normalized path ends with it on a segment
//!   boundary (`api` matches `/api` and `/v1/api`, not `/rapi`)
//! - First registered match wins
//! - No match is not an error: the fallback handler answers

use std::sync::Arc;

use super::handler::Handler;

/// Maps request targets to handlers.
#[derive(Debug, Clone)]
pub struct Router {
    routes: Vec<(String, Arc<dyn Handler>)>,
    fallback: Arc<dyn Handler>,
}

impl Router {
    pub fn new(fallback: Arc<dyn Handler>) -> Self {
        Self {
            routes: Vec::new(),
            fallback,
        }
    }

    /// Register `handler` for `endpoint`. The endpoint is normalized like a
    /// request target.
    pub fn register(mut self, endpoint: &str, handler: Arc<dyn Handler>) -> Self {
        let endpoint = normalize(endpoint);
        tracing::info!(endpoint = %endpoint, handler = handler.name(), "Route registered");
        self.routes.push((endpoint, handler));
        self
    }

    /// Handler registered for `target`, if any.
    pub fn lookup(&self, target: &str) -> Option<&Arc<dyn Handler>> {
        let path = normalize(target);
        self.routes
            .iter()
            .find(|(endpoint, _)| ends_with_segment(&path, endpoint))
            .map(|(_, handler)| handler)
    }

    /// Handler for `target`, or the fallback.
    pub fn route(&self, target: &str) -> Arc<dyn Handler> {
        Arc::clone(self.lookup(target).unwrap_or(&self.fallback))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}

/// Lower-cased path without query, fragment, or surrounding slashes.
pub fn normalize(target: &str) -> String {
    let end = target.find(|c| c == '?' || c == '#').unwrap_or(target.len());
    target[..end].trim_matches('/').to_ascii_lowercase()
}

fn ends_with_segment(path: &str, endpoint: &str) -> bool {
    if endpoint.is_empty() {
        return path.is_empty();
    }
    match path.strip_suffix(endpoint) {
        Some(rest) => rest.is_empty() || rest.ends_with('/'),
        None => false,
    }
}
