//! Response model built by handlers.
//!
//! # Responsibilities
//! - Hold status, reason, version, headers and the body source
//! - Offer the shapes handlers need: text/JSON, file-backed, error page,
//!   redirect, and the event-stream upgrade
//!
//! # Design Decisions
//! - `Content-Length` is never stored here; the codec computes it from the
//!   body when serializing
//! - An event-stream response has no body: after its head is written the
//!   connection belongs to the broadcaster

use std::borrow::Cow;

use serde::Serialize;
use tokio::fs::File;

use super::headers::Headers;
use super::request::Version;
use super::status::StatusCode;

/// Where the response body comes from.
#[derive(Debug, Default)]
pub enum Body {
    #[default]
    Empty,
    /// Buffered bytes.
    Bytes(Vec<u8>),
    /// File content streamed by the codec; `len` is sent as `Content-Length`.
    File { file: File, len: u64 },
    /// No body: the connection is upgraded to a server-push stream.
    EventStream,
}

impl Body {
    /// Framed length of the body, or `None` for the event stream.
    pub fn content_length(&self) -> Option<u64> {
        match self {
            Body::Empty => Some(0),
            Body::Bytes(bytes) => Some(bytes.len() as u64),
            Body::File { len, .. } => Some(*len),
            Body::EventStream => None,
        }
    }
}

/// An HTTP response under construction.
#[derive(Debug)]
pub struct Response {
    status: StatusCode,
    reason: Option<Cow<'static, str>>,
    version: Version,
    headers: Headers,
    body: Body,
}

impl Response {
    /// A `200 OK` response with no headers and an empty body.
    pub fn new(version: Version) -> Self {
        Self {
            status: StatusCode::OK,
            reason: None,
            version,
            headers: Headers::new(),
            body: Body::Empty,
        }
    }

    /// An error page for `status`, marked non-cacheable.
    pub fn error(status: StatusCode, version: Version) -> Self {
        let mut response = Self::new(version);
        response.set_error(status);
        response
    }

    /// A redirect to `location`.
    pub fn redirect(status: StatusCode, location: &str, version: Version) -> Self {
        let mut response = Self::new(version);
        response.status = status;
        response.set_header("Location", location);
        response.set_html(format!(
            "<html><body><h1>{status}</h1><p>Moved to <a href=\"{location}\">{location}</a></p></body></html>"
        ));
        response
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn set_status(&mut self, status: StatusCode) {
        self.status = status;
    }

    /// Reason phrase for the status line.
    pub fn reason(&self) -> &str {
        match &self.reason {
            Some(reason) => reason,
            None => self.status.canonical_reason().unwrap_or("Unknown"),
        }
    }

    pub fn set_reason(&mut self, reason: impl Into<Cow<'static, str>>) {
        self.reason = Some(reason.into());
    }

    pub fn version(&self) -> Version {
        self.version
    }

    pub fn set_version(&mut self, version: Version) {
        self.version = version;
    }

    pub fn headers(&self) -> &Headers {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut Headers {
        &mut self.headers
    }

    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.headers.set(name, value);
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn into_body(self) -> Body {
        self.body
    }

    pub fn set_body(&mut self, content_type: &str, body: impl Into<Vec<u8>>) {
        self.headers.set("Content-Type", content_type);
        self.body = Body::Bytes(body.into());
    }

    pub fn set_text(&mut self, text: impl Into<String>) {
        self.set_body("text/plain; charset=utf-8", text.into());
    }

    pub fn set_html(&mut self, html: impl Into<String>) {
        self.set_body("text/html; charset=utf-8", html.into());
    }

    /// Serialize `value` as the JSON body.
    pub fn set_json<T: Serialize>(&mut self, value: &T) -> Result<(), serde_json::Error> {
        let body = serde_json::to_vec(value)?;
        self.set_body("application/json", body);
        Ok(())
    }

    /// Stream `file` (of `len` bytes) as the body.
    pub fn set_file(&mut self, file: File, len: u64, content_type: &str) {
        self.headers.set("Content-Type", content_type);
        self.body = Body::File { file, len };
    }

    /// Replace status and body with an error page for `status`.
    pub fn set_error(&mut self, status: StatusCode) {
        self.status = status;
        self.reason = None;
        self.headers.set("Cache-Control", "no-cache");
        self.set_html(format!(
            "<html><head><title>{status}</title></head><body><h1>{status}</h1></body></html>"
        ));
    }

    /// Turn this response into a one-way event stream.
    ///
    /// Only the status line and headers are ever serialized; the session then
    /// hands the connection to the broadcaster.
    pub fn upgrade_to_event_stream(&mut self) {
        self.status = StatusCode::OK;
        self.reason = None;
        self.headers.set("Content-Type", "text/event-stream");
        self.headers.set("Cache-Control", "no-cache");
        self.headers.set("Connection", "keep-alive");
        self.body = Body::EventStream;
    }

    pub fn is_event_stream(&self) -> bool {
        matches!(self.body, Body::EventStream)
    }
}
