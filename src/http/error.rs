//! Codec error taxonomy.
//!
//! `ProtocolError` covers malformed syntax, `PayloadError` covers framing
//! problems (body length, premature end of stream). Both map to the status
//! the session answers with before closing.

use std::fmt;
use std::io;

use thiserror::Error;

use super::status::StatusCode;

/// Decoding phase an error occurred in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    RequestLine,
    Headers,
    Body,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Phase::RequestLine => "request line",
            Phase::Headers => "headers",
            Phase::Body => "body",
        })
    }
}

/// Malformed request or response syntax.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("request line must have exactly 3 tokens, found {0}")]
    RequestLine(usize),

    #[error("unsupported protocol version: {0}")]
    Version(String),

    #[error("malformed header line: {0:?}")]
    Header(String),

    #[error("invalid Content-Length: {0:?}")]
    ContentLength(String),

    #[error("line longer than {0} bytes")]
    LineTooLong(usize),

    #[error("more than {0} header fields")]
    TooManyHeaders(usize),

    #[error("unsupported Transfer-Encoding: {0}")]
    TransferEncoding(String),

    #[error("malformed status line: {0:?}")]
    StatusLine(String),
}

/// Body framing failures.
#[derive(Debug, Error)]
pub enum PayloadError {
    #[error("connection closed while reading {0}")]
    UnexpectedEof(Phase),

    #[error("body truncated: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },

    #[error("body of {length} bytes exceeds the {limit} byte limit")]
    TooLarge { length: usize, limit: usize },
}

/// Any failure while decoding a message.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Payload(#[from] PayloadError),

    #[error("i/o error: {0}")]
    Io(#[from] io::Error),
}

impl CodecError {
    /// Status to answer with, or `None` when the connection is too far gone
    /// to write anything useful.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            CodecError::Protocol(ProtocolError::Version(_)) => {
                Some(StatusCode::HTTP_VERSION_NOT_SUPPORTED)
            }
            CodecError::Protocol(ProtocolError::TooManyHeaders(_)) => {
                Some(StatusCode::HEADER_FIELDS_TOO_LARGE)
            }
            CodecError::Protocol(ProtocolError::TransferEncoding(_)) => {
                Some(StatusCode::NOT_IMPLEMENTED)
            }
            CodecError::Protocol(_) => Some(StatusCode::BAD_REQUEST),
            CodecError::Payload(PayloadError::UnexpectedEof(Phase::RequestLine)) => None,
            CodecError::Payload(PayloadError::TooLarge { .. }) => {
                Some(StatusCode::PAYLOAD_TOO_LARGE)
            }
            CodecError::Payload(_) => Some(StatusCode::BAD_REQUEST),
            CodecError::Io(_) => None,
        }
    }

    /// Phase the failure belongs to, when it is tied to one.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            CodecError::Protocol(ProtocolError::RequestLine(_))
            | CodecError::Protocol(ProtocolError::Version(_))
            | CodecError::Protocol(ProtocolError::StatusLine(_)) => Some(Phase::RequestLine),
            CodecError::Protocol(ProtocolError::Header(_))
            | CodecError::Protocol(ProtocolError::TooManyHeaders(_)) => Some(Phase::Headers),
            CodecError::Protocol(ProtocolError::ContentLength(_))
            | CodecError::Protocol(ProtocolError::TransferEncoding(_)) => Some(Phase::Body),
            CodecError::Payload(PayloadError::UnexpectedEof(phase)) => Some(*phase),
            CodecError::Payload(_) => Some(Phase::Body),
            CodecError::Protocol(ProtocolError::LineTooLong(_)) | CodecError::Io(_) => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CodecError::Protocol(_) => "protocol",
            CodecError::Payload(_) => "payload",
            CodecError::Io(_) => "io",
        }
    }
}
