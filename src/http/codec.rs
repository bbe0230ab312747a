//! HTTP/1.x wire codec.
//!
//! # Responsibilities
//! - Decode a request: request line, header section, `Content-Length` body
//! - Encode a response: status line, headers, computed `Content-Length`, body
//! - Decode a response (used by clients and tests speaking to the server)
//!
//! # Design Decisions
//! - Pure framing, no connection policy; the session decides what to do
//!   with errors and keep-alive
//! - Lines are ISO-8859-1 so every byte survives decoding verbatim
//! - Every line read is bounded by `CodecLimits::max_line_bytes`
//! - File bodies are streamed, never buffered whole
//! - Chunked transfer coding is not supported

use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::config::LimitsConfig;

use super::error::{CodecError, PayloadError, Phase, ProtocolError};
use super::headers::Headers;
use super::request::{ConnectionInfo, Method, Request, RequestHead, Version};
use super::response::{Body, Response};
use super::status::StatusCode;

/// Size bounds applied while decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecLimits {
    pub max_line_bytes: usize,
    pub max_headers: usize,
    pub max_body_bytes: usize,
}

impl Default for CodecLimits {
    fn default() -> Self {
        Self::from(&LimitsConfig::default())
    }
}

impl From<&LimitsConfig> for CodecLimits {
    fn from(config: &LimitsConfig) -> Self {
        Self {
            max_line_bytes: config.max_line_bytes,
            max_headers: config.max_headers,
            max_body_bytes: config.max_body_bytes,
        }
    }
}

/// The three request-line tokens, exactly as received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestLine {
    pub method: String,
    pub target: String,
    pub version: String,
}

/// Read one request line.
///
/// Returns `Ok(None)` when the peer closed the connection before sending a
/// byte, which is how a keep-alive client says goodbye.
pub async fn read_request_line<R>(
    reader: &mut R,
    limits: &CodecLimits,
) -> Result<Option<RequestLine>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let Some(line) = read_line(reader, limits.max_line_bytes, Phase::RequestLine).await? else {
        return Ok(None);
    };

    let tokens: Vec<&str> = line.split_ascii_whitespace().collect();
    match tokens.as_slice() {
        [method, target, version] => Ok(Some(RequestLine {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
        })),
        other => Err(ProtocolError::RequestLine(other.len()).into()),
    }
}

/// Read the header section and body that follow `line`.
pub async fn read_request<R>(
    reader: &mut R,
    line: RequestLine,
    connection: ConnectionInfo,
    limits: &CodecLimits,
) -> Result<Request, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let version = Version::parse(&line.version).ok_or(ProtocolError::Version(line.version))?;
    let headers = read_headers(reader, limits).await?;

    if let Some(coding) = headers.get("Transfer-Encoding") {
        return Err(ProtocolError::TransferEncoding(coding.to_string()).into());
    }

    let length = content_length(&headers)?.unwrap_or(0);
    if length > limits.max_body_bytes {
        return Err(PayloadError::TooLarge {
            length,
            limit: limits.max_body_bytes,
        }
        .into());
    }
    let body = read_body(reader, length).await?;

    let head = RequestHead {
        method: Method::parse(&line.method),
        target: line.target,
        version,
        headers,
    };
    Ok(Request::new(head, body, connection))
}

/// Decode one complete request.
pub async fn decode_request<R>(
    reader: &mut R,
    connection: ConnectionInfo,
    limits: &CodecLimits,
) -> Result<Option<Request>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    match read_request_line(reader, limits).await? {
        Some(line) => read_request(reader, line, connection, limits).await.map(Some),
        None => Ok(None),
    }
}

/// Serialize the status line and header section of `response`.
///
/// `Content-Length` is computed from the body and replaces any value a
/// handler set. Event-stream responses carry no length.
pub fn encode_head(response: &Response) -> Vec<u8> {
    let mut head = String::with_capacity(256);
    head.push_str(response.version().as_str());
    head.push(' ');
    head.push_str(&response.status().as_u16().to_string());
    head.push(' ');
    head.push_str(response.reason());
    head.push_str("\r\n");

    for (name, value) in response.headers().iter() {
        if name.eq_ignore_ascii_case("Content-Length") {
            continue;
        }
        if name.chars().chain(value.chars()).any(is_forbidden_in_value) {
            tracing::warn!(header = name, "Dropping response header with control characters");
            continue;
        }
        head.push_str(name);
        head.push_str(": ");
        head.push_str(value);
        head.push_str("\r\n");
    }

    if let Some(length) = response.body().content_length().filter(|_| !is_bodiless(response.status())) {
        head.push_str("Content-Length: ");
        head.push_str(&length.to_string());
        head.push_str("\r\n");
    }
    head.push_str("\r\n");

    latin1_encode(&head)
}

/// Serialize `response` into one buffer.
///
/// File bodies need I/O and only contribute their head here; use
/// [`write_response`] to stream them.
pub fn encode_response(response: &Response) -> Vec<u8> {
    let mut out = encode_head(response);
    match response.body() {
        Body::Bytes(bytes) if !is_bodiless(response.status()) => out.extend_from_slice(bytes),
        _ => {}
    }
    out
}

/// Write `response` to `writer` and flush.
///
/// With `head_only` (HEAD requests) the body is skipped but its length is
/// still announced. Event-stream responses only ever produce their head.
pub async fn write_response<W>(
    writer: &mut W,
    response: Response,
    head_only: bool,
) -> std::io::Result<()>
where
    W: AsyncWrite + Unpin + ?Sized,
{
    let head_only = head_only || is_bodiless(response.status());
    if head_only || !matches!(response.body(), Body::File { .. }) {
        let bytes = if head_only {
            encode_head(&response)
        } else {
            encode_response(&response)
        };
        writer.write_all(&bytes).await?;
        return writer.flush().await;
    }

    writer.write_all(&encode_head(&response)).await?;
    if let Body::File { mut file, len } = response.into_body() {
        let copied = tokio::io::copy(&mut (&mut file).take(len), writer).await?;
        if copied != len {
            return Err(std::io::Error::new(
                std::io::ErrorKind::UnexpectedEof,
                format!("file ended after {copied} of {len} bytes"),
            ));
        }
    }
    writer.flush().await
}

/// Status line and headers of a decoded response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseHead {
    pub version: String,
    pub status: StatusCode,
    pub reason: String,
    pub headers: Headers,
}

/// A decoded response with its body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedResponse {
    pub head: ResponseHead,
    pub body: Vec<u8>,
}

/// Read a status line and header section.
pub async fn read_response_head<R>(
    reader: &mut R,
    limits: &CodecLimits,
) -> Result<ResponseHead, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader, limits.max_line_bytes, Phase::RequestLine)
        .await?
        .ok_or(PayloadError::UnexpectedEof(Phase::RequestLine))?;

    let mut parts = line.splitn(3, ' ');
    let version = parts.next().filter(|v| v.starts_with("HTTP/"));
    let status = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .and_then(StatusCode::from_u16);
    let (Some(version), Some(status)) = (version, status) else {
        return Err(ProtocolError::StatusLine(line.clone()).into());
    };
    let reason = parts.next().unwrap_or_default().to_string();
    let version = version.to_string();

    let headers = read_headers(reader, limits).await?;
    Ok(ResponseHead {
        version,
        status,
        reason,
        headers,
    })
}

/// Read a full response.
///
/// Without `Content-Length` the body runs to end of stream, except for event
/// streams whose frames are left unread for the caller.
pub async fn read_response<R>(
    reader: &mut R,
    limits: &CodecLimits,
) -> Result<DecodedResponse, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let head = read_response_head(reader, limits).await?;
    let is_stream = head
        .headers
        .get("Content-Type")
        .map(|t| t.starts_with("text/event-stream"))
        .unwrap_or(false);

    let body = match content_length(&head.headers)? {
        Some(length) => read_body(reader, length).await?,
        None if is_stream => Vec::new(),
        None => {
            let mut body = Vec::new();
            reader.read_to_end(&mut body).await?;
            body
        }
    };
    Ok(DecodedResponse { head, body })
}

async fn read_headers<R>(reader: &mut R, limits: &CodecLimits) -> Result<Headers, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut headers = Headers::new();
    loop {
        let line = read_line(reader, limits.max_line_bytes, Phase::Headers)
            .await?
            .ok_or(PayloadError::UnexpectedEof(Phase::Headers))?;
        if line.is_empty() {
            return Ok(headers);
        }
        if headers.len() >= limits.max_headers {
            return Err(ProtocolError::TooManyHeaders(limits.max_headers).into());
        }

        let Some((name, value)) = line.split_once(':') else {
            return Err(ProtocolError::Header(line).into());
        };
        if name.is_empty() || name.contains(|c: char| c.is_ascii_whitespace() || c.is_ascii_control()) {
            return Err(ProtocolError::Header(line).into());
        }
        let value = value.trim_matches(|c| c == ' ' || c == '\t');
        if value.chars().any(is_forbidden_in_value) {
            return Err(ProtocolError::Header(line.escape_default().to_string()).into());
        }
        headers.set(name, value);
    }
}

/// Control bytes other than HTAB may not appear in a field value; a bare CR
/// would otherwise end the line early in anything that echoes the value.
fn is_forbidden_in_value(c: char) -> bool {
    c.is_ascii_control() && c != '\t'
}

/// 1xx, 204 and 304 responses never carry a body.
fn is_bodiless(status: StatusCode) -> bool {
    status.as_u16() < 200 || status == StatusCode::NO_CONTENT || status.as_u16() == 304
}

/// `Content-Length` as a byte count. Only plain digit strings are accepted.
fn content_length(headers: &Headers) -> Result<Option<usize>, ProtocolError> {
    let Some(raw) = headers.get("Content-Length") else {
        return Ok(None);
    };
    let value = raw.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ProtocolError::ContentLength(raw.to_string()));
    }
    value
        .parse::<usize>()
        .map(Some)
        .map_err(|_| ProtocolError::ContentLength(raw.to_string()))
}

async fn read_body<R>(reader: &mut R, length: usize) -> Result<Vec<u8>, CodecError>
where
    R: AsyncRead + Unpin,
{
    let mut body = vec![0u8; length];
    let mut received = 0;
    while received < length {
        let n = reader.read(&mut body[received..]).await?;
        if n == 0 {
            return Err(PayloadError::Truncated {
                expected: length,
                received,
            }
            .into());
        }
        received += n;
    }
    Ok(body)
}

/// Read one line without its CRLF (or bare LF) terminator.
async fn read_line<R>(reader: &mut R, max: usize, phase: Phase) -> Result<Option<String>, CodecError>
where
    R: AsyncBufRead + Unpin,
{
    let mut raw = Vec::with_capacity(128);
    let read = (&mut *reader).take(max as u64).read_until(b'\n', &mut raw).await?;
    if read == 0 {
        return Ok(None);
    }
    if raw.last() != Some(&b'\n') {
        if read >= max {
            return Err(ProtocolError::LineTooLong(max).into());
        }
        return Err(PayloadError::UnexpectedEof(phase).into());
    }

    raw.pop();
    if raw.last() == Some(&b'\r') {
        raw.pop();
    }
    Ok(Some(raw.iter().map(|&b| char::from(b)).collect()))
}

/// Characters outside ISO-8859-1 cannot be put on the wire and become `?`.
fn latin1_encode(text: &str) -> Vec<u8> {
    text.chars()
        .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::request::Scheme;

    fn connection() -> ConnectionInfo {
        ConnectionInfo {
            client_addr: "10.0.0.7:41000".parse().unwrap(),
            server_port: 8080,
            scheme: Scheme::Plain,
        }
    }

    async fn decode(raw: &[u8]) -> Result<Option<Request>, CodecError> {
        let mut input = raw;
        decode_request(&mut input, connection(), &CodecLimits::default()).await
    }

    async fn encode(response: Response) -> Vec<u8> {
        let mut out = Vec::new();
        write_response(&mut out, response, false).await.unwrap();
        out
    }

    #[tokio::test]
    async fn request_line_tokens_are_verbatim() {
        let cases = [
            ("GET / HTTP/1.1\r\n", ("GET", "/", "HTTP/1.1")),
            ("BREW /pot?sugar=2 HTTP/1.0\r\n", ("BREW", "/pot?sugar=2", "HTTP/1.0")),
            ("get\t/A%20b  HTTP/9.9\n", ("get", "/A%20b", "HTTP/9.9")),
            ("POST /caf\u{e9} HTTP/1.1\r\n", ("POST", "/caf\u{e9}", "HTTP/1.1")),
        ];
        for (raw, (method, target, version)) in cases {
            let bytes = latin1_encode(raw);
            let mut input = bytes.as_slice();
            let line = read_request_line(&mut input, &CodecLimits::default())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(line.method, method);
            assert_eq!(line.target, target);
            assert_eq!(line.version, version);
        }
    }

    #[tokio::test]
    async fn wrong_token_count_is_protocol_error() {
        let cases: [(&[u8], usize); 3] = [
            (b"GET /\r\n\r\n", 2),
            (b"GET / HTTP/1.1 extra\r\n\r\n", 4),
            (b"\r\n", 0),
        ];
        for (raw, count) in cases {
            match decode(raw).await {
                Err(CodecError::Protocol(ProtocolError::RequestLine(n))) => assert_eq!(n, count),
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn empty_stream_is_clean_close() {
        assert!(decode(b"").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn decodes_headers_and_body() {
        let raw = b"POST /api HTTP/1.1\r\nHost: example.com\r\nContent-Length: 11\r\nX-Dup: one\r\nx-dup: two\r\n\r\nhello=world";
        let request = decode(raw).await.unwrap().unwrap();

        assert_eq!(request.method(), &Method::Post);
        assert_eq!(request.target(), "/api");
        assert_eq!(request.version(), Version::Http11);
        assert_eq!(request.header("host"), Some("example.com"));
        assert_eq!(request.header("X-DUP"), Some("two"));
        assert_eq!(request.body(), b"hello=world");
        assert_eq!(request.client_addr(), connection().client_addr);
        assert_eq!(request.server_port(), 8080);
    }

    #[tokio::test]
    async fn missing_content_length_means_empty_body() {
        let request = decode(b"GET / HTTP/1.0\r\n\r\nleftover").await.unwrap().unwrap();
        assert!(request.body().is_empty());
    }

    #[tokio::test]
    async fn truncated_body_is_payload_error() {
        match decode(b"POST /api HTTP/1.1\r\nContent-Length: 10\r\n\r\nabcd").await {
            Err(CodecError::Payload(PayloadError::Truncated { expected, received })) => {
                assert_eq!(expected, 10);
                assert_eq!(received, 4);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparsable_content_length_is_protocol_error() {
        for value in ["ten", "-1", "+5", "", "1 0"] {
            let raw = format!("POST / HTTP/1.1\r\nContent-Length: {value}\r\n\r\n");
            match decode(raw.as_bytes()).await {
                Err(CodecError::Protocol(ProtocolError::ContentLength(_))) => {}
                other => panic!("unexpected {other:?} for {value:?}"),
            }
        }
    }

    #[tokio::test]
    async fn eof_inside_headers() {
        match decode(b"GET / HTTP/1.1\r\nHost: a\r\n").await {
            Err(CodecError::Payload(PayloadError::UnexpectedEof(Phase::Headers))) => {}
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn malformed_header_line() {
        let cases: [&[u8]; 3] = [
            b"GET / HTTP/1.1\r\nno colon here\r\n\r\n",
            b"GET / HTTP/1.1\r\n: empty-name\r\n\r\n",
            b"GET / HTTP/1.1\r\nBad Name: x\r\n\r\n",
        ];
        for raw in cases {
            match decode(raw).await {
                Err(CodecError::Protocol(ProtocolError::Header(_))) => {}
                other => panic!("unexpected {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn control_bytes_in_header_values_are_rejected() {
        let cases: [&[u8]; 3] = [
            b"GET / HTTP/1.1\r\nHost: a\rSet-Cookie: pwn=1\r\n\r\n",
            b"GET / HTTP/1.1\r\nX-Note: a\x00b\r\n\r\n",
            b"GET / HTTP/1.1\r\nX-Note: a\x1bb\r\n\r\n",
        ];
        for raw in cases {
            match decode(raw).await {
                Err(CodecError::Protocol(ProtocolError::Header(_))) => {}
                other => panic!("unexpected {other:?}"),
            }
        }

        let request = decode(b"GET / HTTP/1.1\r\nX-Note: tab\there\r\n\r\n")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(request.header("X-Note"), Some("tab\there"));
    }

    #[test]
    fn response_headers_with_line_breaks_are_dropped() {
        let mut response = Response::new(Version::Http11);
        response.set_header("Location", "https://a\rSet-Cookie: pwn=1");
        response.set_header("X-Safe", "yes");
        let text = String::from_utf8(encode_head(&response)).unwrap();
        assert!(!text.contains("Set-Cookie"));
        assert!(!text.contains("Location"));
        assert!(text.contains("X-Safe: yes\r\n"));
    }

    #[tokio::test]
    async fn no_content_never_carries_body_bytes() {
        let mut response = Response::new(Version::Http11);
        response.set_text("stray");
        response.set_status(StatusCode::NO_CONTENT);

        let buffered = encode_response(&response);
        assert!(buffered.ends_with(b"\r\n\r\n"));
        assert!(!String::from_utf8_lossy(&buffered).contains("Content-Length"));
        assert_eq!(encode(response).await, buffered);
    }

    #[tokio::test]
    async fn limits_are_enforced() {
        let limits = CodecLimits {
            max_line_bytes: 32,
            max_headers: 2,
            max_body_bytes: 4,
        };

        let long = format!("GET /{} HTTP/1.1\r\n\r\n", "a".repeat(64));
        let mut input = long.as_bytes();
        assert!(matches!(
            decode_request(&mut input, connection(), &limits).await,
            Err(CodecError::Protocol(ProtocolError::LineTooLong(32)))
        ));

        let mut input = &b"GET / HTTP/1.1\r\nA: 1\r\nB: 2\r\nC: 3\r\n\r\n"[..];
        assert!(matches!(
            decode_request(&mut input, connection(), &limits).await,
            Err(CodecError::Protocol(ProtocolError::TooManyHeaders(2)))
        ));

        let mut input = &b"POST / HTTP/1.1\r\nContent-Length: 5\r\n\r\nhello"[..];
        assert!(matches!(
            decode_request(&mut input, connection(), &limits).await,
            Err(CodecError::Payload(PayloadError::TooLarge { length: 5, limit: 4 }))
        ));
    }

    #[tokio::test]
    async fn chunked_and_unknown_versions_are_rejected() {
        let raw = b"POST / HTTP/1.1\r\nTransfer-Encoding: chunked\r\n\r\n0\r\n\r\n";
        assert!(matches!(
            decode(raw).await,
            Err(CodecError::Protocol(ProtocolError::TransferEncoding(_)))
        ));

        assert!(matches!(
            decode(b"GET / HTTP/2.0\r\n\r\n").await,
            Err(CodecError::Protocol(ProtocolError::Version(v))) if v == "HTTP/2.0"
        ));
    }

    #[tokio::test]
    async fn sequential_requests_share_one_stream() {
        let raw = b"POST /a HTTP/1.1\r\nContent-Length: 3\r\n\r\nabcGET /b HTTP/1.1\r\nConnection: close\r\n\r\n";
        let mut input = &raw[..];
        let limits = CodecLimits::default();

        let first = decode_request(&mut input, connection(), &limits).await.unwrap().unwrap();
        assert_eq!(first.target(), "/a");
        assert_eq!(first.body(), b"abc");

        let second = decode_request(&mut input, connection(), &limits).await.unwrap().unwrap();
        assert_eq!(second.method(), &Method::Get);
        assert_eq!(second.target(), "/b");
        assert!(second.body().is_empty());
        assert!(!second.wants_keep_alive());

        assert!(decode_request(&mut input, connection(), &limits).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn encoded_response_decodes_to_the_same_message() {
        let mut response = Response::new(Version::Http11);
        response.set_status(StatusCode::ACCEPTED);
        response.set_header("X-Request-Id", "abc-123");
        response.set_header("Set-Cookie", "session=1; Path=/");
        response.set_body("application/octet-stream", vec![0u8, 13, 10, 255, 42]);

        let bytes = encode(response).await;
        let mut input = bytes.as_slice();
        let decoded = read_response(&mut input, &CodecLimits::default()).await.unwrap();

        assert_eq!(decoded.head.version, "HTTP/1.1");
        assert_eq!(decoded.head.status, StatusCode::ACCEPTED);
        assert_eq!(decoded.head.reason, "Accepted");
        assert_eq!(decoded.head.headers.get("x-request-id"), Some("abc-123"));
        assert_eq!(decoded.head.headers.get("set-cookie"), Some("session=1; Path=/"));
        assert_eq!(decoded.head.headers.get("content-type"), Some("application/octet-stream"));
        assert_eq!(decoded.head.headers.get("content-length"), Some("5"));
        assert_eq!(decoded.body, vec![0u8, 13, 10, 255, 42]);
        assert!(input.is_empty());
    }

    #[tokio::test]
    async fn computed_length_replaces_handler_value() {
        let mut response = Response::new(Version::Http10);
        response.set_header("Content-Length", "999");
        response.set_text("hi");

        let bytes = encode(response).await;
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.starts_with("HTTP/1.0 200 OK\r\n"));
        assert!(text.contains("Content-Length: 2\r\n"));
        assert!(!text.contains("999"));
        assert!(text.ends_with("\r\n\r\nhi"));
    }

    #[test]
    fn buffered_encoding_appends_body_after_head() {
        let mut response = Response::new(Version::Http11);
        response.set_text("hello");
        let bytes = encode_response(&response);
        assert!(bytes.starts_with(b"HTTP/1.1 200 OK\r\n"));
        assert!(bytes.ends_with(b"\r\n\r\nhello"));
        assert_eq!(&bytes[..bytes.len() - 5], encode_head(&response).as_slice());
    }

    #[tokio::test]
    async fn head_only_keeps_length_but_drops_body() {
        let mut response = Response::new(Version::Http11);
        response.set_text("hello");
        let mut out = Vec::new();
        write_response(&mut out, response, true).await.unwrap();

        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Content-Length: 5\r\n"));
        assert!(text.ends_with("\r\n\r\n"));
    }

    #[tokio::test]
    async fn event_stream_emits_head_only() {
        let mut response = Response::new(Version::Http11);
        response.upgrade_to_event_stream();

        let text = String::from_utf8(encode(response).await).unwrap();
        assert_eq!(
            text,
            "HTTP/1.1 200 OK\r\nContent-Type: text/event-stream\r\nCache-Control: no-cache\r\nConnection: keep-alive\r\n\r\n"
        );
    }

    #[tokio::test]
    async fn file_bodies_are_streamed() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        let content = "line\n".repeat(10_000);
        std::io::Write::write_all(&mut source, content.as_bytes()).unwrap();

        let file = tokio::fs::File::open(source.path()).await.unwrap();
        let mut response = Response::new(Version::Http11);
        response.set_file(file, content.len() as u64, "text/plain");

        let bytes = encode(response).await;
        let mut input = bytes.as_slice();
        let decoded = read_response(&mut input, &CodecLimits::default()).await.unwrap();
        assert_eq!(decoded.body.len(), content.len());
        assert_eq!(decoded.body, content.as_bytes());
    }

    #[tokio::test]
    async fn short_file_is_an_error() {
        let mut source = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(&mut source, b"abc").unwrap();

        let file = tokio::fs::File::open(source.path()).await.unwrap();
        let mut response = Response::new(Version::Http11);
        response.set_file(file, 10, "text/plain");

        let mut out = Vec::new();
        let err = write_response(&mut out, response, false).await.unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[tokio::test]
    async fn malformed_status_line() {
        let mut input = &b"HTTP/1.1 abc Nope\r\n\r\n"[..];
        assert!(matches!(
            read_response(&mut input, &CodecLimits::default()).await,
            Err(CodecError::Protocol(ProtocolError::StatusLine(_)))
        ));
    }
}
