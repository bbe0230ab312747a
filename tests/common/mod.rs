//! Shared utilities for integration tests.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use push_server::config::ServerConfig;
use push_server::http::codec::{read_response, read_response_head, DecodedResponse, ResponseHead};
use push_server::http::CodecLimits;
use push_server::lifecycle::{self, ServerHandle};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;

/// A config bound to an ephemeral loopback port, serving files from `root`.
pub fn test_config(root: &Path) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.listener.bind_host = "127.0.0.1".parse().unwrap();
    config.listener.plain_port = 0;
    config.static_files.root = root.to_path_buf();
    config.sse.heartbeat_secs = 0;
    config.timeouts.sse_write_ms = 500;
    config
}

/// Start a server with `config` and return its handle.
pub async fn start_server(config: &ServerConfig) -> ServerHandle {
    lifecycle::start(config).await.expect("server failed to start")
}

/// A raw client connection with a buffered read half.
pub struct Client {
    pub reader: BufReader<OwnedReadHalf>,
    pub writer: OwnedWriteHalf,
}

impl Client {
    pub async fn connect(addr: SocketAddr) -> Self {
        let stream = TcpStream::connect(addr).await.expect("connect failed");
        let (read, write) = stream.into_split();
        Self {
            reader: BufReader::new(read),
            writer: write,
        }
    }

    pub async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.unwrap();
    }

    /// Read one full response.
    pub async fn response(&mut self) -> DecodedResponse {
        tokio::time::timeout(Duration::from_secs(5), read_response(&mut self.reader, &CodecLimits::default()))
            .await
            .expect("timed out waiting for response")
            .expect("malformed response")
    }

    /// Read only a status line and headers (for event streams).
    #[allow(dead_code)]
    pub async fn response_head(&mut self) -> ResponseHead {
        tokio::time::timeout(
            Duration::from_secs(5),
            read_response_head(&mut self.reader, &CodecLimits::default()),
        )
        .await
        .expect("timed out waiting for response head")
        .expect("malformed response head")
    }

    /// Read one event frame, up to and including its blank line.
    #[allow(dead_code)]
    pub async fn frame(&mut self) -> String {
        let mut frame = String::new();
        loop {
            let mut line = String::new();
            let n = tokio::time::timeout(Duration::from_secs(5), self.reader.read_line(&mut line))
                .await
                .expect("timed out waiting for frame")
                .unwrap();
            assert!(n > 0, "stream ended mid-frame: {frame:?}");
            frame.push_str(&line);
            if line == "\n" {
                return frame;
            }
        }
    }

    /// True once the server has closed the connection.
    pub async fn is_closed(&mut self) -> bool {
        let mut rest = Vec::new();
        match tokio::time::timeout(Duration::from_secs(5), tokio::io::AsyncReadExt::read_to_end(&mut self.reader, &mut rest)).await {
            Ok(Ok(_)) => rest.is_empty(),
            Ok(Err(_)) => true,
            Err(_) => false,
        }
    }
}

/// Wait until the broadcaster holds exactly `count` clients.
#[allow(dead_code)]
pub async fn wait_for_clients(handle: &ServerHandle, count: usize) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while handle.broadcaster().client_count() != count {
        assert!(
            tokio::time::Instant::now() < deadline,
            "expected {count} clients, found {}",
            handle.broadcaster().client_count()
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
