//! Default responder: files under a document root.
//!
//! # Design Decisions
//! - Targets ending in `/` serve the index file of that directory
//! - Any `..` segment is refused with 403 before touching the filesystem
//! - Bodies are file-backed and streamed by the codec
//! - POST is not implemented (501)

use std::io;
use std::path::{Path, PathBuf};

use futures_util::future::BoxFuture;
use tokio::fs::File;

use crate::config::StaticFilesConfig;
use crate::http::{Request, Response, StatusCode};
use crate::routing::{Handler, HandlerError};

const DEFAULT_MIME_TYPE: &str = "application/octet-stream";

#[derive(Debug, Clone)]
pub struct StaticFileHandler {
    root: PathBuf,
    index: String,
}

impl StaticFileHandler {
    pub fn new(root: impl Into<PathBuf>, index: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            index: index.into(),
        }
    }

    pub fn from_config(config: &StaticFilesConfig) -> Self {
        Self::new(config.root.clone(), config.index.clone())
    }

    /// File path for a request path, or `None` when it tries to escape the root.
    fn resolve(&self, request_path: &str) -> Option<PathBuf> {
        let mut resolved = self.root.clone();
        for segment in request_path.split('/') {
            match segment {
                "" | "." => {}
                ".." => return None,
                s if s.contains('\\') || s.contains('\0') => return None,
                s => resolved.push(s),
            }
        }
        if request_path.is_empty() || request_path.ends_with('/') {
            resolved.push(&self.index);
        }
        Some(resolved)
    }
}

/// Content type for a file name, by extension.
pub fn mime_for(path: &Path) -> &'static str {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    match extension.as_deref() {
        Some("html") | Some("htm") => "text/html; charset=utf-8",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("txt") => "text/plain; charset=utf-8",
        Some("png") => "image/png",
        Some("jpg") | Some("jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        _ => DEFAULT_MIME_TYPE,
    }
}

/// Open `path` if it is a regular file.
async fn open_regular(path: &Path) -> io::Result<Option<(File, u64)>> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e),
    };
    if !metadata.is_file() {
        return Ok(None);
    }
    let file = File::open(path).await?;
    Ok(Some((file, metadata.len())))
}

impl Handler for StaticFileHandler {
    fn name(&self) -> &'static str {
        "static"
    }

    fn handle_get<'a>(
        &'a self,
        request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            let Some(path) = self.resolve(request.path()) else {
                tracing::warn!(target_path = request.path(), "Path traversal refused");
                response.set_error(StatusCode::FORBIDDEN);
                return Ok(());
            };

            match open_regular(&path).await {
                Ok(Some((file, len))) => {
                    tracing::debug!(file = %path.display(), len, "Serving file");
                    response.set_file(file, len, mime_for(&path));
                }
                Ok(None) => {
                    tracing::debug!(file = %path.display(), "File not found");
                    response.set_error(StatusCode::NOT_FOUND);
                }
                Err(e) if e.kind() == io::ErrorKind::PermissionDenied => {
                    response.set_error(StatusCode::FORBIDDEN);
                }
                Err(e) => return Err(e.into()),
            }
            Ok(())
        })
    }

    fn handle_post<'a>(
        &'a self,
        _request: &'a Request,
        response: &'a mut Response,
    ) -> BoxFuture<'a, Result<(), HandlerError>> {
        Box::pin(async move {
            response.set_error(StatusCode::NOT_IMPLEMENTED);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolves_under_root() {
        let handler = StaticFileHandler::new("/srv/www", "index.html");
        assert_eq!(handler.resolve("/"), Some(PathBuf::from("/srv/www/index.html")));
        assert_eq!(handler.resolve("/css/site.css"), Some(PathBuf::from("/srv/www/css/site.css")));
        assert_eq!(handler.resolve("/docs/"), Some(PathBuf::from("/srv/www/docs/index.html")));
        assert_eq!(handler.resolve("/./a//b"), Some(PathBuf::from("/srv/www/a/b")));
    }

    #[test]
    fn traversal_is_refused() {
        let handler = StaticFileHandler::new("/srv/www", "index.html");
        assert_eq!(handler.resolve("/../etc/passwd"), None);
        assert_eq!(handler.resolve("/a/../../b"), None);
        assert_eq!(handler.resolve("/a\\..\\b"), None);
    }

    #[test]
    fn mime_table() {
        assert_eq!(mime_for(Path::new("index.HTML")), "text/html; charset=utf-8");
        assert_eq!(mime_for(Path::new("app.js")), "text/javascript");
        assert_eq!(mime_for(Path::new("logo.svg")), "image/svg+xml");
        assert_eq!(mime_for(Path::new("photo.jpeg")), "image/jpeg");
        assert_eq!(mime_for(Path::new("archive.tar.gz")), DEFAULT_MIME_TYPE);
        assert_eq!(mime_for(Path::new("README")), DEFAULT_MIME_TYPE);
    }
}
