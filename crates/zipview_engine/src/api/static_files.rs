use percent_encoding::percent_decode_str;
use tracing::{debug, error};
use zipview_base::error::ErrorKind;
use zipview_base::{FilePath, HttpBody, HttpResponse, Pal, ZipviewError};

const INDEX_FILE: &str = "index.html";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Serves the client files below one root directory.
///
/// No directory listings, no range requests and no caching headers.
#[derive(Debug, Clone)]
pub struct StaticFiles {
    root: FilePath,
}

impl StaticFiles {
    pub fn new(root: FilePath) -> Self {
        Self { root }
    }

    /// Answer a GET for `request_path` (without query). Never fails: errors become 404 or 500 pages.
    pub fn serve(&self, pal: &dyn Pal, request_path: &str) -> HttpResponse {
        let Ok(decoded) = percent_decode_str(request_path).decode_utf8() else {
            debug!(path = request_path, "request path is not valid UTF-8");
            return not_found();
        };
        let relative = decoded.trim_start_matches('/');
        let relative = if relative.is_empty() {
            INDEX_FILE
        } else {
            relative
        };
        // Checked after decoding so `%2e%2e` cannot climb out either
        let requested = FilePath::from(relative);
        if requested.escapes_base() {
            debug!(path = request_path, "rejecting path outside the static root");
            return not_found();
        }
        let path = self.root.join(relative);
        match pal.read_file_to_bytes(&path) {
            Ok(content) => {
                debug!(path = %path, size = content.len(), "serving static file");
                HttpResponse::ok()
                    .with_content_type(content_type_for(relative))
                    .with_body(HttpBody::from_bytes(content))
            }
            Err(e) if is_not_found(&e) => {
                debug!(path = %path, "static file not found");
                not_found()
            }
            Err(e) => {
                error!(path = %path, error = ?e, "failed to read static file");
                HttpResponse::internal_error()
                    .with_content_type("text/html")
                    .with_body("<h1>500</h1>")
            }
        }
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::not_found()
        .with_content_type("text/html")
        .with_body("<h1>404</h1>")
}

fn is_not_found(error: &ZipviewError) -> bool {
    matches!(
        error.kind(),
        ErrorKind::FileError { source, .. } if source.kind() == std::io::ErrorKind::NotFound
    )
}

/// Content type by extension, for the handful of file types the client ships.
pub fn content_type_for(path: &str) -> &'static str {
    let name = path.rsplit('/').next().unwrap_or(path);
    let extension = name
        .rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase());
    match extension.as_deref() {
        Some("html" | "htm") => "text/html",
        Some("js" | "mjs") => "text/javascript",
        Some("css") => "text/css",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("svg") => "image/svg+xml",
        Some("ico") => "image/x-icon",
        Some("txt") => "text/plain",
        Some("woff2") => "font/woff2",
        _ => FALLBACK_CONTENT_TYPE,
    }
}
