use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::{debug, info, instrument, warn};

use crate::{ZipviewError, ZipviewResult, error::ErrorKind};

use super::FilePath;
use super::http::{
    HttpBody, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpServerConfig,
    HttpServerHandle, HttpService, HttpStatusCode, OutboundRequest,
};
use super::traits::{Pal, ReadSeek};

/// How long the accept loop waits before re-checking the shutdown flag.
const ACCEPT_POLL_INTERVAL: Duration = Duration::from_millis(100);

/* 📖 # Why synchronous I/O everywhere?

The server handles one thread per request and blocks on reads and writes. Proxying a large
archive is a single blocking copy from the reqwest response into the tiny_http socket, so
there is nothing an async runtime would buy here.
*/

/// Concrete PAL implementation using the real filesystem and network.
///
/// All file paths are resolved relative to a configured base directory.
#[derive(Debug)]
pub struct RealPal {
    base_dir: PathBuf,
}

impl RealPal {
    /// Create a new RealPal with the given base directory.
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }

    /// Resolve a FilePath to an absolute filesystem path.
    fn resolve_path(&self, path: &FilePath) -> PathBuf {
        self.base_dir.join(path.as_path())
    }
}

fn file_error(path: PathBuf, source: std::io::Error) -> Box<ZipviewError> {
    Box::new(ZipviewError::new(ErrorKind::FileError { path, source }))
}

impl Pal for RealPal {
    #[instrument(skip(self), fields(path = %path))]
    fn file_exists(&self, path: &FilePath) -> ZipviewResult<bool> {
        let resolved = self.resolve_path(path);
        let exists = resolved.is_file();
        debug!(exists, resolved = %resolved.display(), "checked file existence");
        Ok(exists)
    }

    #[instrument(skip(self), fields(path = %path))]
    fn read_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn ReadSeek + 'static>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "opening file for reading");
        let file = fs::File::open(&resolved).map_err(|e| {
            debug!(error = %e, "failed to open file");
            file_error(resolved, e)
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn Write>> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "creating file");
        let file = fs::File::create(&resolved).map_err(|e| {
            debug!(error = %e, "failed to create file");
            file_error(resolved, e)
        })?;
        Ok(Box::new(file))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn create_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "creating directory and parents");
        fs::create_dir_all(&resolved).map_err(|e| file_error(resolved, e))
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_file(&self, path: &FilePath) -> ZipviewResult<()> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "removing file");
        match fs::remove_file(&resolved) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(file_error(resolved, e)),
        }
    }

    #[instrument(skip(self), fields(path = %path))]
    fn remove_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
        let resolved = self.resolve_path(path);
        debug!(resolved = %resolved.display(), "removing directory and contents");
        match fs::remove_dir_all(&resolved) {
            Ok(()) => Ok(()),
            // Nothing to remove
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(file_error(resolved, e)),
        }
    }

    #[instrument(skip(self, service), fields(address = %config.address()))]
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> ZipviewResult<HttpServerHandle> {
        let server = tiny_http::Server::http(config.address()).map_err(|e| {
            crate::err!("Failed to bind HTTP server to {}: {}", config.address(), e)
        })?;
        let port = server
            .server_addr()
            .to_ip()
            .map(|addr| addr.port())
            .ok_or_else(|| crate::err!("HTTP server is not listening on an IP address"))?;
        info!(host = %config.host, port, "HTTP server listening");

        let handle = HttpServerHandle::new(port);
        let shutdown = Arc::clone(handle.shutdown_flag());
        let service: Arc<dyn HttpService> = Arc::from(service);
        let server_name = config.server_name.clone();
        std::thread::Builder::new()
            .name(format!("http-accept-{}", port))
            .spawn(move || accept_loop(server, service, shutdown, server_name))
            .map_err(|e| crate::err!("Failed to spawn HTTP accept thread: {}", e))?;
        Ok(handle)
    }

    #[instrument(skip(self, request), fields(url = %request.url()))]
    fn fetch(&self, request: &OutboundRequest) -> ZipviewResult<HttpResponse> {
        let client = reqwest::blocking::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .timeout(request.timeout())
            .build()
            .map_err(|e| crate::err!("Failed to build HTTP client: {}", e))?;
        let mut builder = client.get(request.url());
        for (name, value) in request.headers().iter() {
            builder = builder.header(name, value);
        }
        let response = builder.send().map_err(|e| {
            debug!(error = %e, "outbound request failed");
            let message = if e.is_timeout() {
                format!("Request timed out after {} s", request.timeout().as_secs())
            } else {
                e.to_string()
            };
            Box::new(ZipviewError::new(ErrorKind::Fetch {
                status: None,
                message,
            }))
        })?;

        let status = HttpStatusCode::from(response.status().as_u16());
        debug!(status = status.as_u16(), "received upstream response");
        let mut headers = HttpHeaders::new();
        for (name, value) in response.headers() {
            match value.to_str() {
                Ok(value) => headers.insert(name.as_str(), value),
                Err(_) => warn!(header = %name, "skipping non-ASCII upstream header"),
            }
        }
        let mut result = HttpResponse::new(status).with_body(HttpBody::from_reader(response));
        *result.headers_mut() = headers;
        Ok(result)
    }
}

fn accept_loop(
    server: tiny_http::Server,
    service: Arc<dyn HttpService>,
    shutdown: Arc<AtomicBool>,
    server_name: String,
) {
    while !shutdown.load(Ordering::SeqCst) {
        let request = match server.recv_timeout(ACCEPT_POLL_INTERVAL) {
            Ok(Some(request)) => request,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "failed to accept HTTP request");
                continue;
            }
        };
        let service = Arc::clone(&service);
        let server_name = server_name.clone();
        let spawned = std::thread::Builder::new()
            .name("http-request".to_string())
            .spawn(move || handle_connection(request, service.as_ref(), &server_name));
        if let Err(e) = spawned {
            warn!(error = %e, "failed to spawn HTTP request thread");
        }
    }
    info!("HTTP server shut down");
}

fn handle_connection(mut raw: tiny_http::Request, service: &dyn HttpService, server_name: &str) {
    let response = match convert_request(&mut raw) {
        Ok(request) => {
            let method = request.method().clone();
            let path = request.path().to_string();
            match service.handle_request(request) {
                Ok(response) => {
                    debug!(%method, %path, status = response.status().as_u16(), "handled request");
                    response
                }
                Err(error) => {
                    warn!(%method, %path, error = ?error, "service returned an error");
                    error_response(&error.to_string())
                }
            }
        }
        Err(error) => error_response(&error.to_string()),
    };

    let (status, headers, body) = response.into_parts();
    let mut raw_headers = Vec::with_capacity(headers.len() + 1);
    for (name, value) in headers.iter() {
        match tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            Ok(header) => raw_headers.push(header),
            Err(()) => warn!(header = %name, "dropping invalid response header"),
        }
    }
    if let Ok(header) = tiny_http::Header::from_bytes(&b"Server"[..], server_name.as_bytes()) {
        raw_headers.push(header);
    }
    let length = body.known_len();
    let raw_response = tiny_http::Response::new(
        tiny_http::StatusCode(status.as_u16()),
        raw_headers,
        body.into_reader(),
        length,
        None,
    );
    if let Err(e) = raw.respond(raw_response) {
        debug!(error = %e, "client went away while sending response");
    }
}

fn convert_request(raw: &mut tiny_http::Request) -> ZipviewResult<HttpRequest> {
    let method = HttpMethod::parse(raw.method().as_str())
        .ok_or_else(|| crate::err!("Unsupported HTTP method: {}", raw.method()))?;
    let mut request = HttpRequest::new(method, raw.url());
    for header in raw.headers() {
        request
            .headers_mut()
            .insert(header.field.as_str().as_str(), header.value.as_str());
    }
    let mut body = Vec::new();
    raw.as_reader()
        .read_to_end(&mut body)
        .map_err(|e| crate::err!("Failed to read request body: {}", e))?;
    Ok(request.with_body(body))
}

/// Errors that escape the service surface as 599 so they stand out from deliberate 5xx answers.
fn error_response(message: &str) -> HttpResponse {
    let escaped = message.replace('\\', "\\\\").replace('"', "\\\"");
    HttpResponse::new(HttpStatusCode::NetworkConnectTimeoutError)
        .with_content_type("application/json")
        .with_body(format!("{{\"error\":\"{}\"}}", escaped))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    fn setup_test_dir() -> (TempDir, RealPal) {
        let temp_dir = TempDir::new().expect("failed to create temp dir");
        let pal = RealPal::new(temp_dir.path().to_path_buf());
        (temp_dir, pal)
    }

    #[test]
    fn test_file_exists() {
        let (temp_dir, pal) = setup_test_dir();
        fs::write(temp_dir.path().join("index.html"), "<html>").unwrap();

        assert!(pal.file_exists(&FilePath::from("index.html")).unwrap());
        assert!(!pal.file_exists(&FilePath::from("missing.html")).unwrap());
    }

    #[test]
    fn test_directory_is_not_a_file() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir(temp_dir.path().join("public")).unwrap();

        assert!(!pal.file_exists(&FilePath::from("public")).unwrap());
    }

    #[test]
    fn test_read_file_not_found_is_file_error() {
        let (_temp_dir, pal) = setup_test_dir();
        let error = pal.read_file(&FilePath::from("nope.txt")).err().unwrap();
        match error.kind() {
            ErrorKind::FileError { source, .. } => {
                assert_eq!(source.kind(), std::io::ErrorKind::NotFound)
            }
            other => panic!("unexpected error kind: {other:?}"),
        }
    }

    #[test]
    fn test_create_file_and_read_back() {
        let (temp_dir, pal) = setup_test_dir();
        pal.create_directory_all(&FilePath::from("store/large")).unwrap();

        let mut writer = pal.create_file(&FilePath::from("store/large/a.bin")).unwrap();
        writer.write_all(b"PK\x05\x06").unwrap();
        drop(writer);

        assert_eq!(
            fs::read(temp_dir.path().join("store/large/a.bin")).unwrap(),
            b"PK\x05\x06"
        );
        assert_eq!(
            pal.read_file_to_bytes(&FilePath::from("store/large/a.bin")).unwrap(),
            b"PK\x05\x06"
        );
    }

    #[test]
    fn test_remove_directory_all() {
        let (temp_dir, pal) = setup_test_dir();
        fs::create_dir_all(temp_dir.path().join("store/x")).unwrap();

        pal.remove_directory_all(&FilePath::from("store")).unwrap();
        assert!(!temp_dir.path().join("store").exists());

        // Removing again is not an error
        pal.remove_directory_all(&FilePath::from("store")).unwrap();
    }

    #[test]
    fn test_error_response_is_599_json() {
        let response = error_response("bad \"thing\"");
        assert_eq!(response.status().as_u16(), 599);
        assert_eq!(
            response.body().as_string().unwrap(),
            r#"{"error":"bad \"thing\""}"#
        );
    }

    #[derive(Debug)]
    struct EchoService;

    impl HttpService for EchoService {
        fn handle_request(&self, request: HttpRequest) -> ZipviewResult<HttpResponse> {
            if request.path() == "/fail" {
                crate::bail!("boom");
            }
            Ok(HttpResponse::ok()
                .with_content_type("text/plain")
                .with_body(format!("{} {}", request.method(), request.path())))
        }
    }

    #[test]
    fn test_http_server_round_trip() {
        let (_temp_dir, pal) = setup_test_dir();
        let handle = pal
            .start_http_server(Box::new(EchoService), HttpServerConfig::default())
            .unwrap();
        let base = format!("http://127.0.0.1:{}", handle.port());

        let response = pal
            .fetch(&OutboundRequest::get(format!("{}/hello?x=1", base)))
            .unwrap();
        assert_eq!(response.status(), HttpStatusCode::Ok);
        assert_eq!(
            response.headers().get("content-type"),
            Some(&"text/plain".to_string())
        );
        let body = response.into_body().read_all().unwrap();
        assert_eq!(body, b"GET /hello?x=1");

        let failed = pal
            .fetch(&OutboundRequest::get(format!("{}/fail", base)))
            .unwrap();
        assert_eq!(failed.status().as_u16(), 599);

        handle.shutdown();
    }

    #[test]
    fn test_fetch_connection_refused_is_fetch_error() {
        let (_temp_dir, pal) = setup_test_dir();
        // Bind then drop a listener to obtain a port nobody listens on
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let error = pal
            .fetch(
                &OutboundRequest::get(format!("http://127.0.0.1:{}/a.zip", port))
                    .with_timeout(Duration::from_secs(5)),
            )
            .err()
            .unwrap();
        assert!(matches!(
            error.kind(),
            ErrorKind::Fetch { status: None, .. }
        ));
    }
}
