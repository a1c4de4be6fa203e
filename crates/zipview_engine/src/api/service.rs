/* 📖 # Why a single unified service?

One `ZipViewService` answers every path: the CORS preflight, the path-embedded URL shortcut,
the two proxy endpoints and the static client files. There is one service to register and
one place where the CORS headers are attached, and MockPal tests only need to register one
service.

The service never lets an error escape to the PAL. Every failure is answered deliberately:
400 for missing parameters, 500 with a JSON `{error}` body for failed fetches, 404/500 pages
for static files.
*/

/* 📖 # Why is /api/proxy an open relay?

The proxy fetches whatever URL it is given, without an allow-list or origin check. It exists
so a browser can read archives from hosts that send no CORS headers. It is a convenience for
a client-side tool and not a trust boundary, so access control is deliberately absent.
*/

use serde::Serialize;
use tracing::{debug, error, info};
use zipview_base::error::ErrorKind;
use zipview_base::{
    FilePath, HttpMethod, HttpRequest, HttpResponse, HttpService, HttpStatusCode, PalHandle,
    ZipviewError, ZipviewResult,
};

use crate::api::static_files::StaticFiles;
use crate::config::ServerConfig;
use crate::format::display_name_from_url;
use crate::proxy::fetch_with_redirects;

const CACHE_CONTROL: &str = "public, max-age=86400";
const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// JSON body of every API error response.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: String,
}

/// HTTP service for the archive viewer.
///
/// - `OPTIONS *` - CORS preflight, 200 with an empty body
/// - `GET /http://…`, `GET /https://…` - 302 to `/?url=<target>`
/// - `GET /api/proxy?url=…` - the target's bytes, streamed
/// - `GET /api/extract?url=…&file=…` - the whole archive, tagged with `X-File-Path`
/// - anything else - static files below the configured root
#[derive(Debug)]
pub struct ZipViewService {
    pal: PalHandle,
    config: ServerConfig,
    static_files: StaticFiles,
}

impl ZipViewService {
    pub fn new(pal: PalHandle, config: ServerConfig) -> Self {
        let static_files = StaticFiles::new(FilePath::from(config.static_root.as_str()));
        Self {
            pal,
            config,
            static_files,
        }
    }

    fn route(&self, request: &HttpRequest) -> HttpResponse {
        if request.method() == &HttpMethod::Options {
            return HttpResponse::ok();
        }
        let path = request.path_without_query();
        if let Some(target) = embedded_target(path) {
            let encoded: String =
                url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
            info!(url = target, "redirecting path-embedded URL");
            return HttpResponse::redirect(format!("/?url={}", encoded));
        }
        let result = match path {
            "/api/proxy" => self.handle_proxy(request),
            "/api/extract" => self.handle_extract(request),
            _ => return self.static_files.serve(&*self.pal, path),
        };
        result.unwrap_or_else(|e| failure_response(&e))
    }

    /// GET /api/proxy?url=…
    fn handle_proxy(&self, request: &HttpRequest) -> ZipviewResult<HttpResponse> {
        let target = required_param(request, "url", "url parameter required")?;
        info!(url = %target, "proxy request");
        let proxied = fetch_with_redirects(&*self.pal, &target, &self.config.proxy)?;
        let (_, upstream_headers, body) = proxied.response.into_parts();
        let content_type = upstream_headers
            .get("content-type")
            .map(String::as_str)
            .unwrap_or(FALLBACK_CONTENT_TYPE);
        let file_name = display_name_from_url(&target);
        Ok(HttpResponse::ok()
            .with_content_type(content_type)
            .with_header("Cache-Control", CACHE_CONTROL)
            .with_header(
                "Content-Disposition",
                format!("attachment; filename=\"{}\"", file_name),
            )
            .with_body(body))
    }

    /// GET /api/extract?url=…&file=…
    ///
    /// Returns the whole archive; picking the member out of it is left to the client.
    fn handle_extract(&self, request: &HttpRequest) -> ZipviewResult<HttpResponse> {
        let target = required_param(request, "url", "url and file parameters required")?;
        let file = required_param(request, "file", "url and file parameters required")?;
        info!(url = %target, file = %file, "extract request");
        let proxied = fetch_with_redirects(&*self.pal, &target, &self.config.proxy)?;
        Ok(HttpResponse::ok()
            .with_content_type(FALLBACK_CONTENT_TYPE)
            .with_header("X-File-Path", file)
            .with_body(proxied.response.into_body()))
    }
}

impl HttpService for ZipViewService {
    fn handle_request(&self, request: HttpRequest) -> ZipviewResult<HttpResponse> {
        debug!(method = %request.method(), path = request.path(), "handling request");
        let response = self.route(&request);
        Ok(with_cors(response))
    }
}

fn with_cors(response: HttpResponse) -> HttpResponse {
    response
        .with_header("Access-Control-Allow-Origin", "*")
        .with_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
        .with_header("Access-Control-Allow-Headers", "Content-Type")
}

/// The target of `/http://…` or `/https://…`.
fn embedded_target(path: &str) -> Option<&str> {
    let target = path.strip_prefix('/')?;
    (target.starts_with("http://") || target.starts_with("https://")).then_some(target)
}

fn required_param(request: &HttpRequest, name: &str, message: &str) -> ZipviewResult<String> {
    request
        .query_param(name)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            Box::new(ZipviewError::new(ErrorKind::BadRequest {
                message: message.to_string(),
            }))
        })
}

fn failure_response(error: &ZipviewError) -> HttpResponse {
    let status = match error.kind() {
        ErrorKind::BadRequest { .. } => HttpStatusCode::BadRequest,
        _ => {
            error!(error = ?error, "proxy request failed");
            HttpStatusCode::InternalServerError
        }
    };
    let body = ErrorResponse {
        error: error.to_string(),
    };
    // Serializing a single string field cannot fail
    let json = serde_json::to_string(&body).unwrap_or_else(|_| r#"{"error":"error"}"#.to_string());
    HttpResponse::json(json).with_status(status)
}
