/* 📖 # Why have zipview_base as a core library?
zipview_base provides the foundational error handling, tracing setup and platform abstraction
used across all crates. This keeps error handling consistent and keeps every piece of I/O
(files, the HTTP server, outbound fetches) behind one mockable trait.
*/

pub mod error;
pub mod pal;
pub mod tracing;

// Re-export commonly used types for convenience
pub use error::{ErrorKind, ResultExt, ZipviewError, ZipviewResult};
pub use pal::http::{
    HttpBody, HttpHeaders, HttpMethod, HttpRequest, HttpResponse, HttpServerConfig,
    HttpServerHandle, HttpService, HttpStatusCode, OutboundRequest,
};
pub use pal::{FilePath, MockPal, Pal, PalHandle, RealPal, ReadSeek};
