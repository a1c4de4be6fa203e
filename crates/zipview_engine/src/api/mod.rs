/* 📖 # Why an API module in zipview_engine?

The api module holds the server side of the viewer: the fetch proxy endpoints and the
static file server, combined into one `ZipViewService`. The service implements the
HttpService trait from zipview_base, so it runs unchanged on RealPal (tiny_http and
reqwest) and on MockPal in tests.
*/

mod service;
mod static_files;

pub use service::ZipViewService;
pub use static_files::{StaticFiles, content_type_for};
