use std::io::{Read, Seek, Write};
use std::sync::Arc;

use crate::ZipviewResult;
use crate::error::{ErrorKind, ZipviewError};

use super::file_path::FilePath;
use super::http::{HttpResponse, HttpServerConfig, HttpServerHandle, HttpService, OutboundRequest};

/// Trait combining Read + Seek for file operations.
///
/// ZIP decoding needs random access, so file handles handed out by the PAL are seekable.
pub trait ReadSeek: Read + Seek + Send {}
impl<T: Read + Seek + Send> ReadSeek for T {}

/* 📖 # Why is Pal a trait instead of a struct?

Everything with a side effect goes through here: the static file server reads from disk,
the large-archive store writes to disk, the proxy fetches from the network and the binary
listens on a socket. With a trait, the same code runs against MockPal in tests.
*/

/// Platform Abstraction Layer (PAL) trait.
///
/// Two implementations are provided:
/// - `RealPal`: std::fs, tiny_http and reqwest
/// - `MockPal`: in-memory implementation for testing
pub trait Pal: std::fmt::Debug + Send + Sync + 'static {
    /// Check if a file exists at the given path.
    fn file_exists(&self, path: &FilePath) -> ZipviewResult<bool>;

    /// Open a file for reading.
    fn read_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn ReadSeek + 'static>>;

    /// Read entire file contents into memory.
    fn read_file_to_bytes(&self, path: &FilePath) -> ZipviewResult<Vec<u8>> {
        let mut reader = self.read_file(path)?;
        let mut contents = Vec::new();
        reader.read_to_end(&mut contents).map_err(|e| {
            Box::new(ZipviewError::new(ErrorKind::FileError {
                path: path.as_path().to_path_buf(),
                source: e,
            }))
        })?;
        Ok(contents)
    }

    /// Read entire file contents as a UTF-8 string.
    fn read_file_to_string(&self, path: &FilePath) -> ZipviewResult<String> {
        let contents = self.read_file_to_bytes(path)?;
        String::from_utf8(contents).map_err(|_e| crate::err!("File is not valid UTF-8: {}", path))
    }

    /// Create a new file, overwriting if it exists.
    fn create_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn Write>>;

    /// Create a directory and all parent directories.
    fn create_directory_all(&self, path: &FilePath) -> ZipviewResult<()>;

    /// Remove a single file. Removing a file that does not exist is not an error.
    fn remove_file(&self, path: &FilePath) -> ZipviewResult<()>;

    /// Remove a directory and all its contents.
    fn remove_directory_all(&self, path: &FilePath) -> ZipviewResult<()>;

    /// Start an HTTP server with the given service.
    ///
    /// Returns a handle to the running server. When the last handle is dropped (or
    /// shutdown() is called) the server stops accepting new connections.
    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> ZipviewResult<HttpServerHandle>;

    /// Issue a single outbound GET request.
    ///
    /// Redirects are not followed: a 3xx response is returned like any other.
    /// Failing to obtain any response (DNS, connect, timeout) is a `Fetch` error
    /// without a status.
    fn fetch(&self, request: &OutboundRequest) -> ZipviewResult<HttpResponse>;
}

/* 📖 # Why use Arc<dyn Pal> with PalHandle?

Arc enables cheap cloning of the entire PAL implementation, so the archive loader, the
byte stores and every request thread of the HTTP service can share one instance.
PalHandle wraps this for ergonomic Deref access and avoids lifetime parameters.
*/

/// Handle to a PAL implementation, enabling shared ownership.
///
/// # Examples
///
/// ```no_run
/// use zipview_base::{RealPal, PalHandle};
///
/// let pal = PalHandle::new(RealPal::new(".".into()));
/// let pal_clone = pal.clone(); // Cheap clone, shares the same implementation
/// ```
#[derive(Debug, Clone)]
pub struct PalHandle(Arc<dyn Pal>);

impl PalHandle {
    /// Create a new PalHandle from a Pal implementation.
    pub fn new(pal: impl Pal + 'static) -> Self {
        Self(Arc::new(pal))
    }
}

impl std::ops::Deref for PalHandle {
    type Target = dyn Pal;

    fn deref(&self) -> &Self::Target {
        &*self.0
    }
}
