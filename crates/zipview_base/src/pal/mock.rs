use std::collections::{HashMap, HashSet, VecDeque};
use std::io::{Cursor, Write};
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU16, Ordering};

use crate::ZipviewError;
use crate::ZipviewResult;
use crate::error::ErrorKind;

use super::FilePath;
use super::http::{
    HttpRequest, HttpResponse, HttpServerConfig, HttpServerHandle, HttpService, OutboundRequest,
};
use super::traits::{Pal, ReadSeek};

/* 📖 # Why script outbound responses per URL?

The redirect-following proxy is the piece most worth testing, and its behavior depends
entirely on what each hop answers. MockPal keeps a queue of answers per URL: each fetch
pops the next one, and the last one repeats so a self-redirecting URL keeps redirecting.
Every request is recorded so tests can check the headers that were sent.
*/

/// A scripted answer for an outbound fetch.
#[derive(Debug, Clone)]
enum ScriptedFetch {
    Respond(HttpResponse),
    Fail(String),
}

/// In-memory PAL implementation for testing.
///
/// # Examples
///
/// ```
/// use zipview_base::{MockPal, Pal, FilePath};
///
/// let mock = MockPal::new();
/// mock.add_file(FilePath::from("test.txt"), b"content".to_vec());
/// let content = mock.read_file_to_string(&FilePath::from("test.txt")).unwrap();
/// assert_eq!(content, "content");
/// ```
#[derive(Debug, Clone)]
pub struct MockPal {
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    directories: Arc<Mutex<HashSet<FilePath>>>,
    http_servers: Arc<Mutex<HashMap<u16, HttpServerInfo>>>,
    next_port: Arc<AtomicU16>,
    scripted_fetches: Arc<Mutex<HashMap<String, VecDeque<ScriptedFetch>>>>,
    fetched: Arc<Mutex<Vec<OutboundRequest>>>,
}

/// Information about a registered HTTP server.
#[derive(Debug)]
struct HttpServerInfo {
    service: Arc<dyn HttpService>,
    _config: HttpServerConfig,
}

impl MockPal {
    /// Create a new empty MockPal.
    pub fn new() -> Self {
        Self {
            files: Arc::new(Mutex::new(HashMap::new())),
            directories: Arc::new(Mutex::new(HashSet::new())),
            http_servers: Arc::new(Mutex::new(HashMap::new())),
            next_port: Arc::new(AtomicU16::new(10000)),
            scripted_fetches: Arc::new(Mutex::new(HashMap::new())),
            fetched: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Add a file to the mock storage.
    pub fn add_file(&self, path: FilePath, content: Vec<u8>) {
        self.files.lock().unwrap().insert(path, content);
    }

    /// Get the current content of a file, if present.
    pub fn file_content(&self, path: &FilePath) -> Option<Vec<u8>> {
        self.files.lock().unwrap().get(path).cloned()
    }

    /// All stored file paths, sorted.
    pub fn file_paths(&self) -> Vec<String> {
        let mut paths: Vec<String> = self
            .files
            .lock()
            .unwrap()
            .keys()
            .map(|path| path.to_string())
            .collect();
        paths.sort();
        paths
    }

    /// Check whether a directory has been created.
    pub fn directory_exists(&self, path: &FilePath) -> bool {
        self.directories.lock().unwrap().contains(path)
    }

    /// Queue a response for the next fetch of `url`.
    ///
    /// Responses must have byte bodies. The last queued response repeats.
    pub fn add_fetch_response(&self, url: impl Into<String>, response: HttpResponse) {
        self.scripted_fetches
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(ScriptedFetch::Respond(response));
    }

    /// Queue a network failure (no response at all) for the next fetch of `url`.
    pub fn add_fetch_failure(&self, url: impl Into<String>, message: impl Into<String>) {
        self.scripted_fetches
            .lock()
            .unwrap()
            .entry(url.into())
            .or_default()
            .push_back(ScriptedFetch::Fail(message.into()));
    }

    /// Every outbound request issued so far, in order.
    pub fn fetched_requests(&self) -> Vec<OutboundRequest> {
        self.fetched.lock().unwrap().clone()
    }

    /// Simulate an HTTP request to a running server.
    ///
    /// Looks up the registered service for the given port and invokes it directly.
    pub fn simulate_request(&self, port: u16, request: HttpRequest) -> ZipviewResult<HttpResponse> {
        let service = {
            let servers = self.http_servers.lock().unwrap();
            let server_info = servers.get(&port).ok_or_else(|| {
                crate::err!("No HTTP server registered on port {}", port)
            })?;
            Arc::clone(&server_info.service)
        };
        service.handle_request(request)
    }

    /// Get the number of registered HTTP servers.
    pub fn http_server_count(&self) -> usize {
        self.http_servers.lock().unwrap().len()
    }
}

impl Default for MockPal {
    fn default() -> Self {
        Self::new()
    }
}

impl Pal for MockPal {
    fn file_exists(&self, path: &FilePath) -> ZipviewResult<bool> {
        let files = self.files.lock().unwrap();
        Ok(files.contains_key(path))
    }

    fn read_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn ReadSeek + 'static>> {
        let files = self.files.lock().unwrap();
        let content = files
            .get(path)
            .ok_or_else(|| {
                Box::new(ZipviewError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: std::io::Error::new(
                        std::io::ErrorKind::NotFound,
                        format!("File not found: {}", path),
                    ),
                }))
            })?
            .clone();
        Ok(Box::new(Cursor::new(content)))
    }

    fn create_file(&self, path: &FilePath) -> ZipviewResult<Box<dyn Write>> {
        // Stored in the mock storage when the writer is dropped
        Ok(Box::new(MockFileWriter {
            path: path.clone(),
            files: Arc::clone(&self.files),
            buffer: Vec::new(),
        }))
    }

    fn create_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
        self.directories.lock().unwrap().insert(path.clone());
        Ok(())
    }

    fn remove_file(&self, path: &FilePath) -> ZipviewResult<()> {
        self.files.lock().unwrap().remove(path);
        Ok(())
    }

    fn remove_directory_all(&self, path: &FilePath) -> ZipviewResult<()> {
        let prefix = format!("{}/", path);
        self.directories
            .lock()
            .unwrap()
            .retain(|dir| dir != path && !dir.to_string().starts_with(&prefix));
        self.files
            .lock()
            .unwrap()
            .retain(|file, _| !file.to_string().starts_with(&prefix));
        Ok(())
    }

    fn start_http_server(
        &self,
        service: Box<dyn HttpService>,
        config: HttpServerConfig,
    ) -> ZipviewResult<HttpServerHandle> {
        let port = match config.port {
            Some(p) => p,
            None => self.next_port.fetch_add(1, Ordering::SeqCst),
        };
        let server_info = HttpServerInfo {
            service: Arc::from(service),
            _config: config,
        };
        self.http_servers.lock().unwrap().insert(port, server_info);
        Ok(HttpServerHandle::new(port))
    }

    fn fetch(&self, request: &OutboundRequest) -> ZipviewResult<HttpResponse> {
        self.fetched.lock().unwrap().push(request.clone());
        let scripted = {
            let mut scripted_fetches = self.scripted_fetches.lock().unwrap();
            let queue = scripted_fetches.get_mut(request.url());
            match queue {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            }
        };
        match scripted {
            Some(ScriptedFetch::Respond(response)) => Ok(response),
            Some(ScriptedFetch::Fail(message)) => Err(Box::new(ZipviewError::new(
                ErrorKind::Fetch {
                    status: None,
                    message,
                },
            ))),
            None => Err(Box::new(ZipviewError::new(ErrorKind::Fetch {
                status: None,
                message: format!("No scripted response for {}", request.url()),
            }))),
        }
    }
}

/// Helper struct for writing files to MockPal.
struct MockFileWriter {
    path: FilePath,
    files: Arc<Mutex<HashMap<FilePath, Vec<u8>>>>,
    buffer: Vec<u8>,
}

impl Write for MockFileWriter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.write(buf)
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Drop for MockFileWriter {
    fn drop(&mut self) {
        self.files
            .lock()
            .unwrap()
            .insert(self.path.clone(), std::mem::take(&mut self.buffer));
    }
}
