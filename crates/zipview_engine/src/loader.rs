/* 📖 # Why does the loader own the session state?

The current archive and the loading flag used to be page globals. Here they belong to one
`ArchiveLoader`, which the views receive explicitly. That keeps every load path testable with
MockPal and an in-memory store, and makes the lifecycle rules easy to see in one place:

- at most one load runs at a time; a second request while one is running is dropped
- a finished load replaces the current archive as a whole
- a failed load leaves the current archive untouched
- persisting the new archive happens on a background thread and never fails the load
*/

use std::io::{Cursor, Read};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};
use url::Url;
use zipview_base::error::ErrorKind;
use zipview_base::{FilePath, OutboundRequest, PalHandle, ZipviewError, ZipviewResult};

use crate::entry::{ArchiveEntry, LoadedArchive};
use crate::format::display_name_from_url;
use crate::store::{ArchiveMetadata, StoreHandle};

/// The single key the current archive is persisted under.
pub const PERSISTED_ARCHIVE_KEY: &str = "current-archive";

/// Time allowed for downloading an archive through the proxy, body included.
pub const DEFAULT_LOAD_TIMEOUT: Duration = Duration::from_secs(600);

const ARCHIVE_EXTENSION: &str = ".zip";

/// Decode archive bytes into entries, in archive order.
///
/// Sizes come from the archive's metadata, or from the decoded length when the
/// metadata says 0.
pub fn decode_archive(bytes: &[u8]) -> ZipviewResult<Vec<ArchiveEntry>> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).map_err(decode_error)?;
    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let mut file = archive.by_index(index).map_err(decode_error)?;
        let path = file.name().to_string();
        if file.is_dir() {
            entries.push(ArchiveEntry::directory(path));
            continue;
        }
        let mut content = Vec::new();
        file.read_to_end(&mut content).map_err(|e| {
            Box::new(ZipviewError::new(ErrorKind::Decode {
                message: format!("{}: {}", path, e),
            }))
        })?;
        let size = match file.size() {
            0 => content.len() as u64,
            size => size,
        };
        entries.push(ArchiveEntry::file(path, size, content));
    }
    Ok(entries)
}

fn decode_error(error: zip::result::ZipError) -> Box<ZipviewError> {
    Box::new(ZipviewError::new(ErrorKind::Decode {
        message: error.to_string(),
    }))
}

fn validation_error(message: impl Into<String>) -> Box<ZipviewError> {
    Box::new(ZipviewError::new(ErrorKind::Validation {
        message: message.into(),
    }))
}

/// Extract the auto-load URL from a page query string such as `?url=https%3A%2F%2F…`.
pub fn initial_url_from_query(query: &str) -> Option<String> {
    let query = query.strip_prefix('?').unwrap_or(query);
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "url")
        .map(|(_, value)| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Clears the loading flag when a load ends, on every exit path.
struct LoadingGuard<'a>(&'a AtomicBool);

impl Drop for LoadingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Turns byte sources into the current `LoadedArchive`.
#[derive(Debug)]
pub struct ArchiveLoader {
    pal: PalHandle,
    store: StoreHandle,
    proxy_base: String,
    load_timeout: Duration,
    current: RwLock<Option<Arc<LoadedArchive>>>,
    is_loading: AtomicBool,
    pending_persist: Mutex<Option<JoinHandle<()>>>,
}

impl ArchiveLoader {
    /// `proxy_base` is the origin of the server exposing `/api/proxy`, e.g. `http://127.0.0.1:3000`.
    pub fn new(pal: PalHandle, store: StoreHandle, proxy_base: impl Into<String>) -> Self {
        Self {
            pal,
            store,
            proxy_base: proxy_base.into().trim_end_matches('/').to_string(),
            load_timeout: DEFAULT_LOAD_TIMEOUT,
            current: RwLock::new(None),
            is_loading: AtomicBool::new(false),
            pending_persist: Mutex::new(None),
        }
    }

    pub fn with_load_timeout(mut self, timeout: Duration) -> Self {
        self.load_timeout = timeout;
        self
    }

    /// The archive currently shown, if any.
    pub fn current(&self) -> Option<Arc<LoadedArchive>> {
        self.current.read().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading.load(Ordering::SeqCst)
    }

    /// Drop the current archive from the session. The persisted copy is kept.
    pub fn close(&self) {
        *self.current.write() = None;
    }

    fn try_begin_load(&self) -> Option<LoadingGuard<'_>> {
        self.is_loading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()
            .map(|_| LoadingGuard(&self.is_loading))
    }

    /// Decode `bytes` and make them the current archive.
    ///
    /// Returns `Ok(None)` without doing anything if another load is in progress.
    #[instrument(skip(self, bytes), fields(size = bytes.len()))]
    pub fn load_from_bytes(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        source_url: Option<String>,
    ) -> ZipviewResult<Option<Arc<LoadedArchive>>> {
        let Some(_guard) = self.try_begin_load() else {
            debug!("load already in progress, ignoring request");
            return Ok(None);
        };
        self.install(bytes, display_name, source_url).map(Some)
    }

    /// Fetch an archive through the proxy and make it the current archive.
    #[instrument(skip(self))]
    pub fn load_from_url(&self, url: &str) -> ZipviewResult<Option<Arc<LoadedArchive>>> {
        let Some(_guard) = self.try_begin_load() else {
            debug!("load already in progress, ignoring request");
            return Ok(None);
        };
        let url = url.trim();
        if url.is_empty() {
            return Err(validation_error("Please enter a URL"));
        }
        if let Err(e) = Url::parse(url) {
            return Err(validation_error(format!("Invalid URL: {}", e)));
        }
        let display_name = display_name_from_url(url);
        let bytes = self.fetch_through_proxy(url)?;
        self.install(bytes, &display_name, Some(url.to_string()))
            .map(Some)
    }

    /// Read a local archive file and make it the current archive.
    ///
    /// The name is checked before any I/O happens.
    #[instrument(skip(self), fields(path = %path))]
    pub fn load_from_local_file(&self, path: &FilePath) -> ZipviewResult<Option<Arc<LoadedArchive>>> {
        let Some(_guard) = self.try_begin_load() else {
            debug!("load already in progress, ignoring request");
            return Ok(None);
        };
        let name = path.file_name().unwrap_or_default().to_string();
        if !name.to_ascii_lowercase().ends_with(ARCHIVE_EXTENSION) {
            return Err(validation_error("Please select a valid ZIP file"));
        }
        let bytes = self.pal.read_file_to_bytes(path)?;
        self.install(bytes, &name, None).map(Some)
    }

    /// Make the persisted archive current again, e.g. on start.
    ///
    /// Returns `Ok(None)` if nothing usable is stored. A stored archive that no longer
    /// decodes is discarded.
    #[instrument(skip(self))]
    pub fn restore_persisted(&self) -> ZipviewResult<Option<Arc<LoadedArchive>>> {
        let Some(_guard) = self.try_begin_load() else {
            debug!("load already in progress, ignoring request");
            return Ok(None);
        };
        let blob = match self.store.get(PERSISTED_ARCHIVE_KEY) {
            Ok(Some(blob)) => blob,
            Ok(None) => return Ok(None),
            Err(error) => {
                warn!(error = ?error, "failed to read persisted archive");
                return Ok(None);
            }
        };
        let entries = match decode_archive(&blob.bytes) {
            Ok(entries) => entries,
            Err(error) => {
                warn!(error = ?error, "persisted archive is unreadable, discarding it");
                if let Err(error) = self.store.clear() {
                    warn!(error = ?error, "failed to discard persisted archive");
                }
                return Ok(None);
            }
        };
        let archive = Arc::new(LoadedArchive::new(
            blob.metadata.name,
            blob.metadata.source_url,
            blob.bytes,
            entries,
        ));
        info!(name = archive.source_name(), "restored persisted archive");
        *self.current.write() = Some(Arc::clone(&archive));
        Ok(Some(archive))
    }

    /// Remove the persisted archive. Waits for a pending write first so it cannot reappear.
    pub fn clear_persisted(&self) -> ZipviewResult<()> {
        self.wait_for_persistence();
        self.store.clear()
    }

    /// Block until the most recent persistence write has finished.
    pub fn wait_for_persistence(&self) {
        let pending = self.pending_persist.lock().take();
        if let Some(handle) = pending {
            if handle.join().is_err() {
                warn!("archive persistence thread panicked");
            }
        }
    }

    fn fetch_through_proxy(&self, url: &str) -> ZipviewResult<Vec<u8>> {
        let encoded: String = url::form_urlencoded::byte_serialize(url.as_bytes()).collect();
        let proxy_url = format!("{}/api/proxy?url={}", self.proxy_base, encoded);
        let request = OutboundRequest::get(proxy_url).with_timeout(self.load_timeout);
        let response = self.pal.fetch(&request)?;
        let status = response.status();
        if !status.is_success() {
            let body = response.into_body().read_all().unwrap_or_default();
            return Err(Box::new(ZipviewError::new(ErrorKind::Fetch {
                status: Some(status.as_u16()),
                message: proxy_error_message(&body)
                    .unwrap_or_else(|| status.reason_phrase().to_string()),
            })));
        }
        let bytes = response.into_body().read_all().map_err(|e| {
            Box::new(ZipviewError::new(ErrorKind::Fetch {
                status: None,
                message: format!("Failed to read archive: {}", e),
            }))
        })?;
        debug!(size = bytes.len(), "received archive through proxy");
        Ok(bytes)
    }

    fn install(
        &self,
        bytes: Vec<u8>,
        display_name: &str,
        source_url: Option<String>,
    ) -> ZipviewResult<Arc<LoadedArchive>> {
        let entries = decode_archive(&bytes)?;
        let archive = Arc::new(LoadedArchive::new(display_name, source_url, bytes, entries));
        info!(
            name = archive.source_name(),
            entries = archive.entries().len(),
            "archive loaded"
        );
        *self.current.write() = Some(Arc::clone(&archive));
        self.persist(Arc::clone(&archive));
        Ok(archive)
    }

    fn persist(&self, archive: Arc<LoadedArchive>) {
        let store = self.store.clone();
        let mut pending = self.pending_persist.lock();
        // Writes are chained so an older archive never overwrites a newer one
        let previous = pending.take();
        let spawned = std::thread::Builder::new()
            .name("archive-persist".to_string())
            .spawn(move || {
                if let Some(previous) = previous {
                    let _ = previous.join();
                }
                let metadata = ArchiveMetadata {
                    name: archive.source_name().to_string(),
                    source_url: archive.source_url().map(str::to_string),
                };
                match store.put(PERSISTED_ARCHIVE_KEY, archive.raw_bytes(), &metadata) {
                    Ok(()) => debug!(name = %metadata.name, "archive persisted"),
                    Err(error) => warn!(error = ?error, "failed to persist archive"),
                }
            });
        match spawned {
            Ok(handle) => *pending = Some(handle),
            Err(e) => warn!(error = %e, "failed to start archive persistence"),
        }
    }
}

/// The `error` field of a JSON error body sent by the proxy.
fn proxy_error_message(body: &[u8]) -> Option<String> {
    let value: serde_json::Value = serde_json::from_slice(body).ok()?;
    value.get("error")?.as_str().map(str::to_string)
}

impl Drop for ArchiveLoader {
    fn drop(&mut self) {
        self.wait_for_persistence();
    }
}
