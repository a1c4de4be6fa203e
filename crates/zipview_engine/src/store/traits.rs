/* 📖 # Why a ByteStore trait?

The loader persists the last archive and restores it on the next start, but it should not
care where the bytes end up. Small archives fit comfortably in memory, large ones go to
disk through the PAL, and tests use whatever is convenient. The loader only ever sees
`put`, `get` and `clear` on a `StoreHandle`; which tier answered is invisible to it.
*/

use std::sync::Arc;

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use zipview_base::ZipviewResult;

/// Descriptive data stored alongside the raw archive bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArchiveMetadata {
    /// Display filename.
    pub name: String,
    /// Remote origin, if the archive was fetched.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_url: Option<String>,
}

/// Bytes and metadata as read back from a store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredBlob {
    pub bytes: Vec<u8>,
    pub metadata: ArchiveMetadata,
}

/// A key-value store for archive blobs.
pub trait ByteStore: std::fmt::Debug + Send + Sync + 'static {
    /// Store `bytes` under `key`, replacing any previous value.
    fn put(&mut self, key: &str, bytes: &[u8], metadata: &ArchiveMetadata) -> ZipviewResult<()>;

    /// Read the value stored under `key`.
    ///
    /// # Returns
    /// * `Ok(Some(blob))` - If a value exists
    /// * `Ok(None)` - If nothing is stored under that key
    fn get(&self, key: &str) -> ZipviewResult<Option<StoredBlob>>;

    /// Remove every stored value.
    fn clear(&mut self) -> ZipviewResult<()>;
}

/// A thread-safe, cheaply cloneable handle to a byte store.
///
/// The persistence thread writes through one clone while the loader reads through another.
#[derive(Debug, Clone)]
pub struct StoreHandle(Arc<RwLock<dyn ByteStore>>);

impl StoreHandle {
    /// Create a new StoreHandle wrapping the given store implementation.
    pub fn new<S: ByteStore>(store: S) -> Self {
        Self(Arc::new(RwLock::new(store)))
    }

    /// See [`ByteStore::put`].
    pub fn put(&self, key: &str, bytes: &[u8], metadata: &ArchiveMetadata) -> ZipviewResult<()> {
        self.0.write().put(key, bytes, metadata)
    }

    /// See [`ByteStore::get`].
    pub fn get(&self, key: &str) -> ZipviewResult<Option<StoredBlob>> {
        self.0.read().get(key)
    }

    /// See [`ByteStore::clear`].
    pub fn clear(&self) -> ZipviewResult<()> {
        self.0.write().clear()
    }
}
