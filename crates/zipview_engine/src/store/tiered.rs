use tracing::debug;
use zipview_base::ZipviewResult;

use crate::store::traits::{ArchiveMetadata, ByteStore, StoredBlob};

/// Archives at or above this size go to the large tier.
pub const LARGE_TIER_THRESHOLD: usize = 4 * 1024 * 1024;

/// Routes values by size between a small and a large store.
///
/// Only one tier ever holds a given archive: a `put` clears the other tier.
#[derive(Debug)]
pub struct TieredByteStore<S, L> {
    small: S,
    large: L,
    threshold: usize,
}

impl<S: ByteStore, L: ByteStore> TieredByteStore<S, L> {
    pub fn new(small: S, large: L) -> Self {
        Self::with_threshold(small, large, LARGE_TIER_THRESHOLD)
    }

    pub fn with_threshold(small: S, large: L, threshold: usize) -> Self {
        Self {
            small,
            large,
            threshold,
        }
    }
}

impl<S: ByteStore, L: ByteStore> ByteStore for TieredByteStore<S, L> {
    fn put(&mut self, key: &str, bytes: &[u8], metadata: &ArchiveMetadata) -> ZipviewResult<()> {
        if bytes.len() >= self.threshold {
            debug!(size = bytes.len(), "storing archive in large tier");
            self.small.clear()?;
            self.large.put(key, bytes, metadata)
        } else {
            debug!(size = bytes.len(), "storing archive in small tier");
            self.large.clear()?;
            self.small.put(key, bytes, metadata)
        }
    }

    fn get(&self, key: &str) -> ZipviewResult<Option<StoredBlob>> {
        match self.small.get(key)? {
            Some(blob) => Ok(Some(blob)),
            None => self.large.get(key),
        }
    }

    fn clear(&mut self) -> ZipviewResult<()> {
        self.small.clear()?;
        self.large.clear()
    }
}
