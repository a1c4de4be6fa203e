use std::collections::HashMap;

use zipview_base::ZipviewResult;

use crate::store::traits::{ArchiveMetadata, ByteStore, StoredBlob};

/// A byte store backed by a HashMap. Used as the small tier and in tests.
#[derive(Debug, Default)]
pub struct InMemoryByteStore {
    blobs: HashMap<String, StoredBlob>,
}

impl InMemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blobs.is_empty()
    }
}

impl ByteStore for InMemoryByteStore {
    fn put(&mut self, key: &str, bytes: &[u8], metadata: &ArchiveMetadata) -> ZipviewResult<()> {
        self.blobs.insert(
            key.to_string(),
            StoredBlob {
                bytes: bytes.to_vec(),
                metadata: metadata.clone(),
            },
        );
        Ok(())
    }

    fn get(&self, key: &str) -> ZipviewResult<Option<StoredBlob>> {
        Ok(self.blobs.get(key).cloned())
    }

    fn clear(&mut self) -> ZipviewResult<()> {
        self.blobs.clear();
        Ok(())
    }
}
