use std::io::Write;

use tracing::{debug, instrument};
use zipview_base::error::ErrorKind;
use zipview_base::{FilePath, PalHandle, ResultExt, ZipviewError, ZipviewResult};

use crate::store::traits::{ArchiveMetadata, ByteStore, StoredBlob};

/// A byte store that writes through the PAL: `<key>.bin` holds the bytes and
/// `<key>.json` the metadata, both inside one directory.
#[derive(Debug)]
pub struct PalByteStore {
    pal: PalHandle,
    directory: FilePath,
}

impl PalByteStore {
    pub fn new(pal: PalHandle, directory: FilePath) -> Self {
        Self { pal, directory }
    }

    fn paths(&self, key: &str) -> ZipviewResult<(FilePath, FilePath)> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
        if !valid {
            return Err(Box::new(ZipviewError::new(ErrorKind::Validation {
                message: format!("Invalid store key: {:?}", key),
            })));
        }
        Ok((
            self.directory.join(format!("{}.bin", key)),
            self.directory.join(format!("{}.json", key)),
        ))
    }

    fn write_file(&self, path: &FilePath, content: &[u8]) -> ZipviewResult<()> {
        let mut writer = self.pal.create_file(path)?;
        writer
            .write_all(content)
            .and_then(|()| writer.flush())
            .map_err(|e| {
                Box::new(ZipviewError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: e,
                }))
            })
    }
}

impl ByteStore for PalByteStore {
    #[instrument(skip(self, bytes, metadata), fields(directory = %self.directory, size = bytes.len()))]
    fn put(&mut self, key: &str, bytes: &[u8], metadata: &ArchiveMetadata) -> ZipviewResult<()> {
        let (bin_path, json_path) = self.paths(key)?;
        self.pal.create_directory_all(&self.directory)?;
        let json = serde_json::to_vec(metadata)
            .map_err(|e| zipview_base::err!("Failed to serialize archive metadata: {}", e))?;
        // Without its sidecar the pair reads as absent, so an interrupted write is never read back
        self.pal.remove_file(&json_path)?;
        self.write_file(&bin_path, bytes)
            .context("writing archive bytes")?;
        self.write_file(&json_path, &json)
            .context("writing archive metadata")?;
        debug!("stored archive");
        Ok(())
    }

    #[instrument(skip(self), fields(directory = %self.directory))]
    fn get(&self, key: &str) -> ZipviewResult<Option<StoredBlob>> {
        let (bin_path, json_path) = self.paths(key)?;
        if !self.pal.file_exists(&json_path)? || !self.pal.file_exists(&bin_path)? {
            debug!("nothing stored");
            return Ok(None);
        }
        let json = self.pal.read_file_to_bytes(&json_path)?;
        let metadata: ArchiveMetadata = serde_json::from_slice(&json)
            .map_err(|e| zipview_base::err!("Corrupt archive metadata in {}: {}", json_path, e))?;
        let bytes = self.pal.read_file_to_bytes(&bin_path)?;
        Ok(Some(StoredBlob { bytes, metadata }))
    }

    #[instrument(skip(self), fields(directory = %self.directory))]
    fn clear(&mut self) -> ZipviewResult<()> {
        self.pal.remove_directory_all(&self.directory)
    }
}
