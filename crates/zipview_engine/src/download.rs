use std::io::Write;

use tracing::info;
use zipview_base::error::ErrorKind;
use zipview_base::{FilePath, Pal, ResultExt, ZipviewError, ZipviewResult};

use crate::entry::{ArchiveEntry, LoadedArchive};

const ARCHIVE_CONTENT_TYPE: &str = "application/zip";
const ENTRY_CONTENT_TYPE: &str = "application/octet-stream";

/// Bytes offered to the user for saving, with the name to save them under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Download {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

impl Download {
    /// Save into `directory`, returning the written path.
    pub fn write_to(&self, pal: &dyn Pal, directory: &FilePath) -> ZipviewResult<FilePath> {
        let path = directory.join(&self.file_name);
        pal.create_directory_all(directory)?;
        let mut file = pal.create_file(&path)?;
        file.write_all(&self.bytes)
            .and_then(|()| file.flush())
            .map_err(|e| {
                Box::new(ZipviewError::new(ErrorKind::FileError {
                    path: path.as_path().to_path_buf(),
                    source: e,
                }))
            })
            .with_context(|| format!("saving {}", self.file_name))?;
        info!(path = %path, size = self.bytes.len(), "download saved");
        Ok(path)
    }
}

/// A single member, named after its final path segment. Works for every file kind.
pub fn download_entry(entry: &ArchiveEntry) -> ZipviewResult<Download> {
    let bytes = match (entry.is_directory(), entry.content()) {
        (false, Some(bytes)) => bytes.to_vec(),
        _ => {
            return Err(Box::new(ZipviewError::new(
                ErrorKind::UnsupportedOperation {
                    message: format!("Cannot download directory {}", entry.path()),
                },
            )));
        }
    };
    Ok(Download {
        file_name: entry.name().to_string(),
        content_type: ENTRY_CONTENT_TYPE,
        bytes,
    })
}

/// The whole raw archive under its display name.
pub fn download_archive(archive: &LoadedArchive) -> Download {
    Download {
        file_name: archive.source_name().to_string(),
        content_type: ARCHIVE_CONTENT_TYPE,
        bytes: archive.raw_bytes().to_vec(),
    }
}
