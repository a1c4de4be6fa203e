/* 📖 # Why are entries immutable?

A load produces a fresh `LoadedArchive` that replaces the previous one as a whole. Nothing
ever edits an entry in place, so the archive is shared as `Arc<LoadedArchive>` between the
loader, the tree view and the preview pane without any locking.
*/

use crate::format::{format_compression_ratio, format_size};

/// One member of a decoded archive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveEntry {
    path: String,
    size: u64,
    content: Option<Vec<u8>>,
    is_directory: bool,
}

impl ArchiveEntry {
    /// A regular file with its decoded content.
    pub fn file(path: impl Into<String>, size: u64, content: Vec<u8>) -> Self {
        Self {
            path: path.into(),
            size,
            content: Some(content),
            is_directory: false,
        }
    }

    /// A directory marker. Directories have no content and a size of 0.
    pub fn directory(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            size: 0,
            content: None,
            is_directory: true,
        }
    }

    /// Archive-relative, slash-separated path.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Uncompressed size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Decoded content; `None` for directories.
    pub fn content(&self) -> Option<&[u8]> {
        self.content.as_deref()
    }

    pub fn is_directory(&self) -> bool {
        self.is_directory
    }

    /// The last non-empty path segment, or the whole path if there is none.
    pub fn name(&self) -> &str {
        self.path
            .split('/')
            .rfind(|segment| !segment.is_empty())
            .unwrap_or(&self.path)
    }
}

/// The archive currently shown, created atomically when a load completes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoadedArchive {
    source_name: String,
    source_url: Option<String>,
    raw_bytes: Vec<u8>,
    entries: Vec<ArchiveEntry>,
}

impl LoadedArchive {
    pub fn new(
        source_name: impl Into<String>,
        source_url: Option<String>,
        raw_bytes: Vec<u8>,
        entries: Vec<ArchiveEntry>,
    ) -> Self {
        Self {
            source_name: source_name.into(),
            source_url,
            raw_bytes,
            entries,
        }
    }

    /// Display filename.
    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Present only when the archive was loaded from a remote URL.
    pub fn source_url(&self) -> Option<&str> {
        self.source_url.as_deref()
    }

    /// The original compressed bytes.
    pub fn raw_bytes(&self) -> &[u8] {
        &self.raw_bytes
    }

    /// Entries in archive order.
    pub fn entries(&self) -> &[ArchiveEntry] {
        &self.entries
    }

    /// Look up an entry by its exact path.
    pub fn entry(&self, path: &str) -> Option<&ArchiveEntry> {
        self.entries.iter().find(|entry| entry.path == path)
    }

    pub fn summary(&self) -> ArchiveSummary {
        let split = split_entries(&self.entries);
        let total_size = split.files.iter().map(|entry| entry.size).sum();
        ArchiveSummary {
            file_count: split.files.len(),
            directory_count: split.directories.len(),
            total_size,
            compressed_size: self.raw_bytes.len() as u64,
        }
    }
}

/// Entries partitioned into files and directories, preserving order.
#[derive(Debug)]
pub struct EntrySplit<'a> {
    pub files: Vec<&'a ArchiveEntry>,
    pub directories: Vec<&'a ArchiveEntry>,
}

impl EntrySplit<'_> {
    pub fn total(&self) -> usize {
        self.files.len() + self.directories.len()
    }
}

pub fn split_entries(entries: &[ArchiveEntry]) -> EntrySplit<'_> {
    let (directories, files): (Vec<_>, Vec<_>) =
        entries.iter().partition(|entry| entry.is_directory);
    EntrySplit { files, directories }
}

/// Counts and sizes shown above the tree.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArchiveSummary {
    pub file_count: usize,
    pub directory_count: usize,
    /// Sum of uncompressed file sizes.
    pub total_size: u64,
    /// Length of the raw archive.
    pub compressed_size: u64,
}

impl ArchiveSummary {
    pub fn formatted_total_size(&self) -> String {
        format_size(self.total_size)
    }

    pub fn formatted_compressed_size(&self) -> String {
        format_size(self.compressed_size)
    }

    /// Relative size change from uncompressed to compressed, e.g. `-50.0`.
    pub fn formatted_compression_ratio(&self) -> String {
        format_compression_ratio(self.total_size, self.compressed_size)
    }
}
