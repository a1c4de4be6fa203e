pub mod api;
pub mod classify;
pub mod config;
pub mod download;
pub mod entry;
pub mod format;
pub mod loader;
mod loader_tests;
pub mod notice;
pub mod preview;
pub mod proxy;
pub mod store;
#[cfg(test)]
mod test_support;
pub mod tree;
pub mod tree_view;

pub use api::{StaticFiles, ZipViewService};
pub use classify::{FileKind, classify, is_image_file, is_text_file};
pub use config::{ProxyConfig, ServerConfig, load_config, load_config_from_environment};
pub use download::{Download, download_archive, download_entry};
pub use entry::{ArchiveEntry, ArchiveSummary, EntrySplit, LoadedArchive, split_entries};
pub use format::{compression_ratio, display_name_from_url, format_compression_ratio, format_size};
pub use loader::{ArchiveLoader, decode_archive, initial_url_from_query};
pub use notice::{Notice, NoticeBoard, NoticeChannel};
pub use preview::{
    ImageResource, Preview, PreviewContent, PreviewPane, ResourceRegistry, TextPreview,
    render_preview, text_for_clipboard,
};
pub use proxy::{FetchState, ProxiedResponse, fetch_with_redirects};
pub use store::{
    ArchiveMetadata, ByteStore, InMemoryByteStore, PalByteStore, StoreHandle, TieredByteStore,
};
pub use tree::{DirectoryTreeNode, build_tree};
pub use tree_view::{TreeRow, TreeView};
