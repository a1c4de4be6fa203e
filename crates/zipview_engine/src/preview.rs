/* 📖 # Why do image previews hold a registry token?

An image preview wraps the entry's bytes in a displayable resource. Showing one preview after
another must not pile those resources up, so each `ImageResource` is registered with a
`ResourceRegistry` on creation and unregistered when dropped. The pane owns at most one
preview, so replacing it or dropping the pane releases the previous resource, and tests can
watch `live_count()` to prove it.
*/

use std::collections::HashSet;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use syntect::highlighting::{Theme, ThemeSet};
use syntect::parsing::SyntaxSet;
use tracing::{debug, warn};
use zipview_base::error::ErrorKind;
use zipview_base::{ZipviewError, ZipviewResult};

use crate::classify::{FileKind, classify, extension, image_mime_type};
use crate::entry::ArchiveEntry;

/// Maximum number of characters rendered for a text preview.
pub const TEXT_PREVIEW_CHAR_LIMIT: usize = 50_000;

/// Appended to text previews that were cut at the limit.
pub const TRUNCATION_MARKER: &str = "\n\n[...truncated...]";

/// Shown instead of text content that is not valid UTF-8.
pub const UNDECODABLE_TEXT_PLACEHOLDER: &str = "[Unable to decode as text]";

/// Shown for entries that are neither text nor image.
pub const BINARY_PLACEHOLDER: &str = "[Binary file - preview not available]";

const HIGHLIGHT_THEME: &str = "InspiredGitHub";

/// Tracks which image resources are currently alive.
#[derive(Debug, Clone, Default)]
pub struct ResourceRegistry {
    inner: Arc<Mutex<RegistryState>>,
}

#[derive(Debug, Default)]
struct RegistryState {
    next_id: u64,
    live: HashSet<u64>,
}

impl ResourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of resources created and not yet released.
    pub fn live_count(&self) -> usize {
        self.inner.lock().live.len()
    }

    fn register(&self) -> u64 {
        let mut state = self.inner.lock();
        state.next_id += 1;
        let id = state.next_id;
        state.live.insert(id);
        id
    }

    fn release(&self, id: u64) {
        self.inner.lock().live.remove(&id);
    }
}

/// An image ready for display. Released from its registry on drop.
#[derive(Debug)]
pub struct ImageResource {
    id: u64,
    mime_type: &'static str,
    bytes: Arc<[u8]>,
    registry: ResourceRegistry,
}

impl ImageResource {
    fn new(registry: &ResourceRegistry, mime_type: &'static str, bytes: &[u8]) -> Self {
        Self {
            id: registry.register(),
            mime_type,
            bytes: Arc::from(bytes),
            registry: registry.clone(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn mime_type(&self) -> &'static str {
        self.mime_type
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

impl Drop for ImageResource {
    fn drop(&mut self) {
        self.registry.release(self.id);
    }
}

/// Decoded text of an entry, optionally with syntax highlighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextPreview {
    /// The text to display, capped and possibly ending in the truncation marker.
    pub text: String,
    pub truncated: bool,
    /// Highlighted HTML, present when a syntax is known for the extension.
    pub highlighted_html: Option<String>,
}

/// What the preview pane shows for an entry.
#[derive(Debug)]
pub enum PreviewContent {
    Text(TextPreview),
    Image(ImageResource),
    /// Fixed placeholder message; the bytes are not decoded.
    Binary(&'static str),
}

/// A rendered preview of one entry.
#[derive(Debug)]
pub struct Preview {
    path: String,
    content: PreviewContent,
}

impl Preview {
    /// Path of the previewed entry, shown as the preview header.
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn content(&self) -> &PreviewContent {
        &self.content
    }
}

/// Holds the preview currently on screen.
#[derive(Debug, Default)]
pub struct PreviewPane {
    registry: ResourceRegistry,
    current: Option<Preview>,
}

impl PreviewPane {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn registry(&self) -> &ResourceRegistry {
        &self.registry
    }

    pub fn current(&self) -> Option<&Preview> {
        self.current.as_ref()
    }

    /// Render `entry` and make it the current preview, releasing the previous one.
    pub fn show(&mut self, entry: &ArchiveEntry) -> ZipviewResult<&Preview> {
        let preview = render_preview(entry, &self.registry)?;
        // Drop the old preview first so its resource is gone before the new one is shown
        self.current = None;
        Ok(self.current.insert(preview))
    }

    /// Tear down the current preview.
    pub fn clear(&mut self) {
        self.current = None;
    }
}

fn unsupported(message: impl Into<String>) -> Box<ZipviewError> {
    Box::new(ZipviewError::new(ErrorKind::UnsupportedOperation {
        message: message.into(),
    }))
}

/// Build the preview for an entry according to its file kind.
pub fn render_preview(entry: &ArchiveEntry, registry: &ResourceRegistry) -> ZipviewResult<Preview> {
    if entry.is_directory() {
        return Err(unsupported(format!(
            "Cannot preview directory {}",
            entry.path()
        )));
    }
    let content = match (classify(entry.path()), entry.content()) {
        (FileKind::Text, Some(bytes)) => PreviewContent::Text(text_preview(entry.path(), bytes)),
        (FileKind::Image, Some(bytes)) => {
            let mime_type = image_mime_type(entry.path()).unwrap_or("application/octet-stream");
            PreviewContent::Image(ImageResource::new(registry, mime_type, bytes))
        }
        _ => PreviewContent::Binary(BINARY_PLACEHOLDER),
    };
    debug!(path = entry.path(), "rendered preview");
    Ok(Preview {
        path: entry.path().to_string(),
        content,
    })
}

/// Decode, cap and highlight text content.
pub fn text_preview(path: &str, bytes: &[u8]) -> TextPreview {
    let Ok(text) = std::str::from_utf8(bytes) else {
        return TextPreview {
            text: UNDECODABLE_TEXT_PLACEHOLDER.to_string(),
            truncated: false,
            highlighted_html: None,
        };
    };
    let (shown, truncated) = truncate_chars(text, TEXT_PREVIEW_CHAR_LIMIT);
    let highlighted_html = extension(path).and_then(|ext| highlight(shown, &ext));
    let mut text = shown.to_string();
    if truncated {
        text.push_str(TRUNCATION_MARKER);
    }
    TextPreview {
        text,
        truncated,
        highlighted_html,
    }
}

/// The first `limit` characters of `text`, and whether anything was cut.
fn truncate_chars(text: &str, limit: usize) -> (&str, bool) {
    match text.char_indices().nth(limit) {
        Some((byte_index, _)) => (&text[..byte_index], true),
        None => (text, false),
    }
}

fn syntax_set() -> &'static SyntaxSet {
    static SYNTAX_SET: OnceLock<SyntaxSet> = OnceLock::new();
    SYNTAX_SET.get_or_init(SyntaxSet::load_defaults_newlines)
}

fn theme() -> Option<&'static Theme> {
    static THEMES: OnceLock<ThemeSet> = OnceLock::new();
    THEMES
        .get_or_init(ThemeSet::load_defaults)
        .themes
        .get(HIGHLIGHT_THEME)
}

fn highlight(text: &str, extension: &str) -> Option<String> {
    let syntax_set = syntax_set();
    let syntax = syntax_set.find_syntax_by_extension(extension)?;
    if syntax.name == "Plain Text" {
        return None;
    }
    match syntect::html::highlighted_html_for_string(text, syntax_set, syntax, theme()?) {
        Ok(html) => Some(html),
        Err(e) => {
            warn!(extension, error = %e, "syntax highlighting failed");
            None
        }
    }
}

/// The full decoded text of an entry, for copying to the clipboard.
///
/// Only text entries with content can be copied; the text is not capped.
pub fn text_for_clipboard(entry: &ArchiveEntry) -> ZipviewResult<String> {
    if classify(entry.path()) != FileKind::Text {
        return Err(unsupported(format!(
            "Only text files can be copied: {}",
            entry.name()
        )));
    }
    let bytes = entry
        .content()
        .ok_or_else(|| unsupported(format!("No content available for {}", entry.name())))?;
    String::from_utf8(bytes.to_vec()).map_err(|_| unsupported(UNDECODABLE_TEXT_PLACEHOLDER))
}
