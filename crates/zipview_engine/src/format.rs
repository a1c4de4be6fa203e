use url::Url;

const SIZE_UNITS: [&str; 4] = ["Bytes", "KB", "MB", "GB"];

/// Display name used when a URL has no usable final path segment.
pub const DEFAULT_ARCHIVE_NAME: &str = "archive.zip";

/// Human-readable byte count with at most two decimals, e.g. `1.5 KB`.
///
/// Units stop at GB; larger values are shown as a (large) number of GB.
pub fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        return "0 Bytes".to_string();
    }
    let mut unit = 0;
    let mut scale: u64 = 1;
    while unit + 1 < SIZE_UNITS.len() && bytes >= scale * 1024 {
        scale *= 1024;
        unit += 1;
    }
    let value = (bytes as f64 / scale as f64 * 100.0).round() / 100.0;
    format!("{} {}", value, SIZE_UNITS[unit])
}

/// Percentage change from the uncompressed to the compressed size.
///
/// Negative when the archive is smaller than its content. Zero when there is no content.
pub fn compression_ratio(uncompressed: u64, compressed: u64) -> f64 {
    if uncompressed == 0 {
        return 0.0;
    }
    (compressed as f64 / uncompressed as f64 - 1.0) * 100.0
}

/// `compression_ratio` with one decimal, or `0` when there is no content.
pub fn format_compression_ratio(uncompressed: u64, compressed: u64) -> String {
    if uncompressed == 0 {
        return "0".to_string();
    }
    format!("{:.1}", compression_ratio(uncompressed, compressed))
}

/// Final path segment of `url`, falling back to [`DEFAULT_ARCHIVE_NAME`].
pub fn display_name_from_url(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .path_segments()
                .and_then(|mut segments| segments.next_back().map(str::to_string))
        })
        .filter(|segment| !segment.is_empty())
        .unwrap_or_else(|| DEFAULT_ARCHIVE_NAME.to_string())
}
