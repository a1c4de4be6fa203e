/// How an entry is previewed. Downloads are available for every kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileKind {
    Text,
    Image,
    Binary,
}

const TEXT_EXTENSIONS: &[&str] = &[
    "txt", "md", "markdown", "json", "xml", "csv", "html", "htm", "css", "js", "ts", "jsx", "tsx",
    "py", "java", "cpp", "c", "h", "php", "rb", "go", "rs", "sh", "bash", "yml", "yaml", "sql",
    "r", "log", "env", "properties", "gradle", "maven", "dockerfile", "gitignore", "editorconfig",
    "eslintrc", "prettierrc", "babelrc",
];

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "gif", "webp", "svg", "bmp", "ico"];

/// Lower-cased text after the last `.` of the final path segment.
///
/// A dotfile such as `.gitignore` has the extension `gitignore`.
pub fn extension(file_name: &str) -> Option<String> {
    let name = file_name.rsplit('/').next().unwrap_or(file_name);
    name.rsplit_once('.')
        .map(|(_, extension)| extension.to_ascii_lowercase())
}

pub fn is_text_file(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| TEXT_EXTENSIONS.contains(&ext.as_str()))
}

pub fn is_image_file(file_name: &str) -> bool {
    extension(file_name).is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.as_str()))
}

pub fn classify(file_name: &str) -> FileKind {
    if is_text_file(file_name) {
        FileKind::Text
    } else if is_image_file(file_name) {
        FileKind::Image
    } else {
        FileKind::Binary
    }
}

/// MIME type for an image extension, used when wrapping image previews.
pub fn image_mime_type(file_name: &str) -> Option<&'static str> {
    let mime = match extension(file_name)?.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "ico" => "image/x-icon",
        _ => return None,
    };
    Some(mime)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_sets_are_disjoint() {
        for ext in TEXT_EXTENSIONS {
            assert!(!IMAGE_EXTENSIONS.contains(ext), "{ext}");
        }
    }

    #[test]
    fn test_classification_is_total_and_exclusive() {
        let names = [
            "README.md",
            "src/main.RS",
            "logo.PNG",
            "photo.jpeg",
            "archive.tar.gz",
            "Makefile",
            "Dockerfile",
            ".gitignore",
            "icons/app.ico",
            "data.bin",
            "noext.",
            "dir.d/file",
        ];
        for name in names {
            assert!(!(is_text_file(name) && is_image_file(name)), "{name}");
            let expected = if is_text_file(name) {
                FileKind::Text
            } else if is_image_file(name) {
                FileKind::Image
            } else {
                FileKind::Binary
            };
            assert_eq!(classify(name), expected, "{name}");
        }
    }

    #[test]
    fn test_classify_examples() {
        assert_eq!(classify("src/main.RS"), FileKind::Text);
        assert_eq!(classify("logo.PNG"), FileKind::Image);
        assert_eq!(classify("archive.tar.gz"), FileKind::Binary);
        assert_eq!(classify(".gitignore"), FileKind::Text);
    }

    #[test]
    fn test_name_without_dot_is_binary() {
        assert_eq!(extension("Makefile"), None);
        assert_eq!(classify("Makefile"), FileKind::Binary);
        assert_eq!(classify("Dockerfile"), FileKind::Binary);
        assert_eq!(classify("dir.d/file"), FileKind::Binary);
    }

    #[test]
    fn test_image_mime_type() {
        assert_eq!(image_mime_type("a/b.SVG"), Some("image/svg+xml"));
        assert_eq!(image_mime_type("a/b.txt"), None);
    }
}
