use relative_path::{Component, RelativePath, RelativePathBuf};
use std::path::{Path, PathBuf};

/* 📖 # Why use RelativePathBuf for FilePath?

Every path handed to the PAL is relative to the PAL's base directory: the static root,
the persisted-archive directory and the optional config file all live below it.
Wrapping RelativePathBuf makes that explicit in the types, and `escapes_base` lets the
static file server reject request paths that would climb out of the served directory.
*/

/// Type-safe wrapper for file paths relative to the PAL base directory.
///
/// # Examples
///
/// ```
/// use zipview_base::FilePath;
///
/// let index = FilePath::from("public").join("index.html");
/// assert_eq!(index.to_string(), "public/index.html");
/// assert_eq!(index.extension(), Some("html"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FilePath(RelativePathBuf);

impl FilePath {
    /// Returns the underlying RelativePathBuf as a reference.
    pub fn as_relative(&self) -> &RelativePath {
        &self.0
    }

    /// Converts to a regular Path for use with std::fs operations.
    /// This returns the relative path portion without a base directory.
    pub fn as_path(&self) -> &Path {
        Path::new(self.as_relative().as_str())
    }

    /// Consumes the FilePath and returns a PathBuf.
    pub fn into_path_buf(self) -> PathBuf {
        PathBuf::from(self.0.as_str())
    }

    /// Append a relative path below this one.
    pub fn join(&self, child: impl AsRef<str>) -> FilePath {
        Self(self.0.join(child.as_ref()))
    }

    /// The final component, if any.
    pub fn file_name(&self) -> Option<&str> {
        self.0.file_name()
    }

    /// The extension of the final component, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.0.extension()
    }

    /// True if resolving the path would leave the base directory.
    pub fn escapes_base(&self) -> bool {
        let mut depth: usize = 0;
        for component in self.0.components() {
            match component {
                Component::CurDir => {}
                Component::ParentDir => {
                    if depth == 0 {
                        return true;
                    }
                    depth -= 1;
                }
                Component::Normal(_) => depth += 1,
            }
        }
        false
    }
}

impl From<&str> for FilePath {
    fn from(s: &str) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<String> for FilePath {
    fn from(s: String) -> Self {
        Self(RelativePathBuf::from(s))
    }
}

impl From<&Path> for FilePath {
    fn from(p: &Path) -> Self {
        Self(RelativePathBuf::from(p.to_string_lossy().into_owned()))
    }
}

impl std::fmt::Display for FilePath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<RelativePath> for FilePath {
    fn as_ref(&self) -> &RelativePath {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_path_from_str() {
        let path = FilePath::from("public/app.js");
        assert_eq!(path.as_path(), Path::new("public/app.js"));
    }

    #[test]
    fn test_file_path_from_pathbuf() {
        let pb = PathBuf::from("data/archive.zip");
        let path = FilePath::from(pb.as_path());
        assert_eq!(path.as_path(), Path::new("data/archive.zip"));
    }

    #[test]
    fn test_join_and_file_name() {
        let path = FilePath::from("public").join("css/style.css");
        assert_eq!(path.to_string(), "public/css/style.css");
        assert_eq!(path.file_name(), Some("style.css"));
        assert_eq!(path.extension(), Some("css"));
    }

    #[test]
    fn test_extension_missing() {
        assert_eq!(FilePath::from("Makefile").extension(), None);
    }

    #[test]
    fn test_escapes_base() {
        assert!(FilePath::from("../secret").escapes_base());
        assert!(FilePath::from("a/../../secret").escapes_base());
        assert!(!FilePath::from("a/../b").escapes_base());
        assert!(!FilePath::from("./index.html").escapes_base());
    }

    #[test]
    fn test_file_path_hash() {
        use std::collections::HashSet;
        let mut set = HashSet::new();
        set.insert(FilePath::from("a.bin"));
        set.insert(FilePath::from("a.json"));
        assert!(set.contains(&FilePath::from("a.bin")));
        assert!(!set.contains(&FilePath::from("b.bin")));
    }
}
