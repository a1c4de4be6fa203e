use std::error::Error as StdError;
use std::fmt;
use std::path::PathBuf;

use tracing_error::{SpanTrace, SpanTraceStatus};

/* 📖 # Why a custom error type and not use anyhow/eyre/thiserror etc?

- Better control over error handling
- No dependencies to compile and integrate
- More transparency into error handling logic
- The variants mirror the failure categories a user actually sees (bad input, broken
  archive, unreachable upstream, ...), so the presentation layer can match on them
 */

/// Error variants that can occur in zipview operations.
/// Each variant represents a specific error category with its associated context.
#[derive(Debug)]
pub enum ErrorKind {
    /// File system operation failed
    FileError {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Bad user input: wrong file extension, empty or malformed URL, ...
    Validation { message: String },

    /// The ZIP codec rejected the bytes
    Decode { message: String },

    /// Network failure or non-success status while fetching through the proxy.
    /// `status` is absent when no HTTP response was received at all.
    Fetch { status: Option<u16>, message: String },

    /// The proxied target answered with a terminal non-2xx status
    Upstream { status: u16 },

    /// The redirect chain exceeded the configured maximum
    TooManyRedirects { max: usize },

    /// The upstream violated HTTP expectations (e.g. redirect without Location)
    Protocol { message: String },

    /// The requested action is not possible for this entry (e.g. copying a binary file)
    UnsupportedOperation { message: String },

    /// A request to the server was missing required input
    BadRequest { message: String },

    /// Catch-all for other errors with a message
    Message { message: String },
}

impl ErrorKind {
    /// True for the error family that stems from fetching a remote archive.
    pub fn is_fetch_failure(&self) -> bool {
        matches!(
            self,
            ErrorKind::Fetch { .. }
                | ErrorKind::Upstream { .. }
                | ErrorKind::TooManyRedirects { .. }
                | ErrorKind::Protocol { .. }
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorKind::FileError { path, source } => {
                write!(f, "File error at {}: {}", path.display(), source)
            }
            ErrorKind::Validation { message } => write!(f, "{}", message),
            ErrorKind::Decode { message } => write!(f, "Invalid ZIP archive: {}", message),
            ErrorKind::Fetch {
                status: Some(status),
                message,
            } => write!(f, "HTTP {}: {}", status, message),
            ErrorKind::Fetch {
                status: None,
                message,
            } => write!(f, "{}", message),
            ErrorKind::Upstream { status } => write!(f, "HTTP {}", status),
            ErrorKind::TooManyRedirects { max } => {
                write!(f, "Too many redirects (more than {})", max)
            }
            ErrorKind::Protocol { message } => write!(f, "{}", message),
            ErrorKind::UnsupportedOperation { message } => write!(f, "{}", message),
            ErrorKind::BadRequest { message } => write!(f, "{}", message),
            ErrorKind::Message { message } => write!(f, "{}", message),
        }
    }
}

/* 📖 # Why separate ErrorKind and ZipviewError?
This two-layer design provides a clear separation of concerns:
- ErrorKind: structural variants with specific contexts (file paths, status codes, etc.)
- ZipviewError: wraps ErrorKind with context strings, an optional cause and a span trace

Users pattern match on ErrorKind, while ZipviewError carries everything needed to
diagnose where the error came from.
*/

/// Comprehensive error type wrapping ErrorKind with optional context.
pub struct ZipviewError {
    kind: ErrorKind,
    context: Vec<String>,
    cause: Option<Box<ZipviewError>>,
    span_trace: SpanTrace,
}

impl ZipviewError {
    /// Creates a new error from an ErrorKind, capturing the current span trace.
    pub fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            context: vec![],
            cause: None,
            span_trace: SpanTrace::capture(),
        }
    }

    /// Creates a `Message` error.
    pub fn message(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Message {
            message: message.into(),
        })
    }

    /// Attaches context to an error.
    pub fn context(mut self, context: impl Into<String>) -> Self {
        self.context.push(context.into());
        self
    }

    /// Attaches context using lazy evaluation.
    pub fn with_context<F>(mut self, f: F) -> Self
    where
        F: FnOnce() -> String,
    {
        self.context.push(f());
        self
    }

    /// Records the error that caused this one.
    pub fn caused_by(mut self, cause: impl Into<Box<ZipviewError>>) -> Self {
        self.cause = Some(cause.into());
        self
    }

    /// Returns a reference to the underlying ErrorKind.
    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    /// Returns the attached context strings, oldest first.
    pub fn get_context(&self) -> &[String] {
        &self.context
    }

    /// Returns the error that caused this one, if recorded.
    pub fn cause(&self) -> Option<&ZipviewError> {
        self.cause.as_deref()
    }

    /// Returns the span trace captured when the error was created.
    pub fn span_trace(&self) -> &SpanTrace {
        &self.span_trace
    }

    /// Returns the innermost error in the chain.
    pub fn root_cause(&self) -> &(dyn StdError + 'static) {
        let mut current: &(dyn StdError + 'static) = self;
        while let Some(next) = current.source() {
            current = next;
        }
        current
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: &str) -> fmt::Result {
        writeln!(f, "{}", self.kind)?;
        let lines = self.context.len() + usize::from(self.cause.is_some());
        for (i, ctx) in self.context.iter().enumerate() {
            let branch = if i + 1 == lines { "└─" } else { "├─" };
            writeln!(f, "{}{} {}", indent, branch, ctx)?;
        }
        if let Some(cause) = &self.cause {
            write!(f, "{}└─ cause: ", indent)?;
            cause.fmt_tree(f, &format!("{}   ", indent))?;
        }
        Ok(())
    }
}

impl From<ErrorKind> for ZipviewError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind)
    }
}

impl From<ErrorKind> for Box<ZipviewError> {
    fn from(kind: ErrorKind) -> Self {
        Box::new(ZipviewError::new(kind))
    }
}

impl StdError for ZipviewError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        match &self.kind {
            ErrorKind::FileError { source, .. } => Some(source),
            _ => self.cause.as_deref().map(|c| c as &(dyn StdError + 'static)),
        }
    }
}

impl fmt::Display for ZipviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for ctx in &self.context {
            write!(f, "{}: ", ctx)?;
        }
        write!(f, "{}", self.kind)
    }
}

/* 📖 # Why a hand-written Debug impl?
`{:?}` is what ends up in logs and test failures. A tree with the message first, then the
context chain and causes, followed by the span trace, is far easier to read than the derived
struct dump.
*/
impl fmt::Debug for ZipviewError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, "")?;
        if self.span_trace.status() == SpanTraceStatus::CAPTURED {
            writeln!(f, "Trace:{}", self.span_trace)?;
        }
        Ok(())
    }
}

/* 📖 # Why use Box<ZipviewError> in the result type?

Boxing the error reduces the size of the result type, making it more efficient to return in the common case.

*/

/// Standard result type for zipview operations.
pub type ZipviewResult<T> = std::result::Result<T, Box<ZipviewError>>;

/// Extension trait for attaching context to Results.
pub trait ResultExt<T> {
    /// Attaches context to an error, consuming and re-wrapping it.
    fn context(self, context: impl Into<String>) -> ZipviewResult<T>;

    /// Attaches context using lazy evaluation.
    /// Context is only evaluated if the result is an error.
    fn with_context<F>(self, f: F) -> ZipviewResult<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for ZipviewResult<T> {
    fn context(self, context: impl Into<String>) -> ZipviewResult<T> {
        self.map_err(|err| Box::new(err.context(context)))
    }

    fn with_context<F>(self, f: F) -> ZipviewResult<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|err| Box::new(err.with_context(f)))
    }
}

/// Creates a boxed `Message` error from a format string.
#[macro_export]
macro_rules! err {
    ($($arg:tt)*) => {
        Box::new($crate::ZipviewError::message(format!($($arg)*)))
    };
}

/// Returns early with a boxed `Message` error.
#[macro_export]
macro_rules! bail {
    ($($arg:tt)*) => {
        return Err($crate::err!($($arg)*))
    };
}
