use std::time::{Duration, Instant};

use zipview_base::ZipviewError;

/// How long an error banner stays visible.
pub const ERROR_DISMISS_AFTER: Duration = Duration::from_millis(5000);
/// How long a success banner stays visible.
pub const SUCCESS_DISMISS_AFTER: Duration = Duration::from_millis(3000);

const LOCAL_FILE_HINT: &str = "You can download the archive and open it as a local file instead.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeChannel {
    Error,
    Success,
}

impl NoticeChannel {
    pub fn dismiss_after(self) -> Duration {
        match self {
            NoticeChannel::Error => ERROR_DISMISS_AFTER,
            NoticeChannel::Success => SUCCESS_DISMISS_AFTER,
        }
    }
}

/// A transient banner message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    channel: NoticeChannel,
    message: String,
    shown_at: Instant,
}

impl Notice {
    pub fn error(message: impl Into<String>) -> Self {
        Self::new(NoticeChannel::Error, message.into())
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(NoticeChannel::Success, message.into())
    }

    /// Error banner for a failed operation. Fetch failures suggest using a local file.
    pub fn from_error(error: &ZipviewError) -> Self {
        let message = if error.kind().is_fetch_failure() {
            format!("{} {}", error, LOCAL_FILE_HINT)
        } else {
            error.to_string()
        };
        Self::error(message)
    }

    fn new(channel: NoticeChannel, message: String) -> Self {
        Self {
            channel,
            message,
            shown_at: Instant::now(),
        }
    }

    pub fn channel(&self) -> NoticeChannel {
        self.channel
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_visible_at(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.shown_at) < self.channel.dismiss_after()
    }
}

/// The two banner slots. A new notice replaces the previous one on the same channel.
#[derive(Debug, Clone, Default)]
pub struct NoticeBoard {
    error: Option<Notice>,
    success: Option<Notice>,
}

impl NoticeBoard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn show(&mut self, notice: Notice) {
        match notice.channel {
            NoticeChannel::Error => self.error = Some(notice),
            NoticeChannel::Success => self.success = Some(notice),
        }
    }

    /// Notices still visible at `now`, error first.
    pub fn visible_at(&self, now: Instant) -> Vec<&Notice> {
        [&self.error, &self.success]
            .into_iter()
            .flatten()
            .filter(|notice| notice.is_visible_at(now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zipview_base::ErrorKind;

    #[test]
    fn test_error_and_success_lifetimes() {
        let error = Notice::error("Please select a valid ZIP file");
        let success = Notice::success("Archive loaded");

        assert!(error.is_visible_at(error.shown_at + Duration::from_millis(4999)));
        assert!(!error.is_visible_at(error.shown_at + Duration::from_millis(5000)));
        assert!(success.is_visible_at(success.shown_at + Duration::from_millis(2999)));
        assert!(!success.is_visible_at(success.shown_at + Duration::from_millis(3000)));
    }

    #[test]
    fn test_fetch_failures_suggest_local_file() {
        let error = ZipviewError::new(ErrorKind::Fetch {
            status: Some(404),
            message: "Not Found".to_string(),
        });
        let notice = Notice::from_error(&error);
        assert_eq!(notice.channel(), NoticeChannel::Error);
        assert_eq!(
            notice.message(),
            "HTTP 404: Not Found You can download the archive and open it as a local file instead."
        );
    }

    #[test]
    fn test_validation_errors_are_shown_verbatim() {
        let error = ZipviewError::new(ErrorKind::Validation {
            message: "Please enter a URL".to_string(),
        });
        assert_eq!(Notice::from_error(&error).message(), "Please enter a URL");
    }

    #[test]
    fn test_board_replaces_per_channel() {
        let mut board = NoticeBoard::new();
        board.show(Notice::error("first"));
        board.show(Notice::error("second"));
        board.show(Notice::success("done"));
        let now = Instant::now();
        let visible: Vec<&str> = board.visible_at(now).iter().map(|n| n.message()).collect();
        assert_eq!(visible, vec!["second", "done"]);
        assert!(board.visible_at(now + Duration::from_secs(6)).is_empty());
    }
}
