use std::fmt;
use tokio::sync::broadcast;
use tracing::info;
use super::types::{PassReport, TaskId};

/// How the UI should present a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// User-facing messages emitted by the queue (toasts, in a browser UI).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Notice {
    /// A pass was requested while offline and did nothing
    Offline,
    /// Connectivity came back, a pass is starting
    Reconnected,
    /// A file was stored while offline
    QueuedOffline {
        name: String,
    },
    Uploaded {
        id: TaskId,
        name: String,
    },
    UploadFailed {
        id: TaskId,
        name: String,
        error: String,
    },
    PublishStarted,
    PublishCompleted {
        report: PassReport,
    },
    PublishFailed {
        error: String,
    },
}

impl Notice {
    pub fn level(&self) -> NoticeLevel {
        match self {
            Notice::Offline | Notice::Reconnected | Notice::QueuedOffline { .. } | Notice::PublishStarted => {
                NoticeLevel::Info
            }
            Notice::Uploaded { .. } | Notice::PublishCompleted { .. } => NoticeLevel::Success,
            Notice::UploadFailed { .. } | Notice::PublishFailed { .. } => NoticeLevel::Error,
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Notice::Offline => write!(f, "Offline: uploads stay queued until the connection returns"),
            Notice::Reconnected => write!(f, "Back online, resuming queued uploads"),
            Notice::QueuedOffline { name } => write!(f, "Offline: \"{}\" was queued for later upload", name),
            Notice::Uploaded { name, .. } => write!(f, "Upload of \"{}\" completed", name),
            Notice::UploadFailed { name, .. } => write!(f, "Upload of \"{}\" failed", name),
            Notice::PublishStarted => write!(f, "Publishing queued changes"),
            Notice::PublishCompleted { report } if report.skipped_offline => {
                write!(f, "Nothing published while offline")
            }
            Notice::PublishCompleted { report } => write!(
                f,
                "Published {} of {} queued uploads",
                report.succeeded, report.attempted
            ),
            Notice::PublishFailed { .. } => write!(f, "Publishing queued changes failed"),
        }
    }
}

/// Broadcasts notices to whoever renders them. Sending with nobody listening is fine.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    pub fn emit(&self, notice: Notice) {
        info!(level = ?notice.level(), "{}", notice);
        let _ = self.tx.send(notice);
    }
}

impl Default for Notifier {
    fn default() -> Self {
        // keeps at most 256 notices buffered
        Self::new(256)
    }
}
