use std::fmt;
use std::str::FromStr;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Queue task identifier, assigned by the store on insert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Deserialize, Serialize)]
pub struct TaskId(pub i64);

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifies one processing pass in logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
pub struct PassId(pub Uuid);

impl PassId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for PassId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PassId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

/// Media kind, decided once at enqueue time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
}

impl MediaKind {
    /// `image/*` is an image, everything else is treated as video.
    pub fn from_content_type(content_type: &str) -> Self {
        if content_type.starts_with("image/") {
            MediaKind::Image
        } else {
            MediaKind::Video
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MediaKind::Image => "image",
            MediaKind::Video => "video",
        }
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for MediaKind {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "image" => Ok(MediaKind::Image),
            "video" => Ok(MediaKind::Video),
            other => Err(UnknownVariant { kind: "media kind", value: other.to_string() }),
        }
    }
}

/// Task status.
///
/// `Pending -> Uploading -> {deleted | Pending | Failed}`. Deletion after a
/// successful upload is the only terminal transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    /// Waiting for the next pass
    Pending,
    /// Claimed by a running pass
    Uploading,
    /// Last attempt failed, waits for an explicit retry
    Failed,
}

impl UploadStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            UploadStatus::Pending => "pending",
            UploadStatus::Uploading => "uploading",
            UploadStatus::Failed => "failed",
        }
    }

    /// Whether a user may cancel a task in this status.
    pub fn is_cancellable(&self) -> bool {
        !matches!(self, UploadStatus::Uploading)
    }
}

impl fmt::Display for UploadStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

impl FromStr for UploadStatus {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(UploadStatus::Pending),
            "uploading" => Ok(UploadStatus::Uploading),
            "failed" => Ok(UploadStatus::Failed),
            other => Err(UnknownVariant { kind: "upload status", value: other.to_string() }),
        }
    }
}

/// A raw file handed over by the UI.
#[derive(Debug, Clone)]
pub struct MediaFile {
    pub name: String,
    pub content_type: String,
    pub bytes: Bytes,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: impl Into<Bytes>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes: bytes.into(),
        }
    }
}

/// A task before the store assigned its id.
#[derive(Debug, Clone)]
pub struct NewUploadTask {
    pub payload: Bytes,
    pub media_kind: MediaKind,
    pub display_name: String,
    pub byte_size: u64,
    pub created_at: DateTime<Utc>,
}

impl NewUploadTask {
    pub fn from_file(file: MediaFile) -> Self {
        Self {
            media_kind: MediaKind::from_content_type(&file.content_type),
            byte_size: file.bytes.len() as u64,
            display_name: file.name,
            payload: file.bytes,
            created_at: Utc::now(),
        }
    }
}

/// One queued media file.
#[derive(Debug, Clone, PartialEq)]
pub struct UploadTask {
    pub id: TaskId,
    pub payload: Bytes,
    pub media_kind: MediaKind,
    pub display_name: String,
    pub byte_size: u64,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
}

/// Payload-free projection of a task, pushed to live subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskView {
    pub id: TaskId,
    pub display_name: String,
    pub media_kind: MediaKind,
    pub byte_size: u64,
    pub status: UploadStatus,
    pub created_at: DateTime<Utc>,
}

impl From<&UploadTask> for TaskView {
    fn from(task: &UploadTask) -> Self {
        Self {
            id: task.id,
            display_name: task.display_name.clone(),
            media_kind: task.media_kind,
            byte_size: task.byte_size,
            status: task.status,
            created_at: task.created_at,
        }
    }
}

/// Outcome of a single-record mutation. A missing id is not an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    Applied,
    NotFound,
}

impl Mutation {
    pub fn is_applied(&self) -> bool {
        matches!(self, Mutation::Applied)
    }
}

/// What the platform handed back for a delivered task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UploadReceipt {
    Image {
        /// Absent when the platform accepted the image without naming a hash
        hash: Option<String>,
    },
    Video {
        upload_session_id: String,
        video_id: Option<String>,
    },
}

/// Status a task falls back to when its upload fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Surface the failure; only an explicit retry picks the task up again
    #[default]
    MarkFailed,
    /// Silently put the task back in line for the next pass
    RevertToPending,
}

impl FailurePolicy {
    pub fn failure_status(&self) -> UploadStatus {
        match self {
            FailurePolicy::MarkFailed => UploadStatus::Failed,
            FailurePolicy::RevertToPending => UploadStatus::Pending,
        }
    }
}

/// Which statuses a pass claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassScope {
    /// Automatic passes: enqueue and reconnection
    Pending,
    /// Explicit publish/retry from the user
    PendingAndFailed,
}

impl PassScope {
    pub fn statuses(&self) -> &'static [UploadStatus] {
        match self {
            PassScope::Pending => &[UploadStatus::Pending],
            PassScope::PendingAndFailed => &[UploadStatus::Pending, UploadStatus::Failed],
        }
    }
}

/// Summary of one processing pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassReport {
    pub pass_id: PassId,
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped_offline: bool,
}

impl PassReport {
    pub fn new(pass_id: PassId) -> Self {
        Self {
            pass_id,
            attempted: 0,
            succeeded: 0,
            failed: 0,
            skipped_offline: false,
        }
    }
}

#[allow(dead_code)]
const _: () = {
    fn assert_send<T: Send + Sync>() {}
    fn assert_types() {
        assert_send::<UploadTask>();
        assert_send::<TaskView>();
        assert_send::<PassReport>();
    }
};
