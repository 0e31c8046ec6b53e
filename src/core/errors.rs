use std::fmt;
use thiserror::Error;
use super::types::TaskId;

/// Request of the platform upload protocol a rejection came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadPhase {
    Image,
    Start,
    Transfer,
    Finish,
}

impl fmt::Display for UploadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UploadPhase::Image => "image",
            UploadPhase::Start => "start",
            UploadPhase::Transfer => "transfer",
            UploadPhase::Finish => "finish",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("Upload rejected in {phase} phase, status code {status}: {message}")]
    UploadRejected {
        phase: UploadPhase,
        status: u16,
        message: String,
    },

    #[error("Video transfer failed: {0}")]
    TransferFailed(String),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid url: {0}")]
    Url(#[from] url::ParseError),

    #[error("Task {0} is uploading and cannot be cancelled")]
    InFlight(TaskId),

    #[error("Unsupported queue schema version {found}, this build supports up to {supported}")]
    SchemaVersion {
        found: i64,
        supported: i64,
    },

    #[error("Config error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl QueueError {
    pub fn upload_rejected(phase: UploadPhase, status: u16, message: impl Into<String>) -> Self {
        Self::UploadRejected {
            phase,
            status,
            message: message.into(),
        }
    }

    pub fn transfer_failed(message: impl Into<String>) -> Self {
        Self::TransferFailed(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Whether the platform itself refused the upload, as opposed to a local or transport failure.
    pub fn is_platform_rejection(&self) -> bool {
        matches!(self, QueueError::UploadRejected { .. } | QueueError::TransferFailed(_))
    }
}

/// Error alias
pub type Result<T, E = QueueError> = std::result::Result<T, E>;
