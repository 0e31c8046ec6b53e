use std::sync::Arc;
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE};
use serde_json::{json, Value};
use tracing::{debug, info};
use url::Url;
use crate::core::{QueueError, Result, UploadPhase, UploadReceipt, UploadTask};
use super::platform::{decode, ensure_accepted, graph_error, id_field, PlatformClient};

/// Session opened by the start phase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoSession {
    pub upload_session_id: String,
    pub upload_url: Url,
    pub video_id: Option<String>,
}

/// Video upload: start, transfer and finish, strictly in that order.
pub struct VideoUploader {
    platform: Arc<PlatformClient>,
}

impl VideoUploader {
    pub fn new(platform: Arc<PlatformClient>) -> Self {
        Self { platform }
    }

    pub async fn upload(&self, task: &UploadTask) -> Result<UploadReceipt> {
        let session = self.start(task).await?;
        self.transfer(task, &session).await?;
        let finished_id = self.finish(task, &session).await?;

        info!(task_id = %task.id, session = %session.upload_session_id, "video upload finished");

        Ok(UploadReceipt::Video {
            upload_session_id: session.upload_session_id,
            video_id: session.video_id.or(finished_id),
        })
    }

    async fn start(&self, task: &UploadTask) -> Result<VideoSession> {
        let url = self.platform.endpoint("advideos")?;
        debug!(task_id = %task.id, phase = %UploadPhase::Start, size = task.byte_size, "opening upload session");

        let response = self
            .platform
            .client()
            .post(url)
            .json(&json!({
                "upload_phase": "start",
                "access_token": self.platform.access_token(),
                "file_size": task.byte_size,
            }))
            .send()
            .await?;

        let (status, body) = decode(response).await?;
        ensure_accepted(UploadPhase::Start, status, &body)?;

        let missing = |field: &str| {
            QueueError::upload_rejected(UploadPhase::Start, status.as_u16(), format!("response missing {}", field))
        };
        let upload_session_id = id_field(&body, "upload_session_id").ok_or_else(|| missing("upload_session_id"))?;
        let upload_url = body
            .get("upload_url")
            .and_then(Value::as_str)
            .ok_or_else(|| missing("upload_url"))?;

        Ok(VideoSession {
            upload_session_id,
            upload_url: Url::parse(upload_url)?,
            video_id: id_field(&body, "video_id"),
        })
    }

    async fn transfer(&self, task: &UploadTask, session: &VideoSession) -> Result<()> {
        if task.payload.len() as u64 != task.byte_size {
            return Err(QueueError::transfer_failed(format!(
                "payload is {} bytes but the session was opened for {}",
                task.payload.len(),
                task.byte_size
            )));
        }

        debug!(task_id = %task.id, phase = %UploadPhase::Transfer, url = %session.upload_url, "sending video bytes");

        let response = self
            .platform
            .client()
            .post(session.upload_url.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .header(CONTENT_LENGTH, task.byte_size)
            .bearer_auth(self.platform.access_token())
            .body(task.payload.clone())
            .send()
            .await?;

        let (status, body) = decode(response).await?;
        if let Some(message) = graph_error(&body) {
            return Err(QueueError::transfer_failed(format!("status {}: {}", status.as_u16(), message)));
        }
        if !status.is_success() {
            return Err(QueueError::transfer_failed(format!("status {}", status.as_u16())));
        }
        Ok(())
    }

    async fn finish(&self, task: &UploadTask, session: &VideoSession) -> Result<Option<String>> {
        let url = self.platform.endpoint("advideos")?;
        debug!(task_id = %task.id, phase = %UploadPhase::Finish, "closing upload session");

        let response = self
            .platform
            .client()
            .post(url)
            .json(&json!({
                "upload_phase": "finish",
                "access_token": self.platform.access_token(),
                "upload_session_id": session.upload_session_id,
                "name": task.display_name,
            }))
            .send()
            .await?;

        let (status, body) = decode(response).await?;
        ensure_accepted(UploadPhase::Finish, status, &body)?;

        if body.get("success").and_then(Value::as_bool) == Some(false) {
            return Err(QueueError::upload_rejected(
                UploadPhase::Finish,
                status.as_u16(),
                "platform did not acknowledge the upload",
            ));
        }

        Ok(id_field(&body, "video_id").or_else(|| id_field(&body, "id")))
    }
}
