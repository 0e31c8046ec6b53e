use std::sync::Arc;
use reqwest::Body;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tracing::{debug, warn};
use crate::core::{Result, UploadPhase, UploadTask};
use super::platform::{decode, ensure_accepted, id_field, PlatformClient};

/// Image upload: one multipart request.
pub struct ImageUploader {
    platform: Arc<PlatformClient>,
}

impl ImageUploader {
    pub fn new(platform: Arc<PlatformClient>) -> Self {
        Self { platform }
    }

    /// Returns the image hash the platform assigned, if it named one.
    ///
    /// A 2xx response without an error envelope means the image was stored,
    /// so a missing hash is only logged.
    pub async fn upload(&self, task: &UploadTask) -> Result<Option<String>> {
        let url = self.platform.endpoint("adimages")?;

        let source = Part::stream_with_length(Body::from(task.payload.clone()), task.byte_size)
            .file_name(task.display_name.clone());
        let form = Form::new()
            .text("access_token", self.platform.access_token().to_string())
            .text("name", task.display_name.clone())
            .part("source", source);

        debug!(task_id = %task.id, phase = %UploadPhase::Image, %url, "sending image");

        let response = self.platform.client().post(url).multipart(form).send().await?;
        let (status, body) = decode(response).await?;
        ensure_accepted(UploadPhase::Image, status, &body)?;

        let hash = image_hash(&body);
        if hash.is_none() {
            warn!(task_id = %task.id, status = status.as_u16(), "image accepted without a hash");
        }
        Ok(hash)
    }
}

/// `images.<file name>.hash`, then a top-level `hash`, then `id`.
fn image_hash(body: &Value) -> Option<String> {
    body.get("images")
        .and_then(Value::as_object)
        .and_then(|images| images.values().find_map(|image| id_field(image, "hash")))
        .or_else(|| id_field(body, "hash"))
        .or_else(|| id_field(body, "id"))
}
