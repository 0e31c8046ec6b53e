mod platform;
pub mod image;
pub mod video;

use std::sync::Arc;
use async_trait::async_trait;
use crate::config::Config;
use crate::core::{MediaKind, MediaUploader, Result, UploadReceipt, UploadTask};

pub use platform::PlatformClient;
pub use image::ImageUploader;
pub use video::{VideoSession, VideoUploader};

/// Routes each task to the upload protocol of its media kind.
pub struct GraphUploader {
    image: ImageUploader,
    video: VideoUploader,
}

impl GraphUploader {
    pub fn new(platform: PlatformClient) -> Self {
        let platform = Arc::new(platform);
        Self {
            image: ImageUploader::new(platform.clone()),
            video: VideoUploader::new(platform),
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Ok(Self::new(PlatformClient::new(&config.platform, &config.http)?))
    }
}

#[async_trait]
impl MediaUploader for GraphUploader {
    async fn upload(&self, task: &UploadTask) -> Result<UploadReceipt> {
        match task.media_kind {
            MediaKind::Image => {
                let hash = self.image.upload(task).await?;
                Ok(UploadReceipt::Image { hash })
            }
            MediaKind::Video => self.video.upload(task).await,
        }
    }
}
