use std::path::Path;
use tracing::{debug, info};
use super::errors::{QueueError, Result};
use super::notice::Notice;
use super::traits::TaskStore;
use super::trigger::QueueTrigger;
use super::types::{MediaFile, Mutation, NewUploadTask, TaskId, UploadStatus};

/// Entry point for the UI: accepts files and cancellations.
#[derive(Clone)]
pub struct EnqueueGateway {
    trigger: QueueTrigger,
}

impl EnqueueGateway {
    pub fn new(trigger: QueueTrigger) -> Self {
        Self { trigger }
    }

    pub fn trigger(&self) -> &QueueTrigger {
        &self.trigger
    }

    /// Persists the file as a pending task, then starts a pass if online.
    ///
    /// The id is returned once the task is stored; delivery happens in the
    /// background.
    pub async fn enqueue(&self, file: MediaFile) -> Result<TaskId> {
        let name = file.name.clone();
        let task = NewUploadTask::from_file(file);
        let (kind, size) = (task.media_kind, task.byte_size);

        let processor = self.trigger.processor();
        let id = processor.store().insert(task).await?;
        info!(task_id = %id, name = %name, %kind, size, "media queued");

        if self.trigger.on_enqueued().is_none() {
            processor.notifier().emit(Notice::QueuedOffline { name });
        }
        Ok(id)
    }

    /// Reads a file from disk and enqueues it under its file name.
    pub async fn enqueue_path(&self, path: impl AsRef<Path>, content_type: &str) -> Result<TaskId> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .ok_or_else(|| QueueError::internal(format!("{} has no file name", path.display())))?;

        self.enqueue(MediaFile::new(name, content_type, bytes)).await
    }

    /// Removes a queued task. A task that is uploading right now cannot be cancelled.
    pub async fn cancel(&self, id: TaskId) -> Result<Mutation> {
        let store = self.trigger.processor().store();

        match store.get(id).await? {
            None => {
                debug!(task_id = %id, "cancel of unknown task");
                Ok(Mutation::NotFound)
            }
            Some(task) if task.status == UploadStatus::Uploading => Err(QueueError::InFlight(id)),
            Some(_) => {
                let outcome = store.delete(id).await?;
                if outcome.is_applied() {
                    info!(task_id = %id, "task cancelled");
                }
                Ok(outcome)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;
    use async_trait::async_trait;
    use tokio::sync::Notify;
    use crate::core::{
        ConnectivityMonitor, MediaKind, MediaUploader, Notifier, QueueProcessor, TaskStore,
        UploadReceipt, UploadTask,
    };
    use crate::store::MemoryTaskStore;
    use super::*;

    struct AcceptAll;

    #[async_trait]
    impl MediaUploader for AcceptAll {
        async fn upload(&self, _task: &UploadTask) -> Result<UploadReceipt> {
            Ok(UploadReceipt::Image { hash: Some("abc".into()) })
        }
    }

    /// Blocks inside the upload until released.
    struct GatedUploader {
        entered: Notify,
        release: Notify,
    }

    #[async_trait]
    impl MediaUploader for GatedUploader {
        async fn upload(&self, _task: &UploadTask) -> Result<UploadReceipt> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(UploadReceipt::Image { hash: Some("abc".into()) })
        }
    }

    fn build(uploader: Arc<dyn MediaUploader>, online: bool) -> (Arc<dyn TaskStore>, Notifier, EnqueueGateway) {
        let store: Arc<dyn TaskStore> = Arc::new(MemoryTaskStore::new());
        let notifier = Notifier::default();
        let monitor = ConnectivityMonitor::new(online);
        let processor = QueueProcessor::new(store.clone(), uploader, Arc::new(monitor.clone()), notifier.clone());
        let trigger = QueueTrigger::new(Arc::new(processor), monitor);
        (store, notifier, EnqueueGateway::new(trigger))
    }

    #[tokio::test]
    async fn test_enqueue_offline_persists_and_notifies() {
        let (store, notifier, gateway) = build(Arc::new(AcceptAll), false);
        let mut rx = notifier.subscribe();

        let id = gateway
            .enqueue(MediaFile::new("clip.mp4", "video/mp4", vec![0u8; 1024]))
            .await
            .unwrap();

        let task = store.get(id).await.unwrap().unwrap();
        assert_eq!(task.status, UploadStatus::Pending);
        assert_eq!(task.media_kind, MediaKind::Video);
        assert_eq!(task.byte_size, 1024);
        assert_eq!(task.display_name, "clip.mp4");

        assert_eq!(rx.recv().await.unwrap(), Notice::QueuedOffline { name: "clip.mp4".into() });
    }

    #[tokio::test]
    async fn test_enqueue_classifies_by_content_type() {
        let (store, _, gateway) = build(Arc::new(AcceptAll), false);

        let image = gateway.enqueue(MediaFile::new("a.webp", "image/webp", vec![1u8])).await.unwrap();
        let other = gateway
            .enqueue(MediaFile::new("doc.bin", "application/octet-stream", vec![1u8]))
            .await
            .unwrap();

        assert_eq!(store.get(image).await.unwrap().unwrap().media_kind, MediaKind::Image);
        assert_eq!(store.get(other).await.unwrap().unwrap().media_kind, MediaKind::Video);
    }

    #[tokio::test]
    async fn test_enqueue_online_uploads() {
        let (store, _, gateway) = build(Arc::new(AcceptAll), true);

        gateway.enqueue(MediaFile::new("a.jpg", "image/jpeg", vec![1u8; 4])).await.unwrap();

        for _ in 0..200 {
            if store.snapshot().await.unwrap().is_empty() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("task was not uploaded");
    }

    #[tokio::test]
    async fn test_enqueue_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("banner.png");
        tokio::fs::write(&path, vec![9u8; 300]).await.unwrap();

        let (store, _, gateway) = build(Arc::new(AcceptAll), false);
        let id = gateway.enqueue_path(&path, "image/png").await.unwrap();

        let task = store.get(id).await.unwrap().unwrap();
        assert_eq!(task.display_name, "banner.png");
        assert_eq!(task.payload.len(), 300);
    }

    #[tokio::test]
    async fn test_enqueue_path_missing_file() {
        let (_, _, gateway) = build(Arc::new(AcceptAll), false);
        let err = gateway.enqueue_path("/nonexistent/clip.mp4", "video/mp4").await.unwrap_err();
        assert!(matches!(err, QueueError::Io(_)));
    }

    #[tokio::test]
    async fn test_cancel_pending_and_missing() {
        let (store, _, gateway) = build(Arc::new(AcceptAll), false);
        let id = gateway.enqueue(MediaFile::new("a.jpg", "image/jpeg", vec![1u8])).await.unwrap();

        assert_eq!(gateway.cancel(id).await.unwrap(), Mutation::Applied);
        assert!(store.snapshot().await.unwrap().is_empty());
        assert_eq!(gateway.cancel(id).await.unwrap(), Mutation::NotFound);
    }

    #[tokio::test]
    async fn test_cancel_failed_task() {
        let (store, _, gateway) = build(Arc::new(AcceptAll), false);
        let id = gateway.enqueue(MediaFile::new("a.jpg", "image/jpeg", vec![1u8])).await.unwrap();
        store.update_status(id, UploadStatus::Failed).await.unwrap();

        assert_eq!(gateway.cancel(id).await.unwrap(), Mutation::Applied);
    }

    #[tokio::test]
    async fn test_cancel_refuses_in_flight_task() {
        let uploader = Arc::new(GatedUploader { entered: Notify::new(), release: Notify::new() });
        let (store, _, gateway) = build(uploader.clone(), true);

        let id = gateway.enqueue(MediaFile::new("a.jpg", "image/jpeg", vec![1u8])).await.unwrap();
        uploader.entered.notified().await;

        let err = gateway.cancel(id).await.unwrap_err();
        assert!(matches!(err, QueueError::InFlight(task_id) if task_id == id));
        assert_eq!(store.get(id).await.unwrap().unwrap().status, UploadStatus::Uploading);

        uploader.release.notify_one();
    }
}
