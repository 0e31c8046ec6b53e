use super::*;

#[cfg(test)]
mod tests {
    use std::str::FromStr;
    use super::*;

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::from_content_type("image/jpeg"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("image/svg+xml"), MediaKind::Image);
        assert_eq!(MediaKind::from_content_type("video/mp4"), MediaKind::Video);

        // anything that is not an image goes through the video protocol
        assert_eq!(MediaKind::from_content_type("application/pdf"), MediaKind::Video);
        assert_eq!(MediaKind::from_content_type(""), MediaKind::Video);
        assert_eq!(MediaKind::from_content_type("Image/PNG"), MediaKind::Video);
    }

    #[test]
    fn test_status_round_trip_through_text() {
        for status in [UploadStatus::Pending, UploadStatus::Uploading, UploadStatus::Failed] {
            assert_eq!(UploadStatus::from_str(status.as_str()).unwrap(), status);
        }

        let err = UploadStatus::from_str("done").unwrap_err();
        assert_eq!(err.value, "done");
        assert!(MediaKind::from_str("audio").is_err());
    }

    #[test]
    fn test_only_uploading_is_not_cancellable() {
        assert!(UploadStatus::Pending.is_cancellable());
        assert!(UploadStatus::Failed.is_cancellable());
        assert!(!UploadStatus::Uploading.is_cancellable());
    }

    #[test]
    fn test_failure_policy() {
        assert_eq!(FailurePolicy::default(), FailurePolicy::MarkFailed);
        assert_eq!(FailurePolicy::MarkFailed.failure_status(), UploadStatus::Failed);
        assert_eq!(FailurePolicy::RevertToPending.failure_status(), UploadStatus::Pending);
    }

    #[test]
    fn test_pass_scope_statuses() {
        assert_eq!(PassScope::Pending.statuses(), &[UploadStatus::Pending]);
        assert!(PassScope::PendingAndFailed.statuses().contains(&UploadStatus::Failed));
        assert!(!PassScope::PendingAndFailed.statuses().contains(&UploadStatus::Uploading));
    }

    #[test]
    fn test_new_task_from_file() {
        let file = MediaFile::new("photo.jpg", "image/jpeg", vec![0u8; 2048]);
        let task = NewUploadTask::from_file(file);

        assert_eq!(task.media_kind, MediaKind::Image);
        assert_eq!(task.byte_size, 2048);
        assert_eq!(task.display_name, "photo.jpg");
        assert_eq!(task.payload.len(), 2048);
    }

    #[test]
    fn test_pass_id_generation() {
        let id1 = PassId::new();
        let id2 = PassId::new();

        assert_ne!(id1, id2);
        assert!(!id1.to_string().is_empty());
    }

    #[test]
    fn test_task_view_serializes_without_payload() {
        let view = TaskView {
            id: TaskId(3),
            display_name: "clip.mp4".into(),
            media_kind: MediaKind::Video,
            byte_size: 10,
            status: UploadStatus::Failed,
            created_at: chrono::Utc::now(),
        };

        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["media_kind"], "video");
        assert!(json.get("payload").is_none());
    }

    #[test]
    fn test_error_classification() {
        let rejected = QueueError::upload_rejected(UploadPhase::Start, 400, "bad token");
        assert!(rejected.is_platform_rejection());
        assert!(rejected.to_string().contains("start"));

        assert!(QueueError::transfer_failed("reset").is_platform_rejection());
        assert!(!QueueError::InFlight(TaskId(1)).is_platform_rejection());
        assert!(!QueueError::config("x").is_platform_rejection());
    }
}
