pub mod core;
pub mod store;
pub mod uploaders;
pub mod config;
pub mod logging;

// Core re-exports
pub use crate::core::{
    ConnectivityMonitor,
    EnqueueGateway,
    FailurePolicy,
    LinkState,
    MediaFile,
    MediaKind,
    MediaUploader,
    Mutation,
    Notice,
    Notifier,
    PassReport,
    PassScope,
    QueueError,
    QueueProcessor,
    QueueTrigger,
    Result,
    TaskId,
    TaskStore,
    TaskView,
    UploadStatus,
    UploadTask,
};

pub use store::{MemoryTaskStore, SqliteTaskStore};
pub use uploaders::{GraphUploader, PlatformClient};
pub use config::Config;
