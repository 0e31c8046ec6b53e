mod types;
mod traits;
mod errors;
mod store;
mod notice;
mod processor;
mod connectivity;
mod trigger;
mod gateway;

pub use types::{
    FailurePolicy, MediaFile, MediaKind, Mutation, NewUploadTask, PassId, PassReport, PassScope,
    TaskId, TaskView, UnknownVariant, UploadReceipt, UploadStatus, UploadTask,
};
pub use traits::{
    Connectivity,
    MediaUploader,
    StoreListener,
    SubscriptionId,
    TaskStore,
};
pub use errors::{QueueError, Result, UploadPhase};
pub use store::Subscribers;
pub use notice::{Notice, NoticeLevel, Notifier};
pub use processor::QueueProcessor;
pub use connectivity::{ConnectivityMonitor, LinkState};
pub use trigger::{QueueTrigger, WatcherHandle};
pub use gateway::EnqueueGateway;

#[cfg(test)]
mod tests;
