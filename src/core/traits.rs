use async_trait::async_trait;
use super::errors::Result;
use super::types::{Mutation, NewUploadTask, TaskId, TaskView, UploadReceipt, UploadStatus, UploadTask};

/// Live subscription callback, receives the full task snapshot after every mutation.
pub type StoreListener = Box<dyn Fn(&[TaskView]) + Send + Sync>;

/// Handle returned by [`TaskStore::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Durable queue storage.
///
/// Every operation touches a single record and is atomic on its own.
/// Listeners are notified synchronously after each applied insert, update
/// or delete; a mutation that resolves [`Mutation::NotFound`] notifies nobody.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a new task and assign its id.
    async fn insert(&self, task: NewUploadTask) -> Result<TaskId>;

    /// Snapshot of tasks in `status`, in insertion order.
    async fn query_by_status(&self, status: UploadStatus) -> Result<Vec<UploadTask>>;

    /// The only allowed task mutation.
    async fn update_status(&self, id: TaskId, status: UploadStatus) -> Result<Mutation>;

    async fn delete(&self, id: TaskId) -> Result<Mutation>;

    async fn get(&self, id: TaskId) -> Result<Option<UploadTask>>;

    /// Every task, unfiltered, in insertion order.
    async fn snapshot(&self) -> Result<Vec<TaskView>>;

    /// Register a listener. It immediately receives the current snapshot.
    ///
    /// Listeners run while the store is locked: keep them cheap and never
    /// call back into the store from one.
    async fn subscribe(&self, listener: StoreListener) -> Result<SubscriptionId>;

    /// Returns false when the subscription was already gone.
    fn unsubscribe(&self, id: SubscriptionId) -> bool;
}

/// Delivers one task's payload to the ad platform.
#[async_trait]
pub trait MediaUploader: Send + Sync {
    async fn upload(&self, task: &UploadTask) -> Result<UploadReceipt>;
}

/// Binary online/offline signal of the runtime.
pub trait Connectivity: Send + Sync {
    fn is_online(&self) -> bool;
}
