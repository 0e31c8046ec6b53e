use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};
use async_trait::async_trait;
use crate::core::{
    Mutation, NewUploadTask, QueueError, Result, StoreListener, Subscribers, SubscriptionId,
    TaskId, TaskStore, TaskView, UploadStatus, UploadTask,
};

#[derive(Default)]
struct Inner {
    next_id: i64,
    tasks: BTreeMap<TaskId, UploadTask>,
}

impl Inner {
    fn views(&self) -> Vec<TaskView> {
        self.tasks.values().map(TaskView::from).collect()
    }
}

/// Non-durable queue store with the same contract as the SQLite one.
#[derive(Default)]
pub struct MemoryTaskStore {
    inner: Mutex<Inner>,
    subscribers: Subscribers,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Inner>> {
        self.inner
            .lock()
            .map_err(|_| QueueError::internal("memory store lock poisoned"))
    }

    fn publish(&self, inner: &Inner) {
        if !self.subscribers.is_empty() {
            self.subscribers.notify(&inner.views());
        }
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn insert(&self, task: NewUploadTask) -> Result<TaskId> {
        let mut inner = self.lock()?;
        inner.next_id += 1;
        let id = TaskId(inner.next_id);

        inner.tasks.insert(id, UploadTask {
            id,
            payload: task.payload,
            media_kind: task.media_kind,
            display_name: task.display_name,
            byte_size: task.byte_size,
            status: UploadStatus::Pending,
            created_at: task.created_at,
        });

        self.publish(&inner);
        Ok(id)
    }

    async fn query_by_status(&self, status: UploadStatus) -> Result<Vec<UploadTask>> {
        let inner = self.lock()?;
        Ok(inner
            .tasks
            .values()
            .filter(|task| task.status == status)
            .cloned()
            .collect())
    }

    async fn update_status(&self, id: TaskId, status: UploadStatus) -> Result<Mutation> {
        let mut inner = self.lock()?;
        match inner.tasks.get_mut(&id) {
            Some(task) => task.status = status,
            None => return Ok(Mutation::NotFound),
        }
        self.publish(&inner);
        Ok(Mutation::Applied)
    }

    async fn delete(&self, id: TaskId) -> Result<Mutation> {
        let mut inner = self.lock()?;
        if inner.tasks.remove(&id).is_none() {
            return Ok(Mutation::NotFound);
        }
        self.publish(&inner);
        Ok(Mutation::Applied)
    }

    async fn get(&self, id: TaskId) -> Result<Option<UploadTask>> {
        Ok(self.lock()?.tasks.get(&id).cloned())
    }

    async fn snapshot(&self) -> Result<Vec<TaskView>> {
        Ok(self.lock()?.views())
    }

    async fn subscribe(&self, listener: StoreListener) -> Result<SubscriptionId> {
        let inner = self.lock()?;
        let id = self.subscribers.add(listener);
        self.subscribers.notify_one(id, &inner.views());
        Ok(id)
    }

    fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.subscribers.remove(id)
    }
}
