use std::sync::Arc;
use tracing::{debug, error, info, info_span, warn, Instrument};
use super::errors::Result;
use super::notice::{Notice, Notifier};
use super::traits::{Connectivity, MediaUploader, TaskStore};
use super::types::{
    FailurePolicy, Mutation, PassId, PassReport, PassScope, UploadStatus, UploadTask,
};

enum TaskOutcome {
    Succeeded,
    Failed,
    /// Cancelled between the status query and the claim
    Vanished,
}

/// Drives queued tasks through the upload protocol, one at a time.
pub struct QueueProcessor {
    store: Arc<dyn TaskStore>,
    uploader: Arc<dyn MediaUploader>,
    connectivity: Arc<dyn Connectivity>,
    notifier: Notifier,
    policy: FailurePolicy,
}

impl QueueProcessor {
    pub fn new(
        store: Arc<dyn TaskStore>,
        uploader: Arc<dyn MediaUploader>,
        connectivity: Arc<dyn Connectivity>,
        notifier: Notifier,
    ) -> Self {
        Self {
            store,
            uploader,
            connectivity,
            notifier,
            policy: FailurePolicy::default(),
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn store(&self) -> &Arc<dyn TaskStore> {
        &self.store
    }

    pub fn notifier(&self) -> &Notifier {
        &self.notifier
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    pub fn failure_policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Run one pass over the tasks `scope` selects.
    ///
    /// Offline, the pass touches nothing. Otherwise every selected task is
    /// claimed, uploaded and then deleted or reverted before the next one is
    /// claimed. Per-task failures never abort the pass; only a failing status
    /// query is returned as an error.
    pub async fn process(&self, scope: PassScope) -> Result<PassReport> {
        let pass_id = PassId::new();
        let span = info_span!("pass", %pass_id, ?scope);

        async move {
            let mut report = PassReport::new(pass_id);

            if !self.connectivity.is_online() {
                info!("offline, pass skipped");
                self.notifier.emit(Notice::Offline);
                report.skipped_offline = true;
                return Ok(report);
            }

            let tasks = self.claimable(scope).await?;
            if tasks.is_empty() {
                debug!("queue empty, nothing to process");
                return Ok(report);
            }

            info!(count = tasks.len(), "processing queued uploads");

            for task in tasks {
                match self.run_task(task).await {
                    TaskOutcome::Succeeded => {
                        report.attempted += 1;
                        report.succeeded += 1;
                    }
                    TaskOutcome::Failed => {
                        report.attempted += 1;
                        report.failed += 1;
                    }
                    TaskOutcome::Vanished => {}
                }
            }

            info!(
                attempted = report.attempted,
                succeeded = report.succeeded,
                failed = report.failed,
                "pass finished"
            );
            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Put tasks a dead process left `Uploading` back in line. Uploads nothing.
    pub async fn recover_interrupted(&self) -> Result<usize> {
        let stale = self.store.query_by_status(UploadStatus::Uploading).await?;
        let mut recovered = 0;

        for task in stale {
            if self.store.update_status(task.id, UploadStatus::Pending).await?.is_applied() {
                recovered += 1;
            }
        }

        if recovered > 0 {
            warn!(recovered, "interrupted uploads returned to the queue");
        }
        Ok(recovered)
    }

    async fn claimable(&self, scope: PassScope) -> Result<Vec<UploadTask>> {
        let mut tasks = Vec::new();
        for status in scope.statuses() {
            tasks.extend(self.store.query_by_status(*status).await?);
        }
        // a task can move between statuses while they are queried one by one
        tasks.sort_by_key(|task| task.id);
        tasks.dedup_by_key(|task| task.id);
        Ok(tasks)
    }

    async fn run_task(&self, task: UploadTask) -> TaskOutcome {
        let id = task.id;
        let name = task.display_name.clone();

        // Claim
        match self.store.update_status(id, UploadStatus::Uploading).await {
            Ok(Mutation::Applied) => {}
            Ok(Mutation::NotFound) => {
                debug!(task_id = %id, name = %name, "task removed before it could be claimed");
                return TaskOutcome::Vanished;
            }
            Err(err) => {
                error!(task_id = %id, name = %name, error = %err, "failed to claim task");
                self.notifier.emit(Notice::UploadFailed { id, name, error: err.to_string() });
                return TaskOutcome::Failed;
            }
        }

        debug!(task_id = %id, name = %name, kind = %task.media_kind, size = task.byte_size, "uploading");

        match self.uploader.upload(&task).await {
            Ok(receipt) => {
                info!(task_id = %id, name = %name, ?receipt, "upload succeeded");

                match self.store.delete(id).await {
                    Ok(Mutation::Applied) => {}
                    Ok(Mutation::NotFound) => {
                        debug!(task_id = %id, "task already removed");
                    }
                    Err(err) => {
                        // Left `Uploading`; `recover_interrupted` puts it back on the next start
                        error!(task_id = %id, error = %err, "uploaded task could not be removed");
                    }
                }

                self.notifier.emit(Notice::Uploaded { id, name });
                TaskOutcome::Succeeded
            }
            Err(err) => {
                let fallback = self.policy.failure_status();
                warn!(task_id = %id, name = %name, error = %err, status = %fallback, "upload failed");

                match self.store.update_status(id, fallback).await {
                    Ok(Mutation::Applied) => {}
                    Ok(Mutation::NotFound) => {
                        debug!(task_id = %id, "task cancelled during upload, not restored");
                    }
                    Err(store_err) => {
                        error!(task_id = %id, error = %store_err, "failed to revert task status");
                    }
                }

                self.notifier.emit(Notice::UploadFailed { id, name, error: err.to_string() });
                TaskOutcome::Failed
            }
        }
    }
}
