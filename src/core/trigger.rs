use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use super::connectivity::ConnectivityMonitor;
use super::errors::Result;
use super::notice::Notice;
use super::processor::QueueProcessor;
use super::traits::Connectivity;
use super::types::{PassReport, PassScope};

/// Decides when passes run: at startup, after an enqueue, on reconnection
/// and on explicit publish.
#[derive(Clone)]
pub struct QueueTrigger {
    processor: Arc<QueueProcessor>,
    connectivity: ConnectivityMonitor,
}

impl QueueTrigger {
    pub fn new(processor: Arc<QueueProcessor>, connectivity: ConnectivityMonitor) -> Self {
        Self { processor, connectivity }
    }

    pub fn processor(&self) -> &Arc<QueueProcessor> {
        &self.processor
    }

    pub fn connectivity(&self) -> &ConnectivityMonitor {
        &self.connectivity
    }

    pub fn is_online(&self) -> bool {
        self.connectivity.is_online()
    }

    /// Returns interrupted tasks to the queue. Does not start a pass.
    pub async fn on_startup(&self) -> Result<usize> {
        self.processor.recover_interrupted().await
    }

    /// Starts a background pass over pending tasks when online.
    pub fn on_enqueued(&self) -> Option<JoinHandle<()>> {
        if !self.is_online() {
            return None;
        }

        let processor = self.processor.clone();
        Some(tokio::spawn(async move {
            if let Err(e) = processor.process(PassScope::Pending).await {
                error!(error = %e, "pass after enqueue failed");
            }
        }))
    }

    /// Explicit user action; failed tasks are picked up as well.
    pub async fn publish(&self) -> Result<PassReport> {
        let notifier = self.processor.notifier();
        notifier.emit(Notice::PublishStarted);

        match self.processor.process(PassScope::PendingAndFailed).await {
            Ok(report) => {
                notifier.emit(Notice::PublishCompleted { report: report.clone() });
                Ok(report)
            }
            Err(e) => {
                notifier.emit(Notice::PublishFailed { error: e.to_string() });
                Err(e)
            }
        }
    }

    /// Per-item retry re-runs the whole queue.
    pub async fn retry(&self) -> Result<PassReport> {
        self.publish().await
    }

    /// Runs a pass on every offline to online transition until the handle is shut down.
    ///
    /// Transitions that land while a pass is running are not lost: the
    /// reconnect counter is compared after the pass and another pass follows.
    pub fn spawn_reconnect_watcher(&self) -> WatcherHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let mut rx = self.connectivity.subscribe();
        let mut seen = rx.borrow_and_update().reconnects;
        let trigger = self.clone();

        let join = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = cancelled.cancelled() => break,
                    changed = rx.changed() => {
                        if changed.is_err() {
                            break;
                        }

                        let state = *rx.borrow_and_update();
                        if state.reconnects == seen {
                            continue;
                        }
                        if state.reconnects > seen + 1 {
                            debug!(missed = state.reconnects - seen - 1, "reconnections merged into one pass");
                        }
                        seen = state.reconnects;

                        if state.online {
                            trigger.on_reconnected().await;
                        }
                    }
                }
            }

            debug!("reconnect watcher stopped");
        });

        WatcherHandle { token, join }
    }

    async fn on_reconnected(&self) {
        info!("back online, processing queue");
        self.processor.notifier().emit(Notice::Reconnected);

        if let Err(e) = self.processor.process(PassScope::Pending).await {
            error!(error = %e, "pass after reconnection failed");
        }
    }
}

/// Handle of the reconnect watcher task.
pub struct WatcherHandle {
    token: CancellationToken,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    /// Stops watching. A pass already running finishes first.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.join.await {
            error!(error = %e, "reconnect watcher panicked");
        }
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }
}
