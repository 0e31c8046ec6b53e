use std::sync::Arc;
use tokio::sync::watch;
use tracing::debug;
use super::traits::Connectivity;

/// Current link state plus how many times it has come back online.
///
/// `reconnects` only grows, so a receiver that wakes late still sees that an
/// offline to online transition happened even when the flag reads the same.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkState {
    pub online: bool,
    pub reconnects: u64,
}

/// Online/offline flag fed by the runtime.
///
/// Cloning shares the flag. Subscribers see every transition through a
/// `watch` channel, setting the current value again is not a transition.
#[derive(Debug, Clone)]
pub struct ConnectivityMonitor {
    tx: Arc<watch::Sender<LinkState>>,
}

impl ConnectivityMonitor {
    pub fn new(online: bool) -> Self {
        let (tx, _) = watch::channel(LinkState { online, reconnects: 0 });
        Self { tx: Arc::new(tx) }
    }

    /// Returns true when the value actually changed.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.tx.send_if_modified(|state| {
            if state.online == online {
                return false;
            }
            state.online = online;
            if online {
                state.reconnects += 1;
            }
            true
        });

        if changed {
            debug!(online, "connectivity changed");
        }
        changed
    }

    pub fn state(&self) -> LinkState {
        *self.tx.borrow()
    }

    pub fn subscribe(&self) -> watch::Receiver<LinkState> {
        self.tx.subscribe()
    }
}

impl Default for ConnectivityMonitor {
    fn default() -> Self {
        Self::new(true)
    }
}

impl Connectivity for ConnectivityMonitor {
    fn is_online(&self) -> bool {
        self.tx.borrow().online
    }
}
