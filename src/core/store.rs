use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use super::traits::{StoreListener, SubscriptionId};
use super::types::TaskView;

/// Listener registry shared by the store implementations.
#[derive(Default)]
pub struct Subscribers {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(SubscriptionId, StoreListener)>>,
}

impl Subscribers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&self, listener: StoreListener) -> SubscriptionId {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.lock().push((id, listener));
        id
    }

    pub fn remove(&self, id: SubscriptionId) -> bool {
        let mut listeners = self.lock();
        let before = listeners.len();
        listeners.retain(|(sub, _)| *sub != id);
        listeners.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Push `snapshot` to every listener, in registration order.
    pub fn notify(&self, snapshot: &[TaskView]) {
        for (_, listener) in self.lock().iter() {
            listener(snapshot);
        }
    }

    /// Deliver to a single listener, used for the initial snapshot on subscribe.
    pub fn notify_one(&self, id: SubscriptionId, snapshot: &[TaskView]) {
        if let Some((_, listener)) = self.lock().iter().find(|(sub, _)| *sub == id) {
            listener(snapshot);
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<(SubscriptionId, StoreListener)>> {
        // Poisoned only by a panicking listener, the list itself stays intact
        self.listeners.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use super::*;

    #[test]
    fn test_notify_in_registration_order() {
        let subscribers = Subscribers::new();
        let seen = Arc::new(Mutex::new(Vec::new()));

        for tag in ["first", "second"] {
            let seen = seen.clone();
            subscribers.add(Box::new(move |_: &[TaskView]| seen.lock().unwrap().push(tag)));
        }

        subscribers.notify(&[]);
        assert_eq!(*seen.lock().unwrap(), vec!["first", "second"]);
    }

    #[test]
    fn test_remove_subscription() {
        let subscribers = Subscribers::new();
        let id = subscribers.add(Box::new(|_: &[TaskView]| {}));

        assert!(!subscribers.is_empty());
        assert!(subscribers.remove(id));
        assert!(!subscribers.remove(id));
        assert!(subscribers.is_empty());
    }

    #[test]
    fn test_notify_one_targets_single_listener() {
        let subscribers = Subscribers::new();
        let hits = Arc::new(AtomicU64::new(0));

        let counter = hits.clone();
        let target = subscribers.add(Box::new(move |_: &[TaskView]| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));
        let counter = hits.clone();
        subscribers.add(Box::new(move |_: &[TaskView]| {
            counter.fetch_add(10, Ordering::SeqCst);
        }));

        subscribers.notify_one(target, &[]);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
