//! Publish/subscribe registry with idempotent disposers.
//!
//! Listeners are invoked in subscription order. Unsubscribing is safe at any
//! time, including from inside a listener during fan-out: the current
//! dispatch pass still delivers to the snapshot it took, and later passes
//! skip the removed listener.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

pub struct SubscriberRegistry<T> {
    listeners: Arc<Mutex<Vec<(u64, Listener<T>)>>>,
    next_id: Arc<AtomicU64>,
}

impl<T> Clone for SubscriberRegistry<T> {
    fn clone(&self) -> Self {
        Self {
            listeners: Arc::clone(&self.listeners),
            next_id: Arc::clone(&self.next_id),
        }
    }
}

impl<T> Default for SubscriberRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SubscriberRegistry<T> {
    pub fn new() -> Self {
        Self {
            listeners: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(AtomicU64::new(1)),
        }
    }

    /// Register a listener; the returned subscription unsubscribes it.
    pub fn subscribe(&self, listener: impl Fn(&T) + Send + Sync + 'static) -> Subscription<T> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .push((id, Arc::new(listener)));

        Subscription {
            id,
            listeners: Arc::clone(&self.listeners),
            disposed: AtomicBool::new(false),
        }
    }

    /// Invoke every current listener, in subscription order.
    pub fn dispatch(&self, message: &T) {
        // Snapshot under the lock, invoke outside it, so listeners may
        // subscribe or unsubscribe without deadlocking.
        let snapshot: Vec<Listener<T>> = self
            .listeners
            .lock()
            .expect("listener registry poisoned")
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();

        for listener in snapshot {
            listener(message);
        }
    }

    pub fn len(&self) -> usize {
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Handle for one registered listener; disposes on drop.
pub struct Subscription<T> {
    id: u64,
    listeners: Arc<Mutex<Vec<(u64, Listener<T>)>>>,
    disposed: AtomicBool,
}

impl<T> Subscription<T> {
    /// Remove the listener. Calling this more than once is a no-op.
    pub fn unsubscribe(&self) {
        if self.disposed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.listeners
            .lock()
            .expect("listener registry poisoned")
            .retain(|(id, _)| *id != self.id);
    }
}

impl<T> Drop for Subscription<T> {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
