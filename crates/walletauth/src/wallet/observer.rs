/*
[INPUT]:  Listener callbacks and events to broadcast
[OUTPUT]: Registration-ordered synchronous dispatch with disposers
[POS]:    Wallet layer - observer registry used by session, registry and providers
[UPDATE]: When dispatch ordering or disposal semantics change
*/

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

/// Shared listener callback
pub type Listener<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Identifier of one registered listener
pub type ListenerId = u64;

pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

struct ObserverSet<T> {
    next_id: ListenerId,
    listeners: BTreeMap<ListenerId, Listener<T>>,
}

/// Listener set keyed by subscription id
///
/// Ids grow monotonically, so map order is registration order.
pub struct Observers<T> {
    inner: Arc<Mutex<ObserverSet<T>>>,
}

impl<T: 'static> Observers<T> {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(ObserverSet {
                next_id: 0,
                listeners: BTreeMap::new(),
            })),
        }
    }

    /// Register a listener and return its id
    pub fn insert(&self, listener: Listener<T>) -> ListenerId {
        let mut set = lock(&self.inner);
        let id = set.next_id;
        set.next_id += 1;
        set.listeners.insert(id, listener);
        id
    }

    /// Remove one listener; unknown ids are ignored
    pub fn remove(&self, id: ListenerId) -> bool {
        lock(&self.inner).listeners.remove(&id).is_some()
    }

    /// Register a listener and return its disposer
    pub fn subscribe(&self, listener: Listener<T>) -> Subscription {
        let id = self.insert(listener);
        let weak: Weak<Mutex<ObserverSet<T>>> = Arc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                lock(&inner).listeners.remove(&id);
            }
        })
    }

    /// Invoke every listener in registration order
    ///
    /// The set is snapshotted first; listeners may subscribe or dispose
    /// while being notified.
    pub fn notify(&self, event: &T) {
        let listeners: Vec<Listener<T>> = lock(&self.inner).listeners.values().cloned().collect();
        for listener in listeners {
            listener(event);
        }
    }

    pub fn len(&self) -> usize {
        lock(&self.inner).listeners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: 'static> Default for Observers<T> {
    fn default() -> Self {
        Self::new()
    }
}

/// Disposer for one registered listener
///
/// Dropping without calling [`Subscription::dispose`] leaves the listener
/// registered.
pub struct Subscription {
    dispose: Option<Box<dyn FnOnce() + Send + Sync>>,
}

impl Subscription {
    pub fn new(dispose: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self {
            dispose: Some(Box::new(dispose)),
        }
    }

    /// Remove exactly the listener this subscription was created for
    pub fn dispose(mut self) {
        if let Some(dispose) = self.dispose.take() {
            dispose();
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.dispose.is_some())
            .finish()
    }
}
