//! # Listener Registry
//!
//! Observer plumbing shared by the stores, the tutorial machine and the
//! WebSocket service: a set of zero-argument listeners notified
//! synchronously, and an explicit [`Unsubscribe`] handle.

use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Change listener
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Removes a subscription when [`Unsubscribe::unsubscribe`] is called.
///
/// Dropping the handle without calling it keeps the subscription alive,
/// matching the "returned unsubscribe closure" contract UI bindings expect.
#[must_use = "keep the handle to unsubscribe later"]
pub struct Unsubscribe(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Unsubscribe {
    pub fn new(f: impl FnOnce() + Send + Sync + 'static) -> Self {
        Self(Some(Box::new(f)))
    }

    /// Handle that does nothing
    pub fn noop() -> Self {
        Self(None)
    }

    pub fn unsubscribe(mut self) {
        if let Some(f) = self.0.take() {
            f();
        }
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe").field("armed", &self.0.is_some()).finish()
    }
}

#[derive(Default)]
struct ListenerSetInner {
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// Ordered set of listeners, cheap to clone
#[derive(Clone, Default)]
pub struct ListenerSet {
    inner: Arc<ListenerSetInner>,
}

impl ListenerSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, listener: impl Fn() + Send + Sync + 'static) -> Unsubscribe {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.lock().push((id, Arc::new(listener)));

        let weak: Weak<ListenerSetInner> = Arc::downgrade(&self.inner);
        Unsubscribe::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.lock().retain(|(lid, _)| *lid != id);
            }
        })
    }

    /// Call every listener in registration order.
    ///
    /// The list is copied first so listeners may subscribe or unsubscribe
    /// while being notified.
    pub fn emit(&self) {
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .lock()
            .iter()
            .map(|(_, l)| Arc::clone(l))
            .collect();
        for listener in listeners {
            listener();
        }
    }

    pub fn len(&self) -> usize {
        self.inner.listeners.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
