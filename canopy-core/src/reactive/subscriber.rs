//! Subscriber types for the tree.
//!
//! A subscriber is a pair of callbacks registered on a node: `run` receives
//! each new visible value, `invalidate` is told a new value is coming. The
//! caller holds a [`Subscription`] handle; dropping or consuming it removes
//! the subscriber.

use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::Delivery;
use crate::graph::Watch;

/// Key of one subscription in its node's listener set.
///
/// IDs are minted from a process-wide counter and never reused, so a stale
/// handle can never remove somebody else's listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    pub(crate) fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

/// Callback receiving each new value.
pub(crate) type Run<T> = Rc<dyn Fn(&T)>;

/// Callback told that a new value is about to be delivered.
pub(crate) type Invalidate = Rc<dyn Fn()>;

/// The listener registered in a subtree for a direct subscription.
pub(crate) struct Subscriber<T> {
    run: Run<T>,
    invalidate: Option<Invalidate>,
}

impl<T> Subscriber<T> {
    pub fn new(run: Run<T>, invalidate: Option<Invalidate>) -> Self {
        Self { run, invalidate }
    }
}

impl<T: Clone + 'static> Watch<T> for Subscriber<T> {
    fn invalidate(&self) {
        if let Some(invalidate) = &self.invalidate {
            invalidate();
        }
    }

    fn offer(&self, value: &T) -> Option<Delivery> {
        let run = Rc::clone(&self.run);
        let value = value.clone();
        Some(Box::new(move || run(&value)))
    }
}

/// Handle to a live subscription.
///
/// The subscriber stays registered while the handle lives. Dropping the
/// handle or calling [`unsubscribe`](Subscription::unsubscribe) removes it;
/// [`detach`](Subscription::detach) keeps it registered for the lifetime of
/// the tree.
///
/// Removal does not retract deliveries already queued in the running batch.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    id: SubscriberId,
    cancel: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub(crate) fn new<F>(id: SubscriberId, cancel: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// The subscriber's unique ID.
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Remove the subscriber.
    pub fn unsubscribe(mut self) {
        self.cancel();
    }

    /// Keep the subscriber registered for as long as the tree lives.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("live", &self.cancel.is_some())
            .finish()
    }
}
