//! Lazy Activation
//!
//! A tree can be given a start callback that acquires whatever feeds it
//! (a timer, a socket, another store). The callback runs when the first
//! subscriber appears anywhere in the tree and its [`Teardown`] runs when the
//! last one leaves. All nodes derived from one root share the root's count.
//!
//! # States
//!
//! - `Inactive`: no subscribers, nothing running.
//! - `Starting`: the start callback is running. Writes commit but do not
//!   propagate; the subscriber that triggered activation receives the
//!   resulting value as its initial delivery.
//! - `Active`: at least one subscriber and the start callback has returned.
//!   Writes propagate.
//!
//! Each activation gets a fresh epoch. A [`Setter`] handed to an earlier
//! activation drops its writes once that activation has been torn down.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use crate::gate::Identity;
use crate::graph::{Base, Subtree, Wave};
use crate::reactive::tree::Tree;

/// Root-wide subscriber accounting, shared by every node of a tree.
pub(crate) trait Lifecycle {
    /// A subscriber was added somewhere in the tree.
    fn acquire(&self);

    /// A subscriber was removed somewhere in the tree.
    fn release(&self);

    /// Whether writes should propagate.
    fn is_ready(&self) -> bool;

    /// Number of live subscribers in the whole tree.
    fn count(&self) -> usize;
}

/// Cleanup returned by a start callback.
#[must_use]
pub struct Teardown(Option<Box<dyn FnOnce()>>);

impl Teardown {
    /// Nothing to clean up.
    pub fn none() -> Self {
        Self(None)
    }

    /// Run `cleanup` when the tree deactivates.
    pub fn new<F>(cleanup: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self(Some(Box::new(cleanup)))
    }

    fn run(self) {
        if let Some(cleanup) = self.0 {
            cleanup();
        }
    }
}

impl<F> From<F> for Teardown
where
    F: FnOnce() + 'static,
{
    fn from(cleanup: F) -> Self {
        Self::new(cleanup)
    }
}

impl std::fmt::Debug for Teardown {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Teardown").field(&self.0.is_some()).finish()
    }
}

/// Start callback of a tree.
pub(crate) type Start<T> = Box<dyn FnMut(Setter<T>) -> Teardown>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Inactive,
    Starting,
    Active,
}

/// Puts the phase back to `Inactive` if the start callback unwinds. The
/// subscriber that triggered activation releases its count on the way out.
struct Starting<'a> {
    phase: &'a Cell<Phase>,
}

impl Drop for Starting<'_> {
    fn drop(&mut self) {
        self.phase.set(Phase::Inactive);
        tracing::warn!("start callback panicked; tree left inactive");
    }
}

/// Storage and activation state of a tree's root.
pub(crate) struct Root<T> {
    me: Weak<Root<T>>,
    pub slot: RefCell<T>,
    pub subtree: Rc<Subtree<T>>,
    count: Cell<usize>,
    phase: Cell<Phase>,
    epoch: Cell<u64>,
    start: RefCell<Option<Start<T>>>,
    teardown: RefCell<Option<Teardown>>,
}

impl<T: Clone + 'static> Root<T> {
    pub fn new(value: T, start: Option<Start<T>>) -> Rc<Self> {
        Rc::new_cyclic(|me| Self {
            me: me.clone(),
            slot: RefCell::new(value),
            subtree: Rc::new(Subtree::new()),
            count: Cell::new(0),
            phase: Cell::new(Phase::Inactive),
            epoch: Cell::new(0),
            start: RefCell::new(start),
            teardown: RefCell::new(None),
        })
    }

    fn current(&self) -> T {
        self.slot.borrow().clone()
    }
}

impl<T: Clone + 'static> Lifecycle for Root<T> {
    fn acquire(&self) {
        let count = self.count.get() + 1;
        self.count.set(count);
        if count != 1 {
            return;
        }

        self.phase.set(Phase::Starting);
        let setter = Setter {
            root: self.me.clone(),
            epoch: self.epoch.get(),
        };
        let starting = Starting { phase: &self.phase };
        let teardown = match self.start.borrow_mut().as_mut() {
            Some(start) => start(setter),
            None => Teardown::none(),
        };
        std::mem::forget(starting);

        // The start callback may itself have subscribed and unsubscribed
        // its way back to zero.
        if self.count.get() == 0 {
            teardown.run();
            return;
        }
        *self.teardown.borrow_mut() = Some(teardown);
        self.phase.set(Phase::Active);
        tracing::trace!(epoch = self.epoch.get(), "tree activated");
    }

    fn release(&self) {
        let Some(count) = self.count.get().checked_sub(1) else {
            tracing::warn!("release without a matching acquire");
            return;
        };
        self.count.set(count);
        if count != 0 {
            return;
        }

        self.phase.set(Phase::Inactive);
        self.epoch.set(self.epoch.get() + 1);
        let teardown = self.teardown.borrow_mut().take();
        if let Some(teardown) = teardown {
            teardown.run();
        }
        tracing::trace!(epoch = self.epoch.get(), "tree deactivated");
    }

    fn is_ready(&self) -> bool {
        self.phase.get() == Phase::Active
    }

    fn count(&self) -> usize {
        self.count.get()
    }
}

impl<T: Clone + 'static> Base for Root<T> {
    fn announce(&self, wave: &mut Wave) {
        self.subtree.announce(&|| Some(self.current()), wave);
    }

    fn cascade(&self, wave: &mut Wave) {
        self.announce(wave);
        self.subtree.descend(&self.current(), wave);
    }
}

/// Write handle given to a tree's start callback.
///
/// Writes go through the root exactly like [`Tree::set`]. Once the
/// activation that produced this setter is torn down, or the tree is
/// dropped, writes are silently discarded.
pub struct Setter<T> {
    root: Weak<Root<T>>,
    epoch: u64,
}

impl<T> Clone for Setter<T> {
    fn clone(&self) -> Self {
        Self {
            root: Weak::clone(&self.root),
            epoch: self.epoch,
        }
    }
}

impl<T: Clone + Identity + 'static> Setter<T> {
    /// Write a new root value. Returns `true` if the value was committed.
    pub fn set(&self, value: T) -> bool {
        match self.live_tree() {
            Some(tree) => matches!(tree.try_set(value), Ok(true)),
            None => false,
        }
    }

    /// Transform the root value. Returns `true` if the result was committed.
    pub fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(T) -> T,
    {
        match self.live_tree() {
            Some(tree) => tree.update(f),
            None => false,
        }
    }

    /// Whether writes through this setter still reach the tree.
    pub fn is_live(&self) -> bool {
        self.root.upgrade().is_some_and(|root| {
            root.epoch.get() == self.epoch && root.phase.get() != Phase::Inactive
        })
    }

    fn live_tree(&self) -> Option<Tree<T>> {
        if !self.is_live() {
            tracing::trace!(epoch = self.epoch, "dropping write from a stale activation");
            return None;
        }
        self.root.upgrade().map(|root| Tree::from_root(&root))
    }
}

impl<T> std::fmt::Debug for Setter<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Setter").field("epoch", &self.epoch).finish()
    }
}
