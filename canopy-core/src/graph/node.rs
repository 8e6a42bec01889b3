//! Subscriber Tree Nodes
//!
//! Each structural node of a tree (the root, and every node derived with an
//! accessor) owns a [`Subtree`]: its direct listeners plus the edges leading
//! to its derived children. Nodes derived with a chooser do not get their own
//! subtree; they share their parent's and wrap every listener and edge they
//! register with their chooser (see [`Narrowed`]).
//!
//! Subtrees are grow-only. Listeners come and go with subscriptions, but an
//! edge stays registered for as long as the parent subtree lives.

use std::cell::RefCell;
use std::rc::Rc;

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::scheduler::Wave;
use crate::lens::{Accessor, Chooser};
use crate::reactive::{Delivery, SubscriberId};

/// Reads the current visible value of a node, `None` when absent or refused.
pub(crate) type Reader<T> = Rc<dyn Fn() -> Option<T>>;

/// A listener as seen by the propagation engine.
pub(crate) trait Watch<T> {
    /// Tell the listener a new value is on its way.
    fn invalidate(&self);

    /// Package a delivery of `value`, or `None` if the listener's chooser
    /// refuses it.
    fn offer(&self, value: &T) -> Option<Delivery>;
}

/// A registered derivation from a parent of type `P`.
pub(crate) trait Edge<P> {
    /// Schedule a visit of the child subtree for the given parent value.
    /// Children that are currently absent are pruned.
    fn descend(&self, parent: &P, wave: &mut Wave);
}

/// Where a node registers its listeners and derived children.
pub(crate) trait Mount<T> {
    fn listen(&self, id: SubscriberId, watch: Rc<dyn Watch<T>>);

    /// Returns `false` if `id` was not listening.
    fn unlisten(&self, id: SubscriberId) -> bool;

    fn graft(&self, edge: Rc<dyn Edge<T>>);
}

/// The structural anchor of a node, used by the propagation engine.
pub(crate) trait Base {
    /// Ancestor phase: offer the current value to this node's own listeners.
    fn announce(&self, wave: &mut Wave);

    /// Self and descendant phases: offer the current value to this node's
    /// listeners, then schedule every present child.
    fn cascade(&self, wave: &mut Wave);
}

/// Listeners and children of one structural node.
pub(crate) struct Subtree<T> {
    listeners: RefCell<IndexMap<SubscriberId, Rc<dyn Watch<T>>>>,
    children: RefCell<Vec<Rc<dyn Edge<T>>>>,
}

impl<T: 'static> Subtree<T> {
    pub fn new() -> Self {
        Self {
            listeners: RefCell::new(IndexMap::new()),
            children: RefCell::new(Vec::new()),
        }
    }

    #[cfg(test)]
    pub fn listener_count(&self) -> usize {
        self.listeners.borrow().len()
    }

    #[cfg(test)]
    pub fn child_count(&self) -> usize {
        self.children.borrow().len()
    }

    // Callbacks may subscribe or unsubscribe, so never hold a borrow while
    // calling out.
    fn listeners(&self) -> SmallVec<[Rc<dyn Watch<T>>; 8]> {
        self.listeners.borrow().values().cloned().collect()
    }

    fn children(&self) -> SmallVec<[Rc<dyn Edge<T>>; 8]> {
        self.children.borrow().iter().cloned().collect()
    }

    /// Ancestor and self phases: every listener is invalidated, then offered
    /// the value as `read` sees it after that invalidation.
    pub fn announce(&self, read: &dyn Fn() -> Option<T>, wave: &mut Wave) {
        for watch in self.listeners() {
            watch.invalidate();
            let Some(value) = read() else { continue };
            if let Some(delivery) = watch.offer(&value) {
                wave.deliver(delivery);
            }
        }
    }

    /// Schedule all children for a visit relative to `value`.
    pub fn descend(&self, value: &T, wave: &mut Wave) {
        for edge in self.children() {
            edge.descend(value, wave);
        }
    }

    /// Descendant phase: listeners refusing the value are skipped without
    /// invalidation.
    pub fn visit(&self, value: &T, wave: &mut Wave) {
        for watch in self.listeners() {
            if let Some(delivery) = watch.offer(value) {
                wave.deliver(delivery);
                watch.invalidate();
            }
        }
        self.descend(value, wave);
    }
}

impl<T: 'static> Mount<T> for Subtree<T> {
    fn listen(&self, id: SubscriberId, watch: Rc<dyn Watch<T>>) {
        self.listeners.borrow_mut().insert(id, watch);
    }

    fn unlisten(&self, id: SubscriberId) -> bool {
        self.listeners.borrow_mut().shift_remove(&id).is_some()
    }

    fn graft(&self, edge: Rc<dyn Edge<T>>) {
        self.children.borrow_mut().push(edge);
    }
}

/// Base of a derived structural node.
pub(crate) struct Anchor<T> {
    pub read: Reader<T>,
    pub subtree: Rc<Subtree<T>>,
}

impl<T: 'static> Base for Anchor<T> {
    fn announce(&self, wave: &mut Wave) {
        self.subtree.announce(&*self.read, wave);
    }

    fn cascade(&self, wave: &mut Wave) {
        self.announce(wave);
        if let Some(value) = (self.read)() {
            self.subtree.descend(&value, wave);
        }
    }
}

/// Edge to a child derived through an accessor.
pub(crate) struct Zoomed<P, C> {
    pub accessor: Rc<dyn Accessor<P, C>>,
    pub subtree: Rc<Subtree<C>>,
}

impl<P, C: 'static> Edge<P> for Zoomed<P, C> {
    fn descend(&self, parent: &P, wave: &mut Wave) {
        if let Some(child) = self.accessor.read(parent) {
            let subtree = Rc::clone(&self.subtree);
            wave.defer(move |wave| subtree.visit(&child, wave));
        }
    }
}

/// Mount of a chosen node: registrations land in the parent's mount,
/// filtered through the chooser.
pub(crate) struct Narrowed<S, T> {
    pub parent: Rc<dyn Mount<S>>,
    pub chooser: Rc<dyn Chooser<S, T>>,
}

impl<S: 'static, T: 'static> Mount<T> for Narrowed<S, T> {
    fn listen(&self, id: SubscriberId, watch: Rc<dyn Watch<T>>) {
        let narrowed = NarrowedWatch {
            inner: watch,
            chooser: Rc::clone(&self.chooser),
        };
        self.parent.listen(id, Rc::new(narrowed));
    }

    fn unlisten(&self, id: SubscriberId) -> bool {
        self.parent.unlisten(id)
    }

    fn graft(&self, edge: Rc<dyn Edge<T>>) {
        let narrowed = NarrowedEdge {
            inner: edge,
            chooser: Rc::clone(&self.chooser),
        };
        self.parent.graft(Rc::new(narrowed));
    }
}

struct NarrowedWatch<S, T> {
    inner: Rc<dyn Watch<T>>,
    chooser: Rc<dyn Chooser<S, T>>,
}

impl<S, T> Watch<S> for NarrowedWatch<S, T> {
    fn invalidate(&self) {
        self.inner.invalidate();
    }

    fn offer(&self, value: &S) -> Option<Delivery> {
        let chosen = self.chooser.choose(value)?;
        self.inner.offer(&chosen)
    }
}

struct NarrowedEdge<S, T> {
    inner: Rc<dyn Edge<T>>,
    chooser: Rc<dyn Chooser<S, T>>,
}

impl<S, T> Edge<S> for NarrowedEdge<S, T> {
    fn descend(&self, parent: &S, wave: &mut Wave) {
        if let Some(chosen) = self.chooser.choose(parent) {
            self.inner.descend(&chosen, wave);
        }
    }
}
