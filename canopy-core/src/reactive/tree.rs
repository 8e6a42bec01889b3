//! Tree Implementation
//!
//! A tree is a reactive value container that can be decomposed into derived
//! nodes: [`zoom`](Tree::zoom) follows an accessor into a part of the value,
//! [`choose`](Tree::choose) narrows it to a variant. Every derived node is a
//! tree in its own right, and a write on any of them is seen by all
//! ancestors and descendants, never by siblings.
//!
//! # How Trees Work
//!
//! 1. The root owns the only stored value. A derived node holds a read
//!    closure (and, when writable, a write closure) composed from its
//!    parent's and its own accessor or chooser. Nothing is cached.
//!
//! 2. Subscribing registers a listener in the subscriber graph, counts
//!    towards the root's activation and delivers the current value
//!    immediately, unless the node currently has no value.
//!
//! 3. A write that passes the equality gate is committed through the
//!    parents down to the root's slot, then propagated as one batch.
//!
//! # Single-threaded
//!
//! Trees use `Rc` and `RefCell` internally and are neither `Send` nor
//! `Sync`. Reentrant writes from inside listeners are supported; see
//! `reactive::batch`.

use std::cell::RefCell;
use std::fmt::Debug;
use std::rc::Rc;

use super::activation::{Lifecycle, Root, Setter, Teardown};
use super::batch;
use super::subscriber::{Invalidate, Run, Subscriber, SubscriberId, Subscription};
use crate::error::{Result, TreeError};
use crate::gate::Identity;
use crate::graph::{self, Anchor, Base, Lineage, Mount, Narrowed, Reader, Subtree, Zoomed};
use crate::lens::{self, Accessor, Chooser, Keyed};

type Commit<T> = Rc<dyn Fn(T) -> Result<()>>;
type Edit<'a, T> = dyn FnMut(&mut T) -> Result<()> + 'a;
type Modify<T> = Rc<dyn Fn(&mut Edit<'_, T>) -> Result<()>>;

/// The read side shared by every kind of node.
struct Node<T> {
    read: Reader<T>,
    mount: Rc<dyn Mount<T>>,
    base: Rc<dyn Base>,
    lineage: Lineage,
    life: Rc<dyn Lifecycle>,
}

impl<T> Clone for Node<T> {
    fn clone(&self) -> Self {
        Self {
            read: Rc::clone(&self.read),
            mount: Rc::clone(&self.mount),
            base: Rc::clone(&self.base),
            lineage: self.lineage.clone(),
            life: Rc::clone(&self.life),
        }
    }
}

impl<T: Clone + 'static> Node<T> {
    fn subscribe(&self, run: Run<T>, invalidate: Option<Invalidate>) -> Subscription {
        let id = SubscriberId::next();
        self.mount
            .listen(id, Rc::new(Subscriber::new(Rc::clone(&run), invalidate)));

        let mount = Rc::clone(&self.mount);
        let life = Rc::clone(&self.life);
        // Built before activation and the initial delivery: a panicking start
        // callback or listener unsubscribes on unwind.
        let subscription = Subscription::new(id, move || {
            if mount.unlisten(id) {
                life.release();
            }
        });
        self.life.acquire();

        if let Some(value) = (self.read)() {
            run(&value);
        }
        subscription
    }

    fn get(&self) -> Option<T> {
        if self.life.count() > 0 {
            return (self.read)();
        }
        let captured = Rc::new(RefCell::new(None));
        let sink = Rc::clone(&captured);
        self.subscribe(Rc::new(move |value: &T| *sink.borrow_mut() = Some(value.clone())), None)
            .unsubscribe();
        let value = captured.borrow_mut().take();
        value
    }

    fn zoom<C: Clone + 'static>(&self, accessor: Rc<dyn Accessor<T, C>>) -> Node<C> {
        let subtree = Rc::new(Subtree::new());
        self.mount.graft(Rc::new(Zoomed {
            accessor: Rc::clone(&accessor),
            subtree: Rc::clone(&subtree),
        }));

        let parent = Rc::clone(&self.read);
        let read: Reader<C> = Rc::new(move || parent().and_then(|value| accessor.read(&value)));

        let mut lineage = Lineage::with_capacity(self.lineage.len() + 1);
        lineage.push(Rc::clone(&self.base));
        lineage.extend(self.lineage.iter().cloned());

        Node {
            base: Rc::new(Anchor {
                read: Rc::clone(&read),
                subtree: Rc::clone(&subtree),
            }),
            read,
            mount: subtree,
            lineage,
            life: Rc::clone(&self.life),
        }
    }

    fn choose<Q: Clone + 'static>(&self, chooser: Rc<dyn Chooser<T, Q>>) -> Node<Q> {
        let parent = Rc::clone(&self.read);
        let narrow = Rc::clone(&chooser);
        Node {
            read: Rc::new(move || parent().and_then(|value| narrow.choose(&value))),
            mount: Rc::new(Narrowed {
                parent: Rc::clone(&self.mount),
                chooser,
            }),
            base: Rc::clone(&self.base),
            lineage: self.lineage.clone(),
            life: Rc::clone(&self.life),
        }
    }

    /// Deliver a committed write to everyone interested.
    fn propagate(&self) {
        if !self.life.is_ready() {
            return;
        }
        batch::dispatch(|| graph::propagate(&self.lineage, &*self.base));
    }
}

/// Write side of a writable node.
struct Writer<T> {
    /// Replace the node's value. Fails when an ancestor is vacant or refuses
    /// the write.
    commit: Commit<T>,
    /// Mutate the node's value in place. Nothing is stored when the node is
    /// vacant or `f` fails.
    modify: Modify<T>,
}

impl<T> Clone for Writer<T> {
    fn clone(&self) -> Self {
        Self {
            commit: Rc::clone(&self.commit),
            modify: Rc::clone(&self.modify),
        }
    }
}

impl<T: 'static> Writer<T> {
    fn zoom<C: 'static>(&self, accessor: Rc<dyn Accessor<T, C>>) -> Writer<C> {
        let parent = Rc::clone(&self.modify);
        let write = Rc::clone(&accessor);
        let commit: Commit<C> = Rc::new(move |child: C| {
            let mut child = Some(child);
            parent(&mut |value: &mut T| match child.take() {
                Some(child) => write.write(value, child),
                None => Ok(()),
            })
        });

        let parent = Rc::clone(&self.modify);
        let modify: Modify<C> = Rc::new(move |f: &mut Edit<'_, C>| {
            parent(&mut |value: &mut T| {
                let mut child = accessor.read(value).ok_or(TreeError::Vacant)?;
                f(&mut child)?;
                accessor.write(value, child)
            })
        });

        Writer { commit, modify }
    }

    fn choose<Q>(&self, chooser: Rc<dyn Chooser<T, Q>>) -> Writer<Q>
    where
        Q: Into<T> + 'static,
    {
        let parent = Rc::clone(&self.commit);
        let commit: Commit<Q> = Rc::new(move |chosen: Q| parent(chosen.into()));

        let parent = Rc::clone(&self.modify);
        let modify: Modify<Q> = Rc::new(move |f: &mut Edit<'_, Q>| {
            parent(&mut |value: &mut T| {
                let mut chosen = chooser.choose(value).ok_or(TreeError::Vacant)?;
                f(&mut chosen)?;
                *value = chosen.into();
                Ok(())
            })
        });

        Writer { commit, modify }
    }
}

/// A read-only tree node.
///
/// Obtained from [`readable_tree`], [`Tree::read_only`] or
/// [`Tree::choose`]. Its value only changes through writes elsewhere in the
/// tree or through the root's activation callback.
pub struct ReadableTree<T> {
    node: Node<T>,
}

/// A writable tree node.
///
/// # Example
///
/// ```rust
/// use canopy_core::{field, Tree};
/// use std::{cell::RefCell, rc::Rc};
///
/// #[derive(Clone)]
/// struct Point { x: i32, y: i32 }
///
/// let point = Tree::new(Point { x: 1, y: 2 });
/// let x = point.zoom(field!(Point, x));
///
/// let seen = Rc::new(RefCell::new(Vec::new()));
/// let sink = seen.clone();
/// let _sub = point.subscribe(move |p: &Point| sink.borrow_mut().push((p.x, p.y)));
///
/// x.set(5);
/// assert_eq!(*seen.borrow(), vec![(1, 2), (5, 2)]);
/// ```
pub struct Tree<T> {
    node: Node<T>,
    writer: Writer<T>,
}

impl<T> Clone for ReadableTree<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
        }
    }
}

impl<T> Clone for Tree<T> {
    fn clone(&self) -> Self {
        Self {
            node: self.node.clone(),
            writer: self.writer.clone(),
        }
    }
}

/// Create a read-only tree whose value is driven by `start`.
///
/// `start` runs when the first subscriber arrives and receives a [`Setter`];
/// the returned [`Teardown`] runs when the last subscriber leaves.
pub fn readable_tree<T, F>(value: T, start: F) -> ReadableTree<T>
where
    T: Clone + 'static,
    F: FnMut(Setter<T>) -> Teardown + 'static,
{
    Tree::with_activation(value, start).read_only()
}

/// Create a writable tree over `value`.
pub fn writable_tree<T: Clone + 'static>(value: T) -> Tree<T> {
    Tree::new(value)
}

impl<T: Clone + 'static> ReadableTree<T> {
    /// A read-only tree holding a constant value.
    pub fn new(value: T) -> Self {
        Tree::new(value).read_only()
    }

    /// Subscribe to the visible value. See [`Tree::subscribe`].
    pub fn subscribe<F>(&self, run: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.node.subscribe(Rc::new(run), None)
    }

    /// Subscribe with an invalidation callback. See [`Tree::subscribe_with`].
    pub fn subscribe_with<F, I>(&self, run: F, invalidate: I) -> Subscription
    where
        F: Fn(&T) + 'static,
        I: Fn() + 'static,
    {
        self.node.subscribe(Rc::new(run), Some(Rc::new(invalidate)))
    }

    /// The current visible value. See [`Tree::get`].
    pub fn get(&self) -> Option<T> {
        self.node.get()
    }

    /// Derive a read-only node through `accessor`.
    pub fn zoom<C, A>(&self, accessor: A) -> ReadableTree<C>
    where
        C: Clone + 'static,
        A: Accessor<T, C> + 'static,
    {
        ReadableTree {
            node: self.node.zoom(Rc::new(accessor)),
        }
    }

    /// Derive a read-only node narrowed by `chooser`.
    pub fn choose<Q, Ch>(&self, chooser: Ch) -> ReadableTree<Q>
    where
        Q: Clone + 'static,
        Ch: Chooser<T, Q> + 'static,
    {
        ReadableTree {
            node: self.node.choose(Rc::new(chooser)),
        }
    }

    /// Number of live subscribers in the whole tree.
    pub fn subscriber_count(&self) -> usize {
        self.node.life.count()
    }

    /// Whether the tree's activation is running.
    pub fn is_active(&self) -> bool {
        self.node.life.is_ready()
    }
}

impl<M> ReadableTree<M>
where
    M: Keyed + Clone + 'static,
    M::Key: 'static,
    M::Item: 'static,
{
    /// Derive a read-only node for the item under `key`.
    pub fn zoom_in(&self, key: M::Key) -> ReadableTree<M::Item> {
        self.zoom(lens::key(key))
    }
}

impl<T: Clone + 'static> Tree<T> {
    /// Create a tree over `value` with no activation callback.
    pub fn new(value: T) -> Self {
        Self::from_root(&Root::new(value, None))
    }

    /// Create a tree whose `start` callback runs while it has subscribers.
    ///
    /// `start` receives a [`Setter`] routed into this tree's root. The
    /// returned [`Teardown`] runs when the last subscriber leaves.
    pub fn with_activation<F>(value: T, start: F) -> Self
    where
        F: FnMut(Setter<T>) -> Teardown + 'static,
    {
        Self::from_root(&Root::new(value, Some(Box::new(start))))
    }

    pub(crate) fn from_root(root: &Rc<Root<T>>) -> Self {
        let slot = Rc::clone(root);
        let read: Reader<T> = Rc::new(move || Some(slot.slot.borrow().clone()));

        let slot = Rc::clone(root);
        let commit: Commit<T> = Rc::new(move |value: T| {
            *slot.slot.borrow_mut() = value;
            Ok(())
        });

        // `f` works on a copy: it may read the tree, and a failed write
        // leaves the slot untouched.
        let slot = Rc::clone(root);
        let modify: Modify<T> = Rc::new(move |f: &mut Edit<'_, T>| {
            let mut value = slot.slot.borrow().clone();
            f(&mut value)?;
            *slot.slot.borrow_mut() = value;
            Ok(())
        });

        let mount: Rc<dyn Mount<T>> = Rc::clone(&root.subtree) as Rc<dyn Mount<T>>;
        let base: Rc<dyn Base> = Rc::clone(root) as Rc<dyn Base>;
        let life: Rc<dyn Lifecycle> = Rc::clone(root) as Rc<dyn Lifecycle>;
        Self {
            node: Node {
                read,
                mount,
                base,
                lineage: Lineage::new(),
                life,
            },
            writer: Writer { commit, modify },
        }
    }

    /// A read-only view of this node.
    pub fn read_only(&self) -> ReadableTree<T> {
        ReadableTree {
            node: self.node.clone(),
        }
    }

    /// Subscribe to the visible value.
    ///
    /// `run` is called immediately with the current value, unless the node
    /// currently has none (a key is missing or a chooser refuses), and then
    /// once per committed write that affects this node.
    pub fn subscribe<F>(&self, run: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.node.subscribe(Rc::new(run), None)
    }

    /// Subscribe with an invalidation callback, told that a new value is on
    /// its way before the batch is flushed.
    pub fn subscribe_with<F, I>(&self, run: F, invalidate: I) -> Subscription
    where
        F: Fn(&T) + 'static,
        I: Fn() + 'static,
    {
        self.node.subscribe(Rc::new(run), Some(Rc::new(invalidate)))
    }

    /// The current visible value, or `None` when the node has none.
    ///
    /// An inactive tree is briefly subscribed to so that its activation
    /// callback can populate the value first.
    pub fn get(&self) -> Option<T> {
        self.node.get()
    }

    /// Number of live subscribers in the whole tree.
    pub fn subscriber_count(&self) -> usize {
        self.node.life.count()
    }

    /// Whether the tree's activation is running.
    pub fn is_active(&self) -> bool {
        self.node.life.is_ready()
    }

    /// Write `value` and propagate it.
    ///
    /// Returns `Ok(false)` without doing anything when `value` is
    /// [identical](Identity) to the current value.
    ///
    /// # Errors
    ///
    /// [`TreeError::Vacant`] when an ancestor of this node currently has no
    /// value, so there is nothing to write into. [`TreeError::OutOfRange`]
    /// or [`TreeError::Mismatch`] when an accessor on the way cannot hold the
    /// value. Nothing is committed or propagated on error.
    pub fn try_set(&self, value: T) -> Result<bool>
    where
        T: Identity,
    {
        if let Some(current) = (self.node.read)() {
            if current.identical(&value) {
                tracing::trace!("write gated as unchanged");
                return Ok(false);
            }
        }
        (self.writer.commit)(value)?;
        self.node.propagate();
        Ok(true)
    }

    /// Write `value` and propagate it.
    ///
    /// # Panics
    ///
    /// If the write cannot be committed; see [`try_set`](Tree::try_set).
    #[track_caller]
    pub fn set(&self, value: T)
    where
        T: Identity,
    {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    /// Replace the value with `f(current)`.
    ///
    /// A node with no current value is left alone: `f` is not called and
    /// `false` is returned. Otherwise returns whether the result was
    /// committed.
    pub fn update<F>(&self, f: F) -> bool
    where
        T: Identity,
        F: FnOnce(T) -> T,
    {
        let Some(current) = (self.node.read)() else {
            return false;
        };
        matches!(self.try_set(f(current)), Ok(true))
    }

    /// Mutate the value in place and propagate, bypassing the equality gate.
    ///
    /// `f` runs on a copy of the root's value, so it may read the tree; the
    /// copy is stored once `f` returns.
    ///
    /// # Errors
    ///
    /// [`TreeError::Vacant`] when the node currently has no value, or any
    /// error of [`try_set`](Tree::try_set) raised while writing back.
    pub fn modify<F>(&self, f: F) -> Result<()>
    where
        F: FnOnce(&mut T),
    {
        let mut f = Some(f);
        (self.writer.modify)(&mut |value: &mut T| {
            if let Some(f) = f.take() {
                f(value);
            }
            Ok(())
        })?;
        self.node.propagate();
        Ok(())
    }

    /// Derive a writable node through `accessor`.
    pub fn zoom<C, A>(&self, accessor: A) -> Tree<C>
    where
        C: Clone + 'static,
        A: Accessor<T, C> + 'static,
    {
        let accessor: Rc<dyn Accessor<T, C>> = Rc::new(accessor);
        Tree {
            node: self.node.zoom(Rc::clone(&accessor)),
            writer: self.writer.zoom(accessor),
        }
    }

    /// Derive a read-only node narrowed by `chooser`.
    pub fn choose<Q, Ch>(&self, chooser: Ch) -> ReadableTree<Q>
    where
        Q: Clone + 'static,
        Ch: Chooser<T, Q> + 'static,
    {
        ReadableTree {
            node: self.node.choose(Rc::new(chooser)),
        }
    }

    /// Derive a writable node narrowed by `chooser`.
    ///
    /// Writes convert the narrowed value back with `Into` and go straight to
    /// this node, so they succeed even while the chooser refuses the current
    /// value.
    pub fn choose_writable<Q, Ch>(&self, chooser: Ch) -> Tree<Q>
    where
        Q: Clone + Into<T> + 'static,
        Ch: Chooser<T, Q> + 'static,
    {
        let chooser: Rc<dyn Chooser<T, Q>> = Rc::new(chooser);
        Tree {
            node: self.node.choose(Rc::clone(&chooser)),
            writer: self.writer.choose(chooser),
        }
    }

    /// Derive a writable node showing only values that satisfy `predicate`.
    pub fn filter<F>(&self, predicate: F) -> Tree<T>
    where
        F: Fn(&T) -> bool + 'static,
    {
        self.choose_writable(move |value: &T| predicate(value).then(|| value.clone()))
    }
}

impl<M> Tree<M>
where
    M: Keyed + Clone + 'static,
    M::Key: 'static,
    M::Item: 'static,
{
    /// Derive a writable node for the item under `key`.
    ///
    /// The node has no value while the key is missing; writing it inserts
    /// the key.
    pub fn zoom_in(&self, key: M::Key) -> Tree<M::Item> {
        self.zoom(lens::key(key))
    }
}

impl<T: Clone + Debug + 'static> Debug for Tree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tree")
            .field("value", &(self.node.read)())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl<T: Clone + Debug + 'static> Debug for ReadableTree<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadableTree")
            .field("value", &(self.node.read)())
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Store contract
// ----------------------------------------------------------------------------

/// A subscribable value container.
///
/// Every subscription is delivered the current value synchronously when it
/// is made, unless there is no current value.
pub trait Readable<T> {
    fn subscribe<F>(&self, run: F) -> Subscription
    where
        F: Fn(&T) + 'static;

    fn subscribe_with<F, I>(&self, run: F, invalidate: I) -> Subscription
    where
        F: Fn(&T) + 'static,
        I: Fn() + 'static;

    fn get(&self) -> Option<T>;
}

/// A subscribable value container that can be written.
pub trait Writable<T>: Readable<T> {
    fn try_set(&self, value: T) -> Result<bool>;

    /// # Panics
    ///
    /// If [`try_set`](Writable::try_set) fails.
    #[track_caller]
    fn set(&self, value: T) {
        if let Err(err) = self.try_set(value) {
            panic!("{err}");
        }
    }

    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(T) -> T;
}

impl<T: Clone + 'static> Readable<T> for ReadableTree<T> {
    fn subscribe<F>(&self, run: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        ReadableTree::subscribe(self, run)
    }

    fn subscribe_with<F, I>(&self, run: F, invalidate: I) -> Subscription
    where
        F: Fn(&T) + 'static,
        I: Fn() + 'static,
    {
        ReadableTree::subscribe_with(self, run, invalidate)
    }

    fn get(&self) -> Option<T> {
        ReadableTree::get(self)
    }
}

impl<T: Clone + 'static> Readable<T> for Tree<T> {
    fn subscribe<F>(&self, run: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        Tree::subscribe(self, run)
    }

    fn subscribe_with<F, I>(&self, run: F, invalidate: I) -> Subscription
    where
        F: Fn(&T) + 'static,
        I: Fn() + 'static,
    {
        Tree::subscribe_with(self, run, invalidate)
    }

    fn get(&self) -> Option<T> {
        Tree::get(self)
    }
}

impl<T: Clone + Identity + 'static> Writable<T> for Tree<T> {
    fn try_set(&self, value: T) -> Result<bool> {
        Tree::try_set(self, value)
    }

    fn update<F>(&self, f: F) -> bool
    where
        F: FnOnce(T) -> T,
    {
        Tree::update(self, f)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
