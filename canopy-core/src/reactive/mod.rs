//! Reactive Trees
//!
//! This module implements the store side of Canopy: writable and read-only
//! trees, their subscriptions, lazy activation and batched delivery.
//!
//! # Concepts
//!
//! ## Trees
//!
//! A [`Tree`] is a container for one value that can be split into derived
//! nodes. Derived nodes own no state: they read and write through their
//! parent with an accessor or a chooser from [`crate::lens`].
//!
//! ## Subscriptions
//!
//! Subscribing to any node delivers its current value immediately and then
//! every new value written anywhere on its path to the root or below it.
//! Siblings never see each other's writes.
//!
//! ## Activation
//!
//! A tree created with [`Tree::with_activation`] or [`readable_tree`] runs
//! its start callback while it has at least one subscriber, on any node.
//!
//! # Implementation Notes
//!
//! Writes do not deliver inline. The deliveries of one write are computed
//! breadth-first by [`crate::graph`], queued by `batch` as they are found and
//! flushed by the outermost write, which also serialises writes made from
//! inside listeners.

mod activation;
mod batch;
mod subscriber;
mod tree;

pub(crate) use batch::{enqueue, Delivery};
#[cfg(test)]
pub(crate) use batch::dispatch;

pub use activation::{Setter, Teardown};
pub use batch::in_batch;
pub use subscriber::{SubscriberId, Subscription};
pub use tree::{readable_tree, writable_tree, Readable, ReadableTree, Tree, Writable};
