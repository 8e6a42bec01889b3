//! Canopy Core
//!
//! This crate provides hierarchical reactive stores. A single root value is
//! held in a [`Tree`]; any part of it can be carved out as a derived tree
//! that reads and writes through its parent, and every subscriber sees each
//! write that touches its part of the value exactly once, in a predictable
//! order.
//!
//! It implements:
//!
//! - Writable and read-only trees with Svelte-style subscriptions
//! - Zooming through accessors (fields, map keys, JSON members)
//! - Choosing through choosers that may refuse the current value
//! - Lazy activation of a tree's data source
//! - Batched, breadth-first propagation with reentrant writes
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `lens`: accessors and choosers, pure descriptors of a derivation
//! - `reactive`: trees, subscriptions, activation and batch delivery
//! - `graph`: the subscriber graph and the propagation order
//!
//! # Example
//!
//! ```rust
//! use canopy_core::prelude::*;
//! use std::collections::HashMap;
//! use std::{cell::RefCell, rc::Rc};
//!
//! let scores = Tree::new(HashMap::from([("ann".to_string(), 1)]));
//! let ann = scores.zoom_in("ann".to_string());
//! let bob = scores.zoom_in("bob".to_string());
//!
//! let seen = Rc::new(RefCell::new(Vec::new()));
//! let sink = seen.clone();
//! let _sub = bob.subscribe(move |v: &i32| sink.borrow_mut().push(*v));
//!
//! // A sibling write is not delivered to `bob`.
//! ann.set(2);
//! bob.set(10);
//! assert_eq!(*seen.borrow(), vec![10]);
//! ```

pub mod lens;
pub mod reactive;
pub(crate) mod graph;

mod error;
mod gate;

pub use error::{Result, TreeError};
pub use gate::Identity;
pub use reactive::{
    in_batch, readable_tree, writable_tree, Readable, ReadableTree, Setter, SubscriberId,
    Subscription, Teardown, Tree, Writable,
};

/// Everything needed to build and use trees.
pub mod prelude {
    pub use crate::lens::{accessor, entry, key, present, when, Accessor, Chooser, Keyed};
    pub use crate::{
        field, readable_tree, writable_tree, Identity, Readable, ReadableTree, Setter,
        Subscription, Teardown, Tree, TreeError, Writable,
    };
}
