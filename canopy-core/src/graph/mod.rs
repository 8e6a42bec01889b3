//! Subscriber Graph
//!
//! This module implements the live dependency structure behind a tree and
//! the traversal that turns one write into an ordered batch of deliveries.
//!
//! # Overview
//!
//! The graph is rooted at the tree's root value:
//!
//! - Every structural node (root or accessor-derived) owns a subtree of
//!   direct listeners and child edges.
//! - Chosen nodes share the subtree of the node they narrow and filter what
//!   they register through their chooser.
//! - Derived nodes keep an ordered lineage of their ancestors' bases, captured
//!   at derivation time, instead of pointers back into parent state.
//!
//! When a node is written, the scheduler notifies the lineage (ancestors,
//! nearest first), then the node itself, then its descendants breadth-first.

mod node;
mod scheduler;

pub(crate) use node::{Anchor, Base, Mount, Narrowed, Reader, Subtree, Watch, Zoomed};
pub(crate) use scheduler::{propagate, Lineage, Wave};
