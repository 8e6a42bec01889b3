//! Propagation Scheduler
//!
//! Computes the deliveries caused by one committed write. The traversal runs
//! in three phases over the subscriber tree:
//!
//! 1. Ancestors, nearest first: each ancestor offers its current value to
//!    its own listeners. Ancestors never descend, so siblings of the written
//!    node are not visited.
//! 2. Self: the written node's structural base offers its value to its
//!    listeners (including every chosen view sharing that base).
//! 3. Descendants, breadth-first: children are visited level by level in
//!    registration order. A child whose accessor or chooser comes back empty
//!    is pruned together with everything below it.
//!
//! Deliveries go straight into the batch queue of `reactive::batch` as they
//! are computed; running them is the dispatcher's job.

use std::collections::VecDeque;
use std::rc::Rc;

use smallvec::SmallVec;

use super::node::Base;
use crate::reactive::{enqueue, Delivery};

/// Ancestor bases of a node, nearest first.
pub(crate) type Lineage = SmallVec<[Rc<dyn Base>; 4]>;

type Visit = Box<dyn FnOnce(&mut Wave)>;

/// Traversal state for a single write: the pending breadth-first frontier.
pub(crate) struct Wave {
    frontier: VecDeque<Visit>,
}

impl Wave {
    pub fn new() -> Self {
        Self {
            frontier: VecDeque::new(),
        }
    }

    /// Append a delivery to the running batch.
    pub fn deliver(&mut self, delivery: Delivery) {
        enqueue(delivery);
    }

    /// Schedule a visit after everything already on the frontier.
    pub fn defer<F>(&mut self, visit: F)
    where
        F: FnOnce(&mut Wave) + 'static,
    {
        self.frontier.push_back(Box::new(visit));
    }

    /// Drain the frontier.
    pub fn finish(mut self) {
        while let Some(visit) = self.frontier.pop_front() {
            visit(&mut self);
        }
    }
}

impl Default for Wave {
    fn default() -> Self {
        Self::new()
    }
}

/// Queue the deliveries for a write on the node anchored at `base`. Must run
/// inside `reactive::batch::dispatch`.
pub(crate) fn propagate(lineage: &[Rc<dyn Base>], base: &dyn Base) {
    let mut wave = Wave::new();
    for ancestor in lineage {
        ancestor.announce(&mut wave);
    }
    base.cascade(&mut wave);
    wave.finish()
}
