//! Batch Dispatch
//!
//! Deliveries are queued the moment the traversal computes them and flushed
//! in order. A write issued while another write is being propagated or
//! flushed (typically from inside a listener) does not flush on its own: its
//! deliveries land in the same queue, behind everything computed before it,
//! and are picked up by the flush loop already running further up the stack.
//!
//! # Implementation
//!
//! The queue lives in a thread-local, like any single-threaded reactive
//! context. The outermost write claims a [`FlushGuard`]; the guard drains
//! the queue and, when dropped (even on unwind), leaves the queue empty and
//! unclaimed so the next write starts a fresh batch.

use std::cell::RefCell;
use std::collections::VecDeque;

/// A pending listener call with its value already bound.
pub(crate) type Delivery = Box<dyn FnOnce()>;

thread_local! {
    static QUEUE: RefCell<DeliveryQueue> = RefCell::new(DeliveryQueue::default());
}

#[derive(Default)]
struct DeliveryQueue {
    pending: VecDeque<Delivery>,
    claimed: bool,
}

/// Proof that the current write owns the batch and must flush it.
struct FlushGuard {
    _private: (),
}

impl FlushGuard {
    /// Claim the batch if no other write currently owns it.
    fn claim() -> Option<Self> {
        QUEUE.with(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.claimed {
                None
            } else {
                queue.claimed = true;
                Some(Self { _private: () })
            }
        })
    }

    fn flush(self) {
        let mut delivered = 0usize;
        // The borrow is released before each call: listeners may append.
        while let Some(delivery) = QUEUE.with(|queue| queue.borrow_mut().pending.pop_front()) {
            delivery();
            delivered += 1;
        }
        tracing::debug!(delivered, "flushed batch");
    }
}

impl Drop for FlushGuard {
    fn drop(&mut self) {
        let _ = QUEUE.try_with(|queue| {
            let leftover = {
                let mut queue = queue.borrow_mut();
                queue.claimed = false;
                std::mem::take(&mut queue.pending)
            };
            drop(leftover);
        });
    }
}

/// Run one write's propagation. `traverse` pushes its deliveries through
/// [`enqueue`] as it goes; the outermost write then flushes the whole queue.
pub(crate) fn dispatch<F>(traverse: F)
where
    F: FnOnce(),
{
    let owner = FlushGuard::claim();
    traverse();
    if let Some(guard) = owner {
        guard.flush();
    }
}

/// Queue a delivery behind every delivery already pending.
pub(crate) fn enqueue(delivery: Delivery) {
    QUEUE.with(|queue| queue.borrow_mut().pending.push_back(delivery));
}

/// Whether a batch is currently being propagated or flushed on this thread.
pub fn in_batch() -> bool {
    QUEUE.with(|queue| queue.borrow().claimed)
}
