//! Accessor/Chooser Algebra
//!
//! Pure descriptors between a parent value and a derived child value:
//!
//! - [`Accessor`]: read/write path; reads may be absent (`None`).
//! - [`Chooser`]: read-only narrowing that may refuse a value (`None`).
//!
//! Absent and refused are the same thing from the tree's point of view:
//! the branch currently has no value, so nothing is delivered on it or
//! below it.

mod accessor;
mod chooser;
mod keyed;
#[cfg(feature = "json")]
pub mod json;

pub use accessor::{accessor, field, Accessor, Field, FnAccessor, Then};
pub use chooser::{present, when, Chooser};
pub use keyed::{entry, key, Entry, Key, Keyed};
