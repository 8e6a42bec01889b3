//! Equality Gate
//!
//! Every write is gated on whether the new value differs from the value the
//! node currently shows. The comparison is shallow:
//!
//! - Scalars (numbers, booleans, characters, strings) compare by value.
//! - Shared pointers (`Rc`, `Arc`) compare by address.
//! - Compound values (collections, user structs) are never identical, so
//!   writing a freshly built value always propagates, even when it is equal
//!   field by field to the current one.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;
use std::sync::Arc;

use indexmap::IndexMap;

/// Shallow identity used to decide whether a write changes anything.
///
/// The provided method reports "never identical", which is the right choice
/// for compound user types:
///
/// ```rust
/// use canopy_core::Identity;
///
/// #[derive(Clone)]
/// struct Point { x: i32, y: i32 }
///
/// impl Identity for Point {}
/// ```
pub trait Identity {
    /// Returns `true` when writing `other` over `self` is a no-op.
    fn identical(&self, other: &Self) -> bool {
        let _ = other;
        false
    }
}

macro_rules! identity_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl Identity for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other
                }
            }
        )*
    };
}

identity_by_value!(
    (), bool, char, u8, u16, u32, u64, u128, usize, i8, i16, i32, i64, i128, isize, String,
    &'static str,
);

// NaN is treated as identical to itself so that re-writing NaN is a no-op.
macro_rules! identity_float {
    ($($ty:ty),*) => {
        $(
            impl Identity for $ty {
                #[inline]
                fn identical(&self, other: &Self) -> bool {
                    self == other || (self.is_nan() && other.is_nan())
                }
            }
        )*
    };
}

identity_float!(f32, f64);

impl<T: ?Sized> Identity for Rc<T> {
    fn identical(&self, other: &Self) -> bool {
        Rc::ptr_eq(self, other)
    }
}

impl<T: ?Sized> Identity for Arc<T> {
    fn identical(&self, other: &Self) -> bool {
        Arc::ptr_eq(self, other)
    }
}

impl<T: Identity> Identity for Option<T> {
    fn identical(&self, other: &Self) -> bool {
        match (self, other) {
            (None, None) => true,
            (Some(a), Some(b)) => a.identical(b),
            _ => false,
        }
    }
}

impl<T> Identity for Vec<T> {}
impl<T> Identity for VecDeque<T> {}
impl<K, V, S> Identity for HashMap<K, V, S> {}
impl<K, V> Identity for BTreeMap<K, V> {}
impl<K, V, S> Identity for IndexMap<K, V, S> {}

#[cfg(feature = "json")]
impl Identity for serde_json::Value {
    fn identical(&self, other: &Self) -> bool {
        use serde_json::Value;

        match (self, other) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            _ => false,
        }
    }
}
