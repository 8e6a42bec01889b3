//! Keyed-collection accessors.
//!
//! Two accessors are offered over any [`Keyed`] collection:
//!
//! - [`key`] treats a missing key as absent. Writing inserts or overwrites.
//! - [`entry`] is total over `Option<V>`: a missing key reads as `None`, and
//!   writing `None` deletes the key.

use std::collections::{BTreeMap, HashMap};
use std::hash::{BuildHasher, Hash};

use indexmap::IndexMap;

use super::Accessor;
use crate::error::{Result, TreeError};

/// A collection addressable by key.
pub trait Keyed {
    type Key: Clone;
    type Item: Clone;

    fn lookup(&self, key: &Self::Key) -> Option<&Self::Item>;

    /// Insert or overwrite the item under `key`.
    ///
    /// # Errors
    ///
    /// When the collection cannot hold an item under `key`; it is left
    /// unchanged.
    fn store(&mut self, key: Self::Key, item: Self::Item) -> Result<()>;

    fn discard(&mut self, key: &Self::Key);
}

impl<K, V, S> Keyed for HashMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    type Key = K;
    type Item = V;

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn store(&mut self, key: K, item: V) -> Result<()> {
        self.insert(key, item);
        Ok(())
    }

    fn discard(&mut self, key: &K) {
        self.remove(key);
    }
}

impl<K, V> Keyed for BTreeMap<K, V>
where
    K: Clone + Ord,
    V: Clone,
{
    type Key = K;
    type Item = V;

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn store(&mut self, key: K, item: V) -> Result<()> {
        self.insert(key, item);
        Ok(())
    }

    fn discard(&mut self, key: &K) {
        self.remove(key);
    }
}

impl<K, V, S> Keyed for IndexMap<K, V, S>
where
    K: Clone + Eq + Hash,
    V: Clone,
    S: BuildHasher,
{
    type Key = K;
    type Item = V;

    fn lookup(&self, key: &K) -> Option<&V> {
        self.get(key)
    }

    fn store(&mut self, key: K, item: V) -> Result<()> {
        self.insert(key, item);
        Ok(())
    }

    // Order of the remaining entries is preserved.
    fn discard(&mut self, key: &K) {
        self.shift_remove(key);
    }
}

/// Vectors are keyed by index. Storing at `len()` appends; storing past the
/// end fails with [`TreeError::OutOfRange`], and discarding removes the
/// element.
impl<V: Clone> Keyed for Vec<V> {
    type Key = usize;
    type Item = V;

    fn lookup(&self, key: &usize) -> Option<&V> {
        self.get(*key)
    }

    fn store(&mut self, key: usize, item: V) -> Result<()> {
        match key.cmp(&self.len()) {
            std::cmp::Ordering::Less => self[key] = item,
            std::cmp::Ordering::Equal => self.push(item),
            std::cmp::Ordering::Greater => {
                tracing::debug!(index = key, len = self.len(), "write past the end of a vector");
                return Err(TreeError::OutOfRange {
                    index: key,
                    len: self.len(),
                });
            }
        }
        Ok(())
    }

    fn discard(&mut self, key: &usize) {
        if *key < self.len() {
            self.remove(*key);
        }
    }
}

/// Accessor for the item stored under a key; absent when the key is missing.
#[derive(Debug, Clone)]
pub struct Key<K>(K);

/// Accessor for the item under `key`. A missing key reads as absent, so
/// nodes zoomed through it deliver nothing until the key appears.
pub fn key<K>(key: K) -> Key<K> {
    Key(key)
}

impl<M: Keyed> Accessor<M, M::Item> for Key<M::Key> {
    fn read(&self, parent: &M) -> Option<M::Item> {
        parent.lookup(&self.0).cloned()
    }

    fn write(&self, parent: &mut M, child: M::Item) -> Result<()> {
        parent.store(self.0.clone(), child)
    }
}

/// Total accessor over `Option<Item>` for a key.
#[derive(Debug, Clone)]
pub struct Entry<K>(K);

/// Accessor for `Option<Item>` under `key`. Writing `None` removes the key.
pub fn entry<K>(key: K) -> Entry<K> {
    Entry(key)
}

impl<M: Keyed> Accessor<M, Option<M::Item>> for Entry<M::Key> {
    fn read(&self, parent: &M) -> Option<Option<M::Item>> {
        Some(parent.lookup(&self.0).cloned())
    }

    fn write(&self, parent: &mut M, child: Option<M::Item>) -> Result<()> {
        match child {
            Some(item) => parent.store(self.0.clone(), item),
            None => {
                parent.discard(&self.0);
                Ok(())
            }
        }
    }
}
