//! Accessors over `serde_json::Value`, for trees whose shape is only known
//! at runtime.
//!
//! Both accessors read as absent when the member or element is missing or
//! when the parent has the wrong shape. Writes into a parent of the wrong
//! shape fail with [`TreeError::Mismatch`].

use serde_json::{Map, Value};

use super::Accessor;
use crate::error::{Result, TreeError};

/// Accessor for an object member.
#[derive(Debug, Clone)]
pub struct Member(String);

/// Accessor for the member `name` of a JSON object.
///
/// Writing into `null` turns it into an object holding only that member.
/// Writing into any other non-object value fails.
pub fn member(name: impl Into<String>) -> Member {
    Member(name.into())
}

impl Accessor<Value, Value> for Member {
    fn read(&self, parent: &Value) -> Option<Value> {
        parent.as_object()?.get(&self.0).cloned()
    }

    fn write(&self, parent: &mut Value, child: Value) -> Result<()> {
        if parent.is_null() {
            *parent = Value::Object(Map::new());
        }
        let object = parent.as_object_mut().ok_or(TreeError::Mismatch {
            expected: "an object",
        })?;
        object.insert(self.0.clone(), child);
        Ok(())
    }
}

/// Accessor for an array element.
#[derive(Debug, Clone, Copy)]
pub struct Element(usize);

/// Accessor for the element at `index` of a JSON array.
///
/// Writing at `len()` appends; writing further out fails with
/// [`TreeError::OutOfRange`].
pub fn element(index: usize) -> Element {
    Element(index)
}

impl Accessor<Value, Value> for Element {
    fn read(&self, parent: &Value) -> Option<Value> {
        parent.as_array()?.get(self.0).cloned()
    }

    fn write(&self, parent: &mut Value, child: Value) -> Result<()> {
        let array = parent.as_array_mut().ok_or(TreeError::Mismatch {
            expected: "an array",
        })?;
        if self.0 < array.len() {
            array[self.0] = child;
        } else if self.0 == array.len() {
            array.push(child);
        } else {
            return Err(TreeError::OutOfRange {
                index: self.0,
                len: array.len(),
            });
        }
        Ok(())
    }
}
