//! Error types for tree writes.

use thiserror::Error;

/// Errors raised by writes into a tree.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TreeError {
    /// An accessor or chooser between the written node and the root currently
    /// refuses, so there is no parent value to write into.
    #[error("cannot write through a vacant branch: an ancestor currently has no value")]
    Vacant,

    /// An indexed write landed past the end of a sequence. Writing at
    /// exactly `len` appends; anything further is refused.
    #[error("index {index} is out of range for a sequence of length {len}")]
    OutOfRange { index: usize, len: usize },

    /// The parent value has the wrong shape for the write.
    #[error("cannot write into a value that is not {expected}")]
    Mismatch { expected: &'static str },
}

/// Result type for tree operations.
pub type Result<T> = std::result::Result<T, TreeError>;
