//! Error types for flowpatch-edit.
//!
//! Only structural problems are errors. A rule that cannot find its record or anchor is not an
//! error; it is reported as a `SkipReason` in the `ApplyReport`.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PatchError {
    /// A targeted identifier occurs on more than one record.
    #[error("collection integrity error: identifier `{identifier}` is shared by {count} records")]
    CollectionIntegrity { identifier: String, count: usize },

    /// A rule cannot be evaluated at all.
    #[error("invalid rule {label}: {message}")]
    InvalidRule { label: String, message: String },
}

impl PatchError {
    /// Identifier of the offending record, when there is one.
    pub fn identifier(&self) -> Option<&str> {
        match self {
            PatchError::CollectionIntegrity { identifier, .. } => Some(identifier),
            PatchError::InvalidRule { .. } => None,
        }
    }
}

/// Result type alias using PatchError.
pub type PatchResult<T> = Result<T, PatchError>;
