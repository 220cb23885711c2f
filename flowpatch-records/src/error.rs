//! Error types for loading and saving record collections.

use thiserror::Error;

/// The input could not be read as an array of identified records.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum MalformedInputError {
    #[error("invalid JSON at line {line}, column {column}: {message}")]
    Json {
        line: usize,
        column: usize,
        message: String,
    },

    #[error("expected a JSON array of records, found {found}")]
    NotAnArray { found: &'static str },

    #[error("record #{index} is not an object (found {found})")]
    NotAnObject { index: usize, found: &'static str },

    #[error("record #{index} has no `{field}` field")]
    MissingIdentifier { index: usize, field: String },

    #[error("record #{index} has a non-string `{field}` field")]
    IdentifierNotString { index: usize, field: String },
}

impl MalformedInputError {
    /// Index of the offending record, when the failure is tied to one.
    pub fn record_index(&self) -> Option<usize> {
        match self {
            MalformedInputError::NotAnObject { index, .. }
            | MalformedInputError::MissingIdentifier { index, .. }
            | MalformedInputError::IdentifierNotString { index, .. } => Some(*index),
            MalformedInputError::Json { .. } | MalformedInputError::NotAnArray { .. } => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("malformed input: {0}")]
    Malformed(#[from] MalformedInputError),
}

#[derive(Debug, Error)]
pub enum SaveError {
    /// Nothing was written; the destination is untouched.
    #[error("serialization error: {message}")]
    Serialization { message: String },

    /// The write failed; the destination keeps its previous contents.
    #[error("io error writing {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
