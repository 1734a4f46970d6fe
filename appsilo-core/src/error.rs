//! Error kinds for catalog operations

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

/// Errors produced by the catalog engine
#[derive(Error, Debug)]
pub enum CatalogError {
    /// The silo bytes could not be decoded. The previous snapshot, if any, stays usable.
    #[error("corrupt silo index: {reason}")]
    CorruptIndex { reason: String },

    /// A component node has no usable `<id>`
    #[error("component has no identifier")]
    MissingIdentifier,

    /// The cancellation token fired while a query was running
    #[error("operation was cancelled")]
    Cancelled,

    /// One sub-field of a component is invalid
    #[error("malformed entry: {reason}")]
    MalformedEntry { reason: String },

    /// Failed to read or write a silo file
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to serialize a silo payload
    #[error("failed to encode silo")]
    Encode(#[source] bincode::Error),

    /// A catalog source document could not be parsed
    #[error("failed to parse catalog source")]
    Source(#[from] serde_yaml_ng::Error),
}

impl CatalogError {
    pub(crate) fn corrupt(reason: impl Into<String>) -> Self {
        CatalogError::CorruptIndex {
            reason: reason.into(),
        }
    }

    pub(crate) fn malformed(reason: impl Into<String>) -> Self {
        CatalogError::MalformedEntry {
            reason: reason.into(),
        }
    }
}
