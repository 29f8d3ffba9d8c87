//! Error types for the cache
//!
//! Provides unified error handling using thiserror. These errors stay inside
//! the crate's storage layers; the public lifecycle operations on
//! [`CacheStore`](crate::cache::CacheStore) log them and degrade to a miss.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Filesystem operation failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Payload or document could not be serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Namespace cannot be used as a directory name
    #[error("Invalid namespace: {0:?}")]
    InvalidNamespace(String),

    /// On-disk file exists but cannot be parsed
    #[error("Corrupt cache file {path}: {reason}")]
    Corrupt { path: PathBuf, reason: String },
}

impl CacheError {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache.
pub type Result<T> = std::result::Result<T, CacheError>;
