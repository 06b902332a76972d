use std::path::PathBuf;

use thiserror::Error;

/// Failure to read or write the durable task collection.
///
/// Returned to the caller as a recoverable condition; the in-memory
/// collection stays authoritative when a write fails.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("Failed to (de)serialize tasks: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Stored task data is invalid: {0}")]
    Corrupt(String),
    #[error("Task storage could not be opened: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        StorageError::Io {
            path: path.into(),
            source,
        }
    }
}
