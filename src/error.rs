//! Crate-wide error type
//!
//! The traversal core never surfaces typed errors across the dir_op/file_op
//! callback boundary (see `scheduler::wrapper`): a failing user op is fatal
//! and terminates the process. This `Error` type is used everywhere *else* —
//! scheduling setup, classification, reparse decoding, and the consumer
//! helper functions that user ops are built out of.

use std::path::PathBuf;

/// Library-wide result alias.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the traversal core and its consumers.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An I/O operation failed for a specific path.
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the failing operation was performed on.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },

    /// A root path passed to `traverse` does not exist.
    #[error("path not found: {}", .0.display())]
    NotFound(PathBuf),

    /// A path was required to be a directory but was not.
    #[error("{} is not a directory", .0.display())]
    NotADirectory(PathBuf),

    /// Reparse-point decoding failed or is unsupported on this platform.
    #[error("failed to decode reparse point: {0}")]
    Reparse(String),

    /// A consumer-level operation failed for a reason other than a bare I/O error.
    #[error("operation failed: {0}")]
    OperationFailed(String),

    /// The worker pool's channel was closed while a task was still being submitted.
    #[error("worker pool is shut down")]
    PoolShutdown,
}

impl Error {
    /// Build an [`Error::Io`] tying a path to the `std::io::Error` that occurred on it.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
