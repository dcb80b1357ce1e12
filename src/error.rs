use std::io;
use thiserror::Error;

/// Error type for pool operations.
///
/// Failures of the jobs themselves are never reported here; they travel
/// inside [`JobResult`](crate::JobResult).
#[derive(Error, Debug)]
pub enum PoolError {
    /// A pool needs at least one worker.
    #[error("worker count must be at least 1")]
    InvalidWorkerCount,

    /// The pool was constructed without auto-start and `init` was never called.
    #[error("pool has not been started")]
    NotStarted,

    /// The pool is draining its queue for `close` or `wait`.
    #[error("pool is draining")]
    Draining,

    /// The pool was closed and accepts no more work.
    #[error("pool is closed")]
    Closed,

    /// The worker dropped a reply channel without answering.
    #[error("result channel disconnected")]
    Disconnected,

    /// IO error from thread spawning or sockets.
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Serialization/deserialization error.
    #[error("Serde error: {0}")]
    Serde(#[from] serde_json::Error),

    /// Error from the sled database.
    #[error("Sled error: {0}")]
    Sled(#[from] sled::Error),

    /// Error with a plain string message.
    #[error("{0}")]
    StringError(String),
}

/// Result type alias for pool operations.
pub type Result<T> = std::result::Result<T, PoolError>;
