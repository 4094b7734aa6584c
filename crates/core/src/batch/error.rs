//! Batch setup errors.

use thiserror::Error;

/// Errors that prevent a batch from starting.
///
/// Per-file failures never surface here; they stay in their outcome.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BatchError {
    /// Concurrency must be at least one.
    #[error("batch concurrency must be at least 1, got {0}")]
    InvalidConcurrency(usize),

    /// Workers need a Tokio runtime to be spawned on.
    #[error("batch must be started from within a Tokio runtime")]
    NoRuntime,
}
