//! Execution context error types.

use thiserror::Error;

/// Result type for context checks.
pub type ContextResult<T> = Result<T, ContextError>;

/// Why a context is done.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum ContextError {
    /// The context (or one of its ancestors) was cancelled.
    #[error("context cancelled")]
    Cancelled,

    /// The effective deadline has passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}
