//! In-memory store error types.

use thiserror::Error;

use crate::context::ContextError;
use crate::uow::UnitOfWorkError;

/// Result type for in-memory store operations.
pub type MemoryResult<T> = Result<T, MemoryError>;

/// Errors that can occur in the in-memory store.
#[derive(Debug, Error)]
pub enum MemoryError {
    /// The caller's context was cancelled or timed out.
    #[error("{0}")]
    Context(#[from] ContextError),

    /// The transaction was already committed or rolled back.
    #[error("tx is closed: {tx_id}")]
    TxClosed { tx_id: String },

    /// A write was attempted in a read-only transaction.
    #[error("transaction {tx_id} is read-only")]
    ReadOnly { tx_id: String },

    /// Serialization failure - the store changed after the transaction began.
    #[error("could not serialize transaction {tx_id}: store changed since it began")]
    Conflict { tx_id: String },

    /// Failure reported by the unit of work driving this store.
    #[error(transparent)]
    UnitOfWork(#[from] UnitOfWorkError),
}

impl MemoryError {
    /// Check if this error is retryable.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MemoryError::Conflict { .. })
    }
}
