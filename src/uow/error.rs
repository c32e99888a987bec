//! Unit-of-work error types.

use std::error::Error as StdError;
use std::sync::Arc;

use thiserror::Error;

/// Result type for unit-of-work operations.
pub type UowResult<T> = Result<T, UnitOfWorkError>;

/// Boxed error produced by a transactional resource.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Start errors are cached and handed out on every later resolver call.
pub type SharedError = Arc<dyn StdError + Send + Sync + 'static>;

/// Errors surfaced by the unit-of-work core.
///
/// Resource errors are carried opaquely: their `Display` output is exactly
/// what the resource reported. The only text this crate adds is a caller
/// supplied prefix via [`UnitOfWorkError::Wrapped`].
#[derive(Debug, Error)]
pub enum UnitOfWorkError {
    /// The transaction could not be started.
    #[error(transparent)]
    Begin(SharedError),

    /// The transaction failed to commit.
    #[error(transparent)]
    Commit(BoxError),

    /// The transaction failed to roll back.
    #[error(transparent)]
    Rollback(BoxError),

    /// An error prefixed with a caller supplied message.
    #[error("{message}: {source}")]
    Wrapped {
        message: String,
        source: Box<UnitOfWorkError>,
    },
}

impl UnitOfWorkError {
    /// Prefix this error with `message`, rendering as `"message: <self>"`.
    pub fn wrap(self, message: impl Into<String>) -> Self {
        UnitOfWorkError::Wrapped {
            message: message.into(),
            source: Box::new(self),
        }
    }

    /// The error with any wrapping removed.
    pub fn root(&self) -> &UnitOfWorkError {
        match self {
            UnitOfWorkError::Wrapped { source, .. } => source.root(),
            other => other,
        }
    }

    /// Check if this error came from starting the transaction.
    pub fn is_begin(&self) -> bool {
        matches!(self.root(), UnitOfWorkError::Begin(_))
    }

    /// Check if this error came from committing.
    pub fn is_commit(&self) -> bool {
        matches!(self.root(), UnitOfWorkError::Commit(_))
    }

    /// Check if this error came from rolling back.
    pub fn is_rollback(&self) -> bool {
        matches!(self.root(), UnitOfWorkError::Rollback(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(msg: &str) -> BoxError {
        msg.to_string().into()
    }

    #[test]
    fn test_display_is_verbatim() {
        let err = UnitOfWorkError::Commit(boxed("failed to commit unit-of-work"));
        assert_eq!(err.to_string(), "failed to commit unit-of-work");
    }

    #[test]
    fn test_wrap() {
        let err = UnitOfWorkError::Rollback(boxed("connection reset"))
            .wrap("failed to save user");
        assert_eq!(err.to_string(), "failed to save user: connection reset");
        assert!(err.is_rollback());
        assert!(!err.is_commit());
        assert!(err.source().is_some());
    }

    #[test]
    fn test_nested_wrap_root() {
        let err = UnitOfWorkError::Begin(Arc::from(boxed("no connection")))
            .wrap("inner")
            .wrap("outer");
        assert_eq!(err.to_string(), "outer: inner: no connection");
        assert!(err.is_begin());
    }
}
