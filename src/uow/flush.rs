//! Finalizing a unit of work.

use crate::uow::error::UnitOfWorkError;
use crate::uow::options::FlushOptions;
use crate::uow::scope::UnitOfWork;

/// How a unit of work ended.
#[derive(Debug)]
pub enum Flushed<T, E> {
    /// The business operation succeeded and the commit went through.
    Committed(T),
    /// The business operation succeeded but the commit failed.
    CommitFailed(E),
    /// The business operation failed and was rolled back cleanly.
    RolledBack(E),
    /// The business operation failed and so did the rollback.
    ///
    /// `error` is the business error; the rollback error is reported
    /// alongside and never replaces it.
    RollbackFailed { error: E, rollback: UnitOfWorkError },
}

impl<T, E> Flushed<T, E> {
    /// The final outcome: the value on commit, otherwise the commit error or
    /// the original business error.
    pub fn into_result(self) -> Result<T, E> {
        match self {
            Flushed::Committed(value) => Ok(value),
            Flushed::CommitFailed(error)
            | Flushed::RolledBack(error)
            | Flushed::RollbackFailed { error, .. } => Err(error),
        }
    }

    /// Whether the commit went through.
    pub fn is_committed(&self) -> bool {
        matches!(self, Flushed::Committed(_))
    }

    /// The secondary rollback error, if rollback failed.
    pub fn rollback_error(&self) -> Option<&UnitOfWorkError> {
        match self {
            Flushed::RollbackFailed { rollback, .. } => Some(rollback),
            _ => None,
        }
    }
}

/// Commit `uow` if `outcome` is `Ok`, roll it back otherwise.
///
/// A failed commit becomes the outcome (prefixed with
/// [`FlushOptions::commit_error_wrap`] when set). A failed rollback never
/// masks the business error: it is prefixed with
/// [`FlushOptions::rollback_error_wrap`] when set, handed to
/// [`FlushOptions::rollback_error_logger`], and returned in
/// [`Flushed::RollbackFailed`].
pub fn flush<U, T, E>(uow: &U, outcome: Result<T, E>, options: &FlushOptions) -> Flushed<T, E>
where
    U: UnitOfWork + ?Sized,
    E: From<UnitOfWorkError>,
{
    match outcome {
        Ok(value) => match uow.commit() {
            Ok(()) => Flushed::Committed(value),
            Err(e) => {
                let e = match &options.commit_error_wrap {
                    Some(message) => e.wrap(message.as_str()),
                    None => e,
                };
                Flushed::CommitFailed(E::from(e))
            }
        },
        Err(error) => match uow.rollback() {
            Ok(()) => Flushed::RolledBack(error),
            Err(e) => {
                let e = match &options.rollback_error_wrap {
                    Some(message) => e.wrap(message.as_str()),
                    None => e,
                };
                tracing::warn!(error = %e, "unit of work rollback failed");
                if let Some(log) = &options.rollback_error_logger {
                    log(&e);
                }
                Flushed::RollbackFailed { error, rollback: e }
            }
        },
    }
}
