//! Transaction handle cache.
//!
//! One [`TxCell`] exists per unit of work. It remembers the open transaction
//! (or the error from trying to open it) and the closure that opens it. The
//! closure runs at most once for the lifetime of the cell.

use std::fmt;
use std::sync::Arc;

use once_cell::sync::OnceCell;

use crate::context::Context;
use crate::uow::error::{SharedError, UnitOfWorkError, UowResult};
use crate::uow::resource::TxHandle;

type Starter<T> = Box<dyn Fn(&Context) -> Result<T, <T as TxHandle>::Error> + Send + Sync>;

/// Lazily populated, single-use transaction holder.
pub(crate) struct TxCell<T: TxHandle> {
    state: OnceCell<Result<T, SharedError>>,
    starter: Starter<T>,
}

impl<T: TxHandle> TxCell<T> {
    /// Create an empty cell that will call `starter` on first use.
    pub(crate) fn new<F>(starter: F) -> Self
    where
        F: Fn(&Context) -> Result<T, T::Error> + Send + Sync + 'static,
    {
        Self {
            state: OnceCell::new(),
            starter: Box::new(starter),
        }
    }

    /// Return the transaction, starting it if nothing has been tried yet.
    ///
    /// A failed start is cached and returned again on every later call; the
    /// starter is never retried.
    pub(crate) fn ensure_started(&self, ctx: &Context) -> UowResult<&T> {
        let state = self.state.get_or_init(|| {
            tracing::debug!("beginning lazy transaction");
            (self.starter)(ctx).map_err(|e| {
                tracing::debug!(error = %e, "transaction failed to begin");
                Arc::new(e) as SharedError
            })
        });
        match state {
            Ok(tx) => Ok(tx),
            Err(e) => Err(UnitOfWorkError::Begin(Arc::clone(e))),
        }
    }

    /// The transaction if it was started successfully. Never starts one.
    pub(crate) fn started(&self) -> Option<&T> {
        self.state.get().and_then(|state| state.as_ref().ok())
    }

    /// Whether a start has been attempted, successful or not.
    pub(crate) fn is_attempted(&self) -> bool {
        self.state.get().is_some()
    }
}

impl<T: TxHandle> fmt::Debug for TxCell<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self.state.get() {
            None => "idle",
            Some(Ok(_)) => "started",
            Some(Err(_)) => "failed",
        };
        f.debug_struct("TxCell").field("state", &state).finish()
    }
}
