//! Unit-of-work contexts and the factory that creates them.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::uow::cell::TxCell;
use crate::uow::error::{UnitOfWorkError, UowResult};
use crate::uow::flush::flush;
use crate::uow::options::{FlushOptions, TxOptions};
use crate::uow::resource::{Resource, TxHandle};

/// An execution context that can be finalized.
///
/// [`flush`] only needs this surface, so tests and adapters can supply their
/// own implementations.
pub trait UnitOfWork {
    /// The execution context passed to every delegated call.
    fn context(&self) -> &Context;

    /// Commit whatever transaction was started. No-op if none was.
    fn commit(&self) -> UowResult<()>;

    /// Roll back whatever transaction was started. No-op if none was.
    fn rollback(&self) -> UowResult<()>;
}

/// A unit-of-work context.
///
/// A plain context has no transaction capability: queries go to the default
/// executor and commit/rollback do nothing. A transactional one shares its
/// transaction cell with every context derived from it, so at most one
/// transaction is begun for the whole unit of work.
///
/// Only [`UnitOfWorkFactory::begin`] creates transactional contexts, and only
/// [`querier`](crate::uow::querier()) begins their transaction. The cell itself
/// is not reachable from outside the crate:
///
/// ```compile_fail
/// use unitwork::context::Context;
/// use unitwork::memory::{MemoryStore, MemoryTx};
/// use unitwork::uow::{UnitOfWorkFactory, UowContext};
///
/// let factory = UnitOfWorkFactory::new(MemoryStore::new());
/// let unit: UowContext<MemoryTx> = factory.begin(&Context::background());
/// let _ = unit.cell();
/// ```
pub struct UowContext<T: TxHandle> {
    ctx: Context,
    cell: Option<Arc<TxCell<T>>>,
}

impl<T: TxHandle> UowContext<T> {
    /// A context without transaction capability.
    pub fn plain(ctx: Context) -> Self {
        Self { ctx, cell: None }
    }

    fn transactional(ctx: Context, cell: TxCell<T>) -> Self {
        Self {
            ctx,
            cell: Some(Arc::new(cell)),
        }
    }

    /// Whether queries through this context run inside a transaction.
    pub fn is_transactional(&self) -> bool {
        self.cell.is_some()
    }

    pub(crate) fn cell(&self) -> Option<&TxCell<T>> {
        self.cell.as_deref()
    }

    /// Whether a transaction has been begun successfully.
    pub fn is_started(&self) -> bool {
        self.cell().is_some_and(|cell| cell.started().is_some())
    }

    /// Whether beginning a transaction has been tried, successfully or not.
    pub fn is_begin_attempted(&self) -> bool {
        self.cell().is_some_and(TxCell::is_attempted)
    }

    /// Rebind to `ctx` (typically derived from [`UnitOfWork::context`]),
    /// keeping the same transaction cell.
    pub fn with_context(&self, ctx: Context) -> Self {
        Self {
            ctx,
            cell: self.cell.clone(),
        }
    }

    /// Whether both contexts are backed by the same transaction cell.
    pub fn shares_cell_with(&self, other: &Self) -> bool {
        match (&self.cell, &other.cell) {
            (Some(a), Some(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl<T: TxHandle> UnitOfWork for UowContext<T> {
    fn context(&self) -> &Context {
        &self.ctx
    }

    fn commit(&self) -> UowResult<()> {
        let Some(tx) = self.cell().and_then(TxCell::started) else {
            return Ok(());
        };
        tracing::debug!("committing unit of work");
        tx.commit(self.context())
            .map_err(|e| UnitOfWorkError::Commit(Box::new(e)))
    }

    fn rollback(&self) -> UowResult<()> {
        let Some(tx) = self.cell().and_then(TxCell::started) else {
            return Ok(());
        };
        tracing::debug!("rolling back unit of work");
        match tx.rollback(self.context()) {
            Ok(()) => Ok(()),
            Err(e) if T::is_closed(&e) => {
                tracing::debug!("transaction already closed, rollback skipped");
                Ok(())
            }
            Err(e) => Err(UnitOfWorkError::Rollback(Box::new(e))),
        }
    }
}

impl<T: TxHandle> Clone for UowContext<T> {
    fn clone(&self) -> Self {
        self.with_context(self.ctx.clone())
    }
}

impl<T: TxHandle> fmt::Debug for UowContext<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UowContext")
            .field("ctx", &self.ctx)
            .field("cell", &self.cell)
            .finish()
    }
}

/// What a new unit of work is built from.
pub enum Parent<'a, T: TxHandle> {
    /// A plain execution context; a fresh transaction cell is created.
    Context(&'a Context),
    /// An existing unit of work; its cell is reused if it has one.
    Unit(&'a UowContext<T>),
}

impl<'a, T: TxHandle> From<&'a Context> for Parent<'a, T> {
    fn from(ctx: &'a Context) -> Self {
        Parent::Context(ctx)
    }
}

impl<'a, T: TxHandle> From<&'a UowContext<T>> for Parent<'a, T> {
    fn from(unit: &'a UowContext<T>) -> Self {
        Parent::Unit(unit)
    }
}

/// Creates unit-of-work contexts bound to one resource.
///
/// Cheap to clone; the resource is shared.
pub struct UnitOfWorkFactory<R> {
    resource: Arc<R>,
    options: TxOptions,
}

impl<R> UnitOfWorkFactory<R>
where
    R: Resource + Send + Sync + 'static,
{
    /// Create a factory using default transaction options.
    pub fn new(resource: R) -> Self {
        Self::from_shared(Arc::new(resource))
    }

    /// Create a factory over an already shared resource.
    pub fn from_shared(resource: Arc<R>) -> Self {
        Self {
            resource,
            options: TxOptions::default(),
        }
    }

    /// Set the options used when a transaction begins.
    pub fn with_options(mut self, options: TxOptions) -> Self {
        self.options = options;
        self
    }

    /// The underlying resource.
    pub fn resource(&self) -> &R {
        &self.resource
    }

    /// The options new transactions begin with.
    pub fn options(&self) -> &TxOptions {
        &self.options
    }

    /// Create a unit-of-work context.
    ///
    /// Nothing is begun here. If `parent` is already a transactional unit of
    /// work, the result shares its cell and this factory's options are
    /// ignored, so wrapping the same context repeatedly never opens a second
    /// transaction.
    pub fn begin<'a>(&self, parent: impl Into<Parent<'a, R::Tx>>) -> UowContext<R::Tx>
    where
        R::Tx: 'a,
    {
        let ctx = match parent.into() {
            Parent::Unit(unit) if unit.is_transactional() => return unit.clone(),
            Parent::Unit(unit) => unit.context(),
            Parent::Context(ctx) => ctx,
        };

        let resource = Arc::clone(&self.resource);
        let options = self.options;
        let cell = TxCell::new(move |ctx: &Context| resource.begin_tx(ctx, &options));

        UowContext::transactional(ctx.clone(), cell)
    }

    /// Run `f` inside a unit of work, committing if it returns `Ok` and
    /// rolling back otherwise.
    pub fn run<F, T, E>(&self, ctx: &Context, options: &FlushOptions, f: F) -> Result<T, E>
    where
        F: FnOnce(&UowContext<R::Tx>) -> Result<T, E>,
        E: From<UnitOfWorkError>,
    {
        let unit = self.begin(ctx);
        let outcome = f(&unit);
        flush(&unit, outcome, options).into_result()
    }
}

impl<R> Clone for UnitOfWorkFactory<R> {
    fn clone(&self) -> Self {
        Self {
            resource: Arc::clone(&self.resource),
            options: self.options,
        }
    }
}

impl<R> fmt::Debug for UnitOfWorkFactory<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitOfWorkFactory")
            .field("options", &self.options)
            .finish()
    }
}
