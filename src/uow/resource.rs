//! Capabilities the unit-of-work core expects from a database driver.

use std::error::Error as StdError;

use crate::context::Context;
use crate::uow::options::TxOptions;

/// An open transaction.
pub trait TxHandle {
    /// Error reported by the driver.
    type Error: StdError + Send + Sync + 'static;

    /// Commit the transaction.
    fn commit(&self, ctx: &Context) -> Result<(), Self::Error>;

    /// Roll the transaction back.
    fn rollback(&self, ctx: &Context) -> Result<(), Self::Error>;

    /// Whether `err` says the transaction was already committed or rolled
    /// back. Rollback treats such errors as success.
    fn is_closed(err: &Self::Error) -> bool {
        let _ = err;
        false
    }
}

/// Something that begins transactions (a connection or a pool).
pub trait Resource {
    /// Transaction handle produced by [`Resource::begin_tx`].
    type Tx: TxHandle;

    /// Begin a transaction with `options`.
    fn begin_tx(
        &self,
        ctx: &Context,
        options: &TxOptions,
    ) -> Result<Self::Tx, <Self::Tx as TxHandle>::Error>;
}

/// Anything that runs statements: a plain connection, a pool, or an open
/// transaction.
pub trait Executor {
    /// What gets executed, e.g. a SQL string or a typed command.
    type Statement: ?Sized;
    /// Rows, affected counts or whatever the driver returns.
    type Output;
    /// Error reported by the driver.
    type Error: StdError + Send + Sync + 'static;

    /// Execute one statement.
    fn execute(&self, ctx: &Context, statement: &Self::Statement)
        -> Result<Self::Output, Self::Error>;
}
