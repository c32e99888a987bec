//! Picking the executor a repository call should use.

use crate::context::Context;
use crate::uow::error::UowResult;
use crate::uow::resource::{Executor, TxHandle};
use crate::uow::scope::{Parent, UnitOfWork};

/// The executor chosen by [`querier`].
#[derive(Debug)]
pub enum Querier<'a, D: ?Sized, T> {
    /// No transaction in play; the connection or pool itself.
    Default(&'a D),
    /// The unit of work's open transaction.
    Tx(&'a T),
}

impl<D: ?Sized, T> Querier<'_, D, T> {
    /// Whether statements run inside the unit of work's transaction.
    pub fn is_transactional(&self) -> bool {
        matches!(self, Querier::Tx(_))
    }
}

impl<D, T> Executor for Querier<'_, D, T>
where
    D: Executor + ?Sized,
    T: Executor<Statement = D::Statement, Output = D::Output, Error = D::Error>,
{
    type Statement = D::Statement;
    type Output = D::Output;
    type Error = D::Error;

    fn execute(&self, ctx: &Context, statement: &Self::Statement)
        -> Result<Self::Output, Self::Error> {
        match self {
            Querier::Default(default) => default.execute(ctx, statement),
            Querier::Tx(tx) => tx.execute(ctx, statement),
        }
    }
}

/// Resolve the executor for `scope`.
///
/// A bare [`Context`] or a plain unit of work gets `default` back untouched.
/// A transactional unit of work gets its transaction, which is begun here on
/// first use; a failed begin is returned on this and every later call. This
/// is the only place a transaction is ever begun, so repositories must obtain
/// their executor through it.
pub fn querier<'a, D, T>(
    scope: impl Into<Parent<'a, T>>,
    default: &'a D,
) -> UowResult<Querier<'a, D, T>>
where
    D: ?Sized,
    T: TxHandle + 'a,
{
    let unit = match scope.into() {
        Parent::Context(_) => return Ok(Querier::Default(default)),
        Parent::Unit(unit) => unit,
    };
    match unit.cell() {
        None => Ok(Querier::Default(default)),
        Some(cell) => cell.ensure_started(unit.context()).map(Querier::Tx),
    }
}
