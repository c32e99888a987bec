//! Unit of work.
//!
//! A unit of work ties every repository call made for one request to a
//! single transaction. The transaction is begun lazily, the first time a
//! repository asks for an executor, and finalized exactly once by [`flush`].
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────┐  begin()   ┌──────────────────────────────┐
//! │  UnitOfWorkFactory   │──────────▶│ UowContext (transactional)   │
//! │ (resource, options)  │            │   ctx + Arc<TxCell>          │
//! └──────────────────────┘            └──────────────────────────────┘
//!                                          │                 │
//!                            querier() ────┘                 └──── flush()
//!                        (begins on first use)           (commit or rollback)
//!                                          │                 │
//!                                          ▼                 ▼
//!                                   ┌──────────────────────────────┐
//!                                   │   TxCell: OnceCell<Tx|err>   │
//!                                   └──────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```
//! use serde_json::json;
//! use unitwork::context::Context;
//! use unitwork::memory::{MemoryError, MemoryStore, Statement};
//! use unitwork::uow::{flush, querier, Executor, FlushOptions, UnitOfWork, UnitOfWorkFactory};
//!
//! let store = MemoryStore::new();
//! let factory = UnitOfWorkFactory::new(store.clone());
//!
//! let unit = factory.begin(&Context::background());
//! let outcome = (|| -> Result<(), MemoryError> {
//!     let q = querier(&unit, factory.resource())?;
//!     q.execute(unit.context(), &Statement::put("users", "1", json!({"name": "Alice"})))?;
//!     Ok(())
//! })();
//! flush(&unit, outcome, &FlushOptions::new()).into_result().unwrap();
//!
//! assert!(store.get("users", "1").is_some());
//! ```

mod cell;
mod error;
mod flush;
mod isolation;
mod options;
mod querier;
mod resource;
mod scope;

#[cfg(test)]
mod testing;

pub use error::{BoxError, SharedError, UnitOfWorkError, UowResult};
pub use flush::{flush, Flushed};
pub use isolation::{AccessMode, DeferrableMode, IsolationLevel};
pub use options::{FlushOptions, RollbackErrorLogger, TxOptions};
pub use querier::{querier, Querier};
pub use resource::{Executor, Resource, TxHandle};
pub use scope::{Parent, UnitOfWork, UnitOfWorkFactory, UowContext};
