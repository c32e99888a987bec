//! Unitwork - lazily started, context-scoped unit-of-work transactions
//!
//! This crate ties every repository call made for one request to a single
//! transaction. The transaction is begun only when a repository first asks
//! for an executor, wrapping an existing unit of work never opens a second
//! one, and [`uow::flush`] commits or rolls back exactly once based on the
//! business outcome.
//!
//! # Example
//!
//! ```
//! use serde_json::json;
//! use unitwork::context::Context;
//! use unitwork::memory::{MemoryError, MemoryStore, Statement};
//! use unitwork::uow::{querier, Executor, FlushOptions, UnitOfWork, UnitOfWorkFactory};
//!
//! let store = MemoryStore::new();
//! let factory = UnitOfWorkFactory::new(store.clone());
//!
//! factory
//!     .run(&Context::background(), &FlushOptions::new(), |unit| {
//!         let q = querier(unit, factory.resource())?;
//!         q.execute(unit.context(), &Statement::put("users", "1", json!({"name": "Alice"})))?;
//!         Ok::<_, MemoryError>(())
//!     })
//!     .unwrap();
//!
//! assert_eq!(store.get("users", "1"), Some(json!({"name": "Alice"})));
//! ```

pub mod context;
pub mod memory;
pub mod uow;
