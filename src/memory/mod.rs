//! In-memory transactional store.
//!
//! [`MemoryStore`] plays both roles a database driver plays for a unit of
//! work: it is the default executor (statements autocommit) and the
//! [`Resource`](crate::uow::Resource) that begins [`MemoryTx`] transactions.
//!
//! ```text
//!            ┌───────────────────────────────┐
//!            │          MemoryStore          │
//!            │  committed tables + version   │
//!            │  active: tx_id -> TxMetadata  │
//!            └───────────────────────────────┘
//!               ▲ execute()          │ begin_tx()
//!               │ (autocommit)       ▼
//!      querier(Plain)        ┌──────────────┐
//!                            │   MemoryTx   │ buffered writes,
//!                            │              │ optional snapshot
//!                            └──────────────┘
//! ```

mod error;
mod statement;
mod store;
mod tx;

pub use error::{MemoryError, MemoryResult};
pub use statement::{QueryResult, Row, Statement};
pub use store::MemoryStore;
pub use tx::{MemoryTx, TxMetadata};
