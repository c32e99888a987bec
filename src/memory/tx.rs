//! In-memory transactions.
//!
//! A transaction buffers its writes privately and applies them to the store
//! on commit. Reads see the transaction's own writes layered over either the
//! live committed data (`ReadUncommitted`, `ReadCommitted`) or the snapshot
//! taken at begin (`RepeatableRead`, `Serializable`).

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde_json::Value;

use crate::context::Context;
use crate::memory::error::{MemoryError, MemoryResult};
use crate::memory::statement::{QueryResult, Row, Statement};
use crate::memory::store::{MemoryStore, Tables};
use crate::uow::{Executor, IsolationLevel, TxHandle, TxOptions};

/// Transaction metadata stored in the store's active set.
#[derive(Debug, Clone, Serialize)]
pub struct TxMetadata {
    /// Unique transaction ID.
    pub tx_id: String,
    /// Options the transaction was begun with.
    pub options: TxOptions,
    /// Committed version the transaction started from.
    pub base_version: u64,
    /// When the transaction started.
    pub started_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TxState {
    Active,
    Committed,
    RolledBack,
}

/// (table, key) -> new value, `None` for a delete.
type WriteSet = BTreeMap<(String, String), Option<Value>>;

struct TxInner {
    state: TxState,
    writes: WriteSet,
}

/// An open transaction on a [`MemoryStore`].
pub struct MemoryTx {
    store: MemoryStore,
    metadata: TxMetadata,
    snapshot: Option<Tables>,
    inner: Mutex<TxInner>,
}

impl MemoryTx {
    pub(crate) fn new(store: MemoryStore, metadata: TxMetadata, snapshot: Option<Tables>) -> Self {
        Self {
            store,
            metadata,
            snapshot,
            inner: Mutex::new(TxInner {
                state: TxState::Active,
                writes: WriteSet::new(),
            }),
        }
    }

    /// Get the transaction ID.
    pub fn id(&self) -> &str {
        &self.metadata.tx_id
    }

    /// Id, start time and options, as tracked in the store's active set.
    pub fn metadata(&self) -> &TxMetadata {
        &self.metadata
    }

    /// Get the isolation level.
    pub fn isolation(&self) -> IsolationLevel {
        self.metadata.options.iso_level
    }

    /// Whether the transaction is still open.
    pub fn is_active(&self) -> bool {
        self.inner.lock().state == TxState::Active
    }

    /// Number of buffered writes.
    pub fn pending_writes(&self) -> usize {
        self.inner.lock().writes.len()
    }

    fn closed(&self) -> MemoryError {
        MemoryError::TxClosed {
            tx_id: self.metadata.tx_id.clone(),
        }
    }

    /// Committed rows of `table` visible to this transaction.
    fn base_rows(&self, table: &str) -> BTreeMap<String, Value> {
        match &self.snapshot {
            Some(tables) => tables.get(table).cloned().unwrap_or_default(),
            None => self
                .store
                .inner
                .data
                .read()
                .rows(table)
                .cloned()
                .unwrap_or_default(),
        }
    }

    fn base_row(&self, table: &str, key: &str) -> Option<Value> {
        match &self.snapshot {
            Some(tables) => tables.get(table).and_then(|rows| rows.get(key)).cloned(),
            None => self.store.inner.data.read().row(table, key).cloned(),
        }
    }

    fn read(&self, writes: &WriteSet, table: &str, key: &str) -> Option<Value> {
        match writes.get(&(table.to_string(), key.to_string())) {
            Some(pending) => pending.clone(),
            None => self.base_row(table, key),
        }
    }

    fn scan(&self, writes: &WriteSet, table: &str) -> Vec<Row> {
        let mut rows = self.base_rows(table);
        for ((t, key), pending) in writes {
            if t != table {
                continue;
            }
            match pending {
                Some(value) => {
                    rows.insert(key.clone(), value.clone());
                }
                None => {
                    rows.remove(key);
                }
            }
        }
        rows.into_iter()
            .map(|(key, value)| Row { key, value })
            .collect()
    }

    fn finish(&self, inner: &mut TxInner, state: TxState) {
        inner.state = state;
        inner.writes.clear();
        self.store.mark_completed(&self.metadata.tx_id);
    }
}

impl Executor for MemoryTx {
    type Statement = Statement;
    type Output = QueryResult;
    type Error = MemoryError;

    fn execute(&self, ctx: &Context, statement: &Statement) -> MemoryResult<QueryResult> {
        ctx.check()?;

        let mut inner = self.inner.lock();
        if inner.state != TxState::Active {
            return Err(self.closed());
        }
        if statement.is_write() && self.metadata.options.access_mode.is_read_only() {
            return Err(MemoryError::ReadOnly {
                tx_id: self.metadata.tx_id.clone(),
            });
        }

        match statement {
            Statement::Put { table, key, value } => {
                inner
                    .writes
                    .insert((table.clone(), key.clone()), Some(value.clone()));
                Ok(QueryResult::modified(1))
            }
            Statement::Delete { table, key } => {
                if self.read(&inner.writes, table, key).is_none() {
                    return Ok(QueryResult::modified(0));
                }
                inner.writes.insert((table.clone(), key.clone()), None);
                Ok(QueryResult::modified(1))
            }
            Statement::Get { table, key } => {
                let rows = self
                    .read(&inner.writes, table, key)
                    .map(|value| Row {
                        key: key.clone(),
                        value,
                    })
                    .into_iter()
                    .collect();
                Ok(QueryResult::Rows(rows))
            }
            Statement::Scan { table } => Ok(QueryResult::Rows(self.scan(&inner.writes, table))),
        }
    }
}

impl TxHandle for MemoryTx {
    type Error = MemoryError;

    /// Apply buffered writes to the store.
    ///
    /// Under `Serializable`, fails with [`MemoryError::Conflict`] if anything
    /// was committed after this transaction began; the transaction is closed
    /// either way.
    fn commit(&self, ctx: &Context) -> MemoryResult<()> {
        ctx.check()?;

        let mut inner = self.inner.lock();
        if inner.state != TxState::Active {
            return Err(self.closed());
        }

        let mut data = self.store.inner.data.write();
        if self.isolation() == IsolationLevel::Serializable
            && data.version != self.metadata.base_version
        {
            drop(data);
            self.finish(&mut inner, TxState::RolledBack);
            tracing::debug!(tx_id = %self.metadata.tx_id, "commit conflict");
            return Err(MemoryError::Conflict {
                tx_id: self.metadata.tx_id.clone(),
            });
        }

        let writes = std::mem::take(&mut inner.writes);
        let count = writes.len();
        let mut changed = false;
        for ((table, key), value) in writes {
            changed |= data.apply(&table, &key, value);
        }
        if changed {
            data.version += 1;
        }
        drop(data);

        self.finish(&mut inner, TxState::Committed);
        tracing::debug!(tx_id = %self.metadata.tx_id, writes = count, "transaction committed");
        Ok(())
    }

    fn rollback(&self, _ctx: &Context) -> MemoryResult<()> {
        let mut inner = self.inner.lock();
        if inner.state != TxState::Active {
            return Err(self.closed());
        }
        self.finish(&mut inner, TxState::RolledBack);
        tracing::debug!(tx_id = %self.metadata.tx_id, "transaction rolled back");
        Ok(())
    }

    fn is_closed(err: &MemoryError) -> bool {
        matches!(err, MemoryError::TxClosed { .. })
    }
}

impl Drop for MemoryTx {
    fn drop(&mut self) {
        if self.inner.get_mut().state == TxState::Active {
            tracing::debug!(tx_id = %self.metadata.tx_id, "abandoned transaction discarded");
            self.store.mark_completed(&self.metadata.tx_id);
        }
    }
}

impl std::fmt::Debug for MemoryTx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryTx")
            .field("tx_id", &self.metadata.tx_id)
            .field("isolation", &self.metadata.options.iso_level)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uow::{AccessMode, Resource};
    use serde_json::json;

    fn setup() -> (MemoryStore, Context) {
        (MemoryStore::new(), Context::background())
    }

    fn begin(store: &MemoryStore, ctx: &Context, iso: IsolationLevel) -> MemoryTx {
        store
            .begin_tx(ctx, &TxOptions::new().iso_level(iso))
            .unwrap()
    }

    #[test]
    fn test_commit_applies_writes() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);

        tx.execute(&ctx, &Statement::put("users", "1", json!({"name": "Alice"})))
            .unwrap();
        assert_eq!(tx.pending_writes(), 1);
        assert_eq!(store.get("users", "1"), None);

        tx.commit(&ctx).unwrap();
        assert!(!tx.is_active());
        assert_eq!(store.get("users", "1"), Some(json!({"name": "Alice"})));
        assert_eq!(store.version(), 1);
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_rollback_discards_writes() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);

        tx.execute(&ctx, &Statement::put("users", "1", json!(1))).unwrap();
        tx.rollback(&ctx).unwrap();

        assert_eq!(store.get("users", "1"), None);
        assert_eq!(store.version(), 0);
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_sees_own_writes() {
        let (store, ctx) = setup();
        store
            .execute(&ctx, &Statement::put("users", "1", json!("old")))
            .unwrap();
        let tx = begin(&store, &ctx, IsolationLevel::RepeatableRead);

        tx.execute(&ctx, &Statement::put("users", "2", json!("new"))).unwrap();
        tx.execute(&ctx, &Statement::delete("users", "1")).unwrap();

        let rows = tx.execute(&ctx, &Statement::scan("users")).unwrap().into_rows();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].key, "2");
        assert!(tx
            .execute(&ctx, &Statement::get("users", "1"))
            .unwrap()
            .into_rows()
            .is_empty());
        tx.rollback(&ctx).unwrap();
    }

    #[test]
    fn test_read_committed_sees_concurrent_commit() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);
        store.execute(&ctx, &Statement::put("users", "1", json!(1))).unwrap();

        let rows = tx.execute(&ctx, &Statement::get("users", "1")).unwrap().into_rows();
        assert_eq!(rows.len(), 1);
        tx.rollback(&ctx).unwrap();
    }

    #[test]
    fn test_repeatable_read_uses_snapshot() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::RepeatableRead);
        store.execute(&ctx, &Statement::put("users", "1", json!(1))).unwrap();

        let rows = tx.execute(&ctx, &Statement::get("users", "1")).unwrap().into_rows();
        assert!(rows.is_empty());
        // not serializable, so the commit still goes through
        tx.execute(&ctx, &Statement::put("users", "2", json!(2))).unwrap();
        tx.commit(&ctx).unwrap();
        assert_eq!(store.len("users"), 2);
    }

    #[test]
    fn test_serializable_conflict() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::Serializable);
        tx.execute(&ctx, &Statement::put("users", "1", json!("tx"))).unwrap();
        store
            .execute(&ctx, &Statement::put("users", "1", json!("other")))
            .unwrap();

        let err = tx.commit(&ctx).unwrap_err();
        assert!(err.is_retryable());
        assert!(!tx.is_active());
        assert_eq!(store.get("users", "1"), Some(json!("other")));
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_read_only_rejects_writes() {
        let (store, ctx) = setup();
        let tx = store
            .begin_tx(&ctx, &TxOptions::new().access_mode(AccessMode::ReadOnly))
            .unwrap();

        let err = tx
            .execute(&ctx, &Statement::put("users", "1", json!(1)))
            .unwrap_err();
        assert!(matches!(err, MemoryError::ReadOnly { .. }));
        assert!(tx.execute(&ctx, &Statement::scan("users")).is_ok());
        tx.commit(&ctx).unwrap();
    }

    #[test]
    fn test_closed_after_commit() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);
        tx.commit(&ctx).unwrap();

        let err = tx.rollback(&ctx).unwrap_err();
        assert!(MemoryTx::is_closed(&err));
        assert!(MemoryTx::is_closed(&tx.commit(&ctx).unwrap_err()));
        assert!(tx.execute(&ctx, &Statement::scan("users")).is_err());
    }

    #[test]
    fn test_drop_untracks_abandoned() {
        let (store, ctx) = setup();
        {
            let _tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);
            assert_eq!(store.active_count(), 1);
        }
        assert_eq!(store.active_count(), 0);
    }

    #[test]
    fn test_commit_honours_deadline() {
        let (store, ctx) = setup();
        let tx = begin(&store, &ctx, IsolationLevel::ReadCommitted);
        tx.execute(&ctx, &Statement::put("users", "1", json!(1))).unwrap();

        let expired = ctx.with_timeout(std::time::Duration::ZERO);
        assert!(matches!(tx.commit(&expired), Err(MemoryError::Context(_))));
        assert!(tx.is_active());
        tx.commit(&ctx).unwrap();
        assert_eq!(store.len("users"), 1);
    }
}
