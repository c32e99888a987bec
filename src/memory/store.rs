//! The shared store: committed tables plus bookkeeping for open
//! transactions.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use parking_lot::RwLock;
use serde_json::Value;
use ulid::Ulid;

use crate::context::Context;
use crate::memory::error::{MemoryError, MemoryResult};
use crate::memory::statement::{QueryResult, Row, Statement};
use crate::memory::tx::{MemoryTx, TxMetadata};
use crate::uow::{Executor, Resource, TxOptions};

/// Table name -> row key -> row value.
pub(crate) type Tables = BTreeMap<String, BTreeMap<String, Value>>;

/// Committed data. `version` increases with every committed write.
#[derive(Debug, Clone, Default)]
pub(crate) struct Committed {
    pub(crate) version: u64,
    pub(crate) tables: Tables,
}

impl Committed {
    pub(crate) fn row(&self, table: &str, key: &str) -> Option<&Value> {
        self.tables.get(table).and_then(|rows| rows.get(key))
    }

    pub(crate) fn rows(&self, table: &str) -> Option<&BTreeMap<String, Value>> {
        self.tables.get(table)
    }

    /// Apply one write. Returns whether anything changed.
    pub(crate) fn apply(&mut self, table: &str, key: &str, value: Option<Value>) -> bool {
        match value {
            Some(value) => {
                self.tables
                    .entry(table.to_string())
                    .or_default()
                    .insert(key.to_string(), value);
                true
            }
            None => self
                .tables
                .get_mut(table)
                .is_some_and(|rows| rows.remove(key).is_some()),
        }
    }
}

pub(crate) struct StoreInner {
    pub(crate) data: RwLock<Committed>,
    /// Open transactions tracked by ID.
    pub(crate) active: RwLock<HashMap<String, TxMetadata>>,
}

/// An in-process transactional key/value store of JSON rows.
///
/// Used directly it is the default executor (every statement autocommits);
/// as a [`Resource`] it begins [`MemoryTx`] transactions.
///
/// Thread-safe: can be shared across threads via Clone (uses Arc internally).
#[derive(Clone)]
pub struct MemoryStore {
    pub(crate) inner: Arc<StoreInner>,
}

impl MemoryStore {
    /// Create an empty store at version 0.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(StoreInner {
                data: RwLock::new(Committed::default()),
                active: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Read a committed row.
    pub fn get(&self, table: &str, key: &str) -> Option<Value> {
        self.inner.data.read().row(table, key).cloned()
    }

    /// Number of committed rows in `table`.
    pub fn len(&self, table: &str) -> usize {
        self.inner.data.read().rows(table).map_or(0, BTreeMap::len)
    }

    /// Check whether `table` has no committed rows.
    pub fn is_empty(&self, table: &str) -> bool {
        self.len(table) == 0
    }

    /// Current committed version.
    pub fn version(&self) -> u64 {
        self.inner.data.read().version
    }

    /// Get the number of open transactions.
    pub fn active_count(&self) -> usize {
        self.inner.active.read().len()
    }

    /// List all open transaction IDs.
    pub fn active_transactions(&self) -> Vec<String> {
        self.inner.active.read().keys().cloned().collect()
    }

    /// Check if a transaction is open.
    pub fn is_active(&self, tx_id: &str) -> bool {
        self.inner.active.read().contains_key(tx_id)
    }

    /// Get metadata for an open transaction.
    pub fn transaction_info(&self, tx_id: &str) -> Option<TxMetadata> {
        self.inner.active.read().get(tx_id).cloned()
    }

    pub(crate) fn mark_completed(&self, tx_id: &str) {
        self.inner.active.write().remove(tx_id);
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MemoryStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryStore")
            .field("version", &self.version())
            .field("active_count", &self.active_count())
            .finish()
    }
}

/// Autocommit execution outside any transaction.
impl Executor for MemoryStore {
    type Statement = Statement;
    type Output = QueryResult;
    type Error = MemoryError;

    fn execute(&self, ctx: &Context, statement: &Statement) -> MemoryResult<QueryResult> {
        ctx.check()?;

        match statement {
            Statement::Put { table, key, value } => {
                let mut data = self.inner.data.write();
                data.apply(table, key, Some(value.clone()));
                data.version += 1;
                Ok(QueryResult::modified(1))
            }
            Statement::Delete { table, key } => {
                let mut data = self.inner.data.write();
                if data.apply(table, key, None) {
                    data.version += 1;
                    Ok(QueryResult::modified(1))
                } else {
                    Ok(QueryResult::modified(0))
                }
            }
            Statement::Get { table, key } => {
                let data = self.inner.data.read();
                let rows = data
                    .row(table, key)
                    .map(|value| Row {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .into_iter()
                    .collect();
                Ok(QueryResult::Rows(rows))
            }
            Statement::Scan { table } => {
                let data = self.inner.data.read();
                let rows = data
                    .rows(table)
                    .into_iter()
                    .flatten()
                    .map(|(key, value)| Row {
                        key: key.clone(),
                        value: value.clone(),
                    })
                    .collect();
                Ok(QueryResult::Rows(rows))
            }
        }
    }
}

impl Resource for MemoryStore {
    type Tx = MemoryTx;

    fn begin_tx(&self, ctx: &Context, options: &TxOptions) -> MemoryResult<MemoryTx> {
        ctx.check()?;

        // Generate unique transaction ID
        let tx_id = Ulid::new().to_string().to_lowercase();

        let (base_version, snapshot) = {
            let data = self.inner.data.read();
            let snapshot = options.iso_level.uses_snapshot().then(|| data.tables.clone());
            (data.version, snapshot)
        };

        let metadata = TxMetadata {
            tx_id: tx_id.clone(),
            options: *options,
            base_version,
            started_at: chrono::Utc::now(),
        };

        self.inner
            .active
            .write()
            .insert(tx_id.clone(), metadata.clone());

        tracing::debug!(
            tx_id = %tx_id,
            isolation = %options.iso_level,
            access = %options.access_mode,
            base_version,
            "transaction begun"
        );

        Ok(MemoryTx::new(self.clone(), metadata, snapshot))
    }
}
