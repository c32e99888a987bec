//! Statements understood by the in-memory store and their results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single operation against one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Statement {
    /// Insert or replace a row.
    Put {
        table: String,
        key: String,
        value: Value,
    },
    /// Read one row.
    Get { table: String, key: String },
    /// Remove one row.
    Delete { table: String, key: String },
    /// Read every row of a table, ordered by key.
    Scan { table: String },
}

impl Statement {
    pub fn put(table: impl Into<String>, key: impl Into<String>, value: Value) -> Self {
        Statement::Put {
            table: table.into(),
            key: key.into(),
            value,
        }
    }

    pub fn get(table: impl Into<String>, key: impl Into<String>) -> Self {
        Statement::Get {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn delete(table: impl Into<String>, key: impl Into<String>) -> Self {
        Statement::Delete {
            table: table.into(),
            key: key.into(),
        }
    }

    pub fn scan(table: impl Into<String>) -> Self {
        Statement::Scan {
            table: table.into(),
        }
    }

    /// The table this statement touches.
    pub fn table(&self) -> &str {
        match self {
            Statement::Put { table, .. }
            | Statement::Get { table, .. }
            | Statement::Delete { table, .. }
            | Statement::Scan { table } => table,
        }
    }

    /// Whether this statement modifies data.
    pub fn is_write(&self) -> bool {
        matches!(self, Statement::Put { .. } | Statement::Delete { .. })
    }
}

/// A stored row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Row {
    pub key: String,
    pub value: Value,
}

/// Result of executing a [`Statement`].
#[derive(Debug, Clone, PartialEq)]
pub enum QueryResult {
    /// Rows returned from `Get` or `Scan`.
    Rows(Vec<Row>),
    /// Number of rows affected by `Put` or `Delete`.
    Modified { rows_affected: usize },
}

impl QueryResult {
    /// Create a modified result.
    pub fn modified(rows: usize) -> Self {
        QueryResult::Modified {
            rows_affected: rows,
        }
    }

    /// The returned rows (empty for writes).
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            QueryResult::Rows(rows) => rows,
            QueryResult::Modified { .. } => Vec::new(),
        }
    }

    /// Rows affected by a write (zero for reads).
    pub fn rows_affected(&self) -> usize {
        match self {
            QueryResult::Rows(_) => 0,
            QueryResult::Modified { rows_affected } => *rows_affected,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_statement_kind() {
        assert!(Statement::put("users", "1", json!({})).is_write());
        assert!(Statement::delete("users", "1").is_write());
        assert!(!Statement::get("users", "1").is_write());
        assert_eq!(Statement::scan("orders").table(), "orders");
    }

    #[test]
    fn test_statement_from_json() {
        let stmt: Statement =
            serde_json::from_str(r#"{"op": "get", "table": "users", "key": "42"}"#).unwrap();
        assert_eq!(stmt, Statement::get("users", "42"));
    }

    #[test]
    fn test_query_result_accessors() {
        assert_eq!(QueryResult::modified(3).rows_affected(), 3);
        assert!(QueryResult::modified(3).into_rows().is_empty());
        let rows = vec![Row {
            key: "1".into(),
            value: json!(1),
        }];
        assert_eq!(QueryResult::Rows(rows.clone()).into_rows(), rows);
    }
}
