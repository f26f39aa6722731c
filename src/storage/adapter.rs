//! The persistence adapter contract: the one boundary through which every
//! other component speaks to the relational store. No schema-specific SQL
//! escapes this module.

use crate::error::Result;
use async_trait::async_trait;
use postgres_types::ToSql;
use serde_json::Value;

/// A single row of a query result, as loosely-typed JSON values keyed by
/// column name. Avoids forcing every caller through a generated row type.
pub type Row = serde_json::Map<String, Value>;

/// A table row queued for `bulk_copy`, already shaped to match the target
/// table's column order.
pub type CopyRow = Vec<Value>;

/// One COPY-style append, scoped to a single table, run as part of a
/// `transaction` call.
#[derive(Debug, Clone)]
pub struct BulkCopyOp {
    pub table: String,
    pub columns: Vec<String>,
    pub rows: Vec<CopyRow>,
}

impl BulkCopyOp {
    pub fn new(table: impl Into<String>, columns: &[&str], rows: Vec<CopyRow>) -> Self {
        Self {
            table: table.into(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows,
        }
    }
}

/// Parameterized bulk insert, query, and scoped-transaction access to the
/// relational store. Implementations own connection pooling; callers never
/// see a raw connection.
///
/// The contract is logically synchronous (spec-equivalent to §4.3): callers
/// observe read-committed reads and all-or-nothing transactions. The
/// adapter itself is `async` because the only real backing store
/// (Postgres) is reached over the network.
#[async_trait]
pub trait PersistenceAdapter: Send + Sync {
    /// Parameterized streaming read; `row_callback` is invoked once per row
    /// in result order.
    async fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
        row_callback: &mut (dyn FnMut(Row) + Send),
    ) -> Result<()>;

    /// Convenience over the first column of the first row.
    async fn query_single(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Option<String>>;

    /// Parameterized DML; returns the number of affected rows.
    async fn execute(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<u64>;

    /// High-throughput append via a native COPY-style protocol, outside any
    /// enclosing transaction.
    async fn bulk_copy(&self, table: &str, columns: &[&str], rows: &[CopyRow]) -> Result<u64>;

    /// Run every op in `ops`, in order, inside one transaction: commits on
    /// normal completion, rolls back on any failure. This is the shape the
    /// Merkle-DAG writer's flush protocol needs — a fixed sequence of bulk
    /// copies that either all land or none do.
    async fn transaction(&self, ops: Vec<BulkCopyOp>) -> Result<()>;

    /// Health check: a trivial round-trip query.
    async fn health_check(&self) -> Result<()>;
}
