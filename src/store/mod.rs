//! Relational table storage used by the loader, the aggregator and the sinks.
//!
//! Every write is a full replace of the table contents (truncate, then
//! insert). Reads return the whole table.

pub mod memory;
pub mod mysql;

use async_trait::async_trait;
use sqlx::FromRow;
use sqlx::mysql::MySqlRow;

use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::utils::db_utils::SqlValue;

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// Column type as declared in the destination DDL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    Int,
    VarChar(usize),
    Double,
    Date,
}

impl SqlType {
    pub fn ddl(&self) -> String {
        match self {
            SqlType::Int => "INT".to_string(),
            SqlType::VarChar(len) => format!("VARCHAR({})", len),
            SqlType::Double => "DOUBLE".to_string(),
            SqlType::Date => "DATE".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnDef {
    pub name: &'static str,
    pub sql_type: SqlType,
    pub nullable: bool,
}

impl ColumnDef {
    pub const fn required(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: false,
        }
    }

    pub const fn nullable(name: &'static str, sql_type: SqlType) -> Self {
        Self {
            name,
            sql_type,
            nullable: true,
        }
    }
}

/// A record type with a fixed column layout that can be written to and read
/// back from a table.
pub trait TableRow:
    for<'r> FromRow<'r, MySqlRow> + Clone + Send + Sync + Unpin + 'static
{
    const COLUMNS: &'static [ColumnDef];

    /// Values in `COLUMNS` order.
    fn values(&self) -> Vec<SqlValue>;

    fn column_names() -> Vec<&'static str> {
        Self::COLUMNS.iter().map(|c| c.name).collect()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("table '{0}' does not exist")]
    MissingTable(String),

    #[error("table '{table}' holds rows of a different type")]
    TypeMismatch { table: String },

    #[error("write to '{table}' rejected: {reason}")]
    Rejected { table: String, reason: String },

    #[error("store lock poisoned")]
    LockPoisoned,
}

#[async_trait]
pub trait TableStore: Send + Sync + 'static {
    /// Human-readable store name used in logs and reports.
    fn name(&self) -> &str;

    /// Replace the full contents of `table` with `rows`.
    /// Returns the number of rows written.
    async fn replace_table<T: TableRow>(&self, table: &str, rows: &[T]) -> Result<u64, StoreError>;

    async fn fetch_all<T: TableRow>(&self, table: &str) -> Result<Vec<T>, StoreError>;

    /// Read summary rows from `table` matching `filter`, ordered by
    /// fiscal year then agency name.
    async fn query_summary(
        &self,
        table: &str,
        filter: &SummaryFilter,
    ) -> Result<Vec<SummaryRecord>, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ddl_renders_types() {
        assert_eq!(SqlType::Int.ddl(), "INT");
        assert_eq!(SqlType::VarChar(50).ddl(), "VARCHAR(50)");
        assert_eq!(SqlType::Double.ddl(), "DOUBLE");
        assert_eq!(SqlType::Date.ddl(), "DATE");
    }
}
