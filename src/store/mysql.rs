use async_trait::async_trait;
use sqlx::MySqlPool;
use tracing::{debug, info};

use crate::db::init_db;
use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::store::{ColumnDef, StoreError, TableRow, TableStore};
use crate::utils::db_utils::{bind_value, build_insert_sql, rows_per_statement};

const INSERT_BATCH_ROWS: usize = 500;

/// A MySQL database holding pipeline tables.
#[derive(Clone)]
pub struct MySqlStore {
    name: String,
    pool: MySqlPool,
}

impl MySqlStore {
    pub fn new(name: impl Into<String>, pool: MySqlPool) -> Self {
        Self {
            name: name.into(),
            pool,
        }
    }

    pub async fn connect(name: impl Into<String>, database_url: &str) -> Result<Self, StoreError> {
        let pool = init_db(database_url).await?;
        Ok(Self::new(name, pool))
    }

    /// Create `table` with the fixed column list of `T` unless it exists.
    pub async fn ensure_table<T: TableRow>(&self, table: &str) -> Result<(), StoreError> {
        let sql = create_table_sql(table, T::COLUMNS);
        debug!(store = %self.name, sql = %sql, "Ensuring table");
        sqlx::query(&sql).execute(&self.pool).await?;
        info!(store = %self.name, table, "Table ready");
        Ok(())
    }
}

pub fn create_table_sql(table: &str, columns: &[ColumnDef]) -> String {
    let column_defs = columns
        .iter()
        .map(|c| {
            format!(
                "`{}` {} {}",
                c.name,
                c.sql_type.ddl(),
                if c.nullable { "NULL" } else { "NOT NULL" }
            )
        })
        .collect::<Vec<_>>()
        .join(", ");

    format!("CREATE TABLE IF NOT EXISTS `{}` ({})", table, column_defs)
}

fn summary_select_sql(table: &str, filter: &SummaryFilter) -> String {
    let mut conditions = Vec::new();
    if filter.fiscal_year.is_some() {
        conditions.push("`FiscalYear` = ?");
    }
    if filter.agency.is_some() {
        conditions.push("UPPER(`AgencyName`) = UPPER(?)");
    }

    let where_clause = if conditions.is_empty() {
        "".to_string()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    format!(
        "SELECT `FiscalYear`, `AgencyName`, `TotalPaid` FROM `{}` {} ORDER BY `FiscalYear`, `AgencyName`",
        table, where_clause
    )
}

#[async_trait]
impl TableStore for MySqlStore {
    fn name(&self) -> &str {
        &self.name
    }

    /// TRUNCATE commits on its own in MySQL, so a failure between batches
    /// leaves the table partially written.
    async fn replace_table<T: TableRow>(&self, table: &str, rows: &[T]) -> Result<u64, StoreError> {
        sqlx::query(&format!("TRUNCATE TABLE `{}`", table))
            .execute(&self.pool)
            .await?;

        let columns = T::column_names();
        let chunk = rows_per_statement(columns.len(), INSERT_BATCH_ROWS);
        let mut written = 0u64;

        for batch in rows.chunks(chunk) {
            let sql = build_insert_sql(table, &columns, batch.len());
            let mut query = sqlx::query(&sql);
            for row in batch {
                for value in row.values() {
                    query = bind_value(query, value);
                }
            }
            written += query.execute(&self.pool).await?.rows_affected();
        }

        debug!(store = %self.name, table, rows = written, "Table replaced");
        Ok(written)
    }

    async fn fetch_all<T: TableRow>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        let columns = T::column_names()
            .iter()
            .map(|c| format!("`{}`", c))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!("SELECT {} FROM `{}`", columns, table);

        let rows = sqlx::query_as::<_, T>(&sql).fetch_all(&self.pool).await?;
        Ok(rows)
    }

    async fn query_summary(
        &self,
        table: &str,
        filter: &SummaryFilter,
    ) -> Result<Vec<SummaryRecord>, StoreError> {
        let sql = summary_select_sql(table, filter);
        debug!(sql = %sql, filter = ?filter, "Querying summary");

        let mut query = sqlx::query_as::<_, SummaryRecord>(&sql);
        if let Some(year) = filter.fiscal_year {
            query = query.bind(year);
        }
        if let Some(agency) = &filter.agency {
            query = query.bind(agency.as_str());
        }

        Ok(query.fetch_all(&self.pool).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::summary::SUMMARY_TABLE;

    #[test]
    fn create_table_lists_columns_in_order() {
        let sql = create_table_sql(SUMMARY_TABLE, SummaryRecord::COLUMNS);
        assert_eq!(
            sql,
            "CREATE TABLE IF NOT EXISTS `payroll_summary` (`FiscalYear` INT NOT NULL, `AgencyName` VARCHAR(50) NOT NULL, `TotalPaid` DOUBLE NOT NULL)"
        );
    }

    #[test]
    fn payroll_ddl_marks_amounts_nullable() {
        let sql = create_table_sql(
            "payroll_2021",
            crate::model::payroll::PayrollRecord::COLUMNS,
        );
        assert!(sql.contains("`TotalOTPaid` DOUBLE NULL"));
        assert!(sql.contains("`AgencyStartDate` DATE NULL"));
        assert!(sql.contains("`AgencyID` VARCHAR(10) NOT NULL"));
    }

    #[test]
    fn summary_select_adds_only_requested_filters() {
        let all = summary_select_sql(SUMMARY_TABLE, &SummaryFilter::default());
        assert!(!all.contains("WHERE"));

        let filtered = summary_select_sql(
            SUMMARY_TABLE,
            &SummaryFilter {
                fiscal_year: Some(2021),
                agency: Some("NYPD".to_string()),
            },
        );
        assert!(filtered.contains("WHERE `FiscalYear` = ? AND UPPER(`AgencyName`) = UPPER(?)"));
    }
}
