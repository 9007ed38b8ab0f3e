use chrono::NaiveDate;
use sqlx::MySql;
use sqlx::mysql::MySqlArguments;
use sqlx::query::Query;

/// MySQL caps a prepared statement at 65535 placeholders.
pub const MAX_BIND_PARAMS: usize = 65_535;

/// ===============================
/// SQL bindable value enum
/// ===============================
#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    String(String),
    I64(i64),
    F64(f64),
    Date(NaiveDate),
    Null,
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        SqlValue::String(v)
    }
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        SqlValue::String(v.to_string())
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        SqlValue::I64(v.into())
    }
}

impl From<f64> for SqlValue {
    fn from(v: f64) -> Self {
        SqlValue::F64(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        SqlValue::Date(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(SqlValue::Null)
    }
}

/// ===============================
/// Build multi-row INSERT SQL
/// ===============================
pub fn build_insert_sql(table: &str, columns: &[&str], row_count: usize) -> String {
    let column_list = columns
        .iter()
        .map(|c| format!("`{}`", c))
        .collect::<Vec<_>>()
        .join(", ");

    let row_placeholders = format!("({})", vec!["?"; columns.len()].join(", "));
    let values_clause = vec![row_placeholders.as_str(); row_count].join(", ");

    format!(
        "INSERT INTO `{}` ({}) VALUES {}",
        table, column_list, values_clause
    )
}

/// Rows per INSERT statement so that placeholders stay under the MySQL limit.
pub fn rows_per_statement(column_count: usize, preferred: usize) -> usize {
    if column_count == 0 {
        return preferred.max(1);
    }
    preferred.clamp(1, (MAX_BIND_PARAMS / column_count).max(1))
}

/// ===============================
/// Bind a value onto a query
/// ===============================
pub fn bind_value<'q>(
    query: Query<'q, MySql, MySqlArguments>,
    value: SqlValue,
) -> Query<'q, MySql, MySqlArguments> {
    match value {
        SqlValue::String(v) => query.bind(v),
        SqlValue::I64(v) => query.bind(v),
        SqlValue::F64(v) => query.bind(v),
        SqlValue::Date(v) => query.bind(v),
        SqlValue::Null => query.bind(None::<String>),
    }
}
