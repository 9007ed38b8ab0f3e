//! In-process table store. Used by tests and dry runs.

use std::any::Any;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::store::{StoreError, TableRow, TableStore};

type Table = Box<dyn Any + Send + Sync>;

#[derive(Default)]
struct Inner {
    tables: HashMap<String, Table>,
    rejected: HashSet<String>,
    write_count: HashMap<String, u64>,
}

/// Tables held in memory, keyed by name. Clones share the same tables.
#[derive(Clone)]
pub struct MemoryStore {
    name: String,
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    /// Make every later write to `table` fail with [`StoreError::Rejected`].
    pub fn reject_writes_to(&self, table: &str) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        inner.rejected.insert(table.to_string());
        Ok(())
    }

    /// Number of completed replace operations on `table`.
    pub fn write_count(&self, table: &str) -> u64 {
        self.inner
            .lock()
            .map(|inner| inner.write_count.get(table).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.inner
            .lock()
            .map(|inner| inner.tables.contains_key(table))
            .unwrap_or(false)
    }

    fn rows<T: TableRow>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        let inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        let stored = inner
            .tables
            .get(table)
            .ok_or_else(|| StoreError::MissingTable(table.to_string()))?;
        stored
            .downcast_ref::<Vec<T>>()
            .cloned()
            .ok_or_else(|| StoreError::TypeMismatch {
                table: table.to_string(),
            })
    }
}

#[async_trait]
impl TableStore for MemoryStore {
    fn name(&self) -> &str {
        &self.name
    }

    async fn replace_table<T: TableRow>(&self, table: &str, rows: &[T]) -> Result<u64, StoreError> {
        let mut inner = self.inner.lock().map_err(|_| StoreError::LockPoisoned)?;
        if inner.rejected.contains(table) {
            return Err(StoreError::Rejected {
                table: table.to_string(),
                reason: format!("writes disabled on store '{}'", self.name),
            });
        }
        inner
            .tables
            .insert(table.to_string(), Box::new(rows.to_vec()));
        *inner.write_count.entry(table.to_string()).or_insert(0) += 1;
        Ok(rows.len() as u64)
    }

    async fn fetch_all<T: TableRow>(&self, table: &str) -> Result<Vec<T>, StoreError> {
        self.rows(table)
    }

    async fn query_summary(
        &self,
        table: &str,
        filter: &SummaryFilter,
    ) -> Result<Vec<SummaryRecord>, StoreError> {
        let mut rows: Vec<SummaryRecord> = self
            .rows::<SummaryRecord>(table)?
            .into_iter()
            .filter(|r| filter.matches(r))
            .collect();
        rows.sort_by(|a, b| {
            a.fiscal_year
                .cmp(&b.fiscal_year)
                .then_with(|| a.agency_name.cmp(&b.agency_name))
        });
        Ok(rows)
    }
}
