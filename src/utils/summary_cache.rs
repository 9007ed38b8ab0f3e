use moka::future::Cache;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::store::StoreError;

/// Summary query results keyed by filter. Cleared after every pipeline run.
#[derive(Clone)]
pub struct SummaryCache {
    cache: Cache<SummaryFilter, Arc<Vec<SummaryRecord>>>,
    /// Bumped by every invalidation.
    generation: Arc<AtomicU64>,
}

impl SummaryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            cache: Cache::builder()
                .max_capacity(10_000) // distinct filters, not rows
                .time_to_live(ttl)
                .build(),
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Cached rows for `filter`, running `load` on a miss. Concurrent misses
    /// on the same filter share one load.
    ///
    /// Rows loaded across an invalidation are returned but not kept.
    pub async fn get_or_load<F>(
        &self,
        filter: SummaryFilter,
        load: F,
    ) -> Result<Arc<Vec<SummaryRecord>>, Arc<StoreError>>
    where
        F: Future<Output = Result<Vec<SummaryRecord>, StoreError>>,
    {
        let started = self.generation.load(Ordering::SeqCst);
        let rows = self
            .cache
            .try_get_with(filter.clone(), async move { load.await.map(Arc::new) })
            .await?;

        if self.generation.load(Ordering::SeqCst) != started {
            self.cache.invalidate(&filter).await;
        }
        Ok(rows)
    }

    pub fn invalidate_all(&self) {
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.cache.invalidate_all();
    }
}
