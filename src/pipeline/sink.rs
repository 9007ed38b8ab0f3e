//! Dual sink writer: the summary goes to two independent destinations.

use std::sync::Arc;

use tracing::{error, info};

use crate::model::summary::{SUMMARY_TABLE, SummaryRecord};
use crate::pipeline::errors::DestinationWriteError;
use crate::pipeline::report::SinkSummary;
use crate::store::TableStore;

/// One named summary destination.
pub struct SummarySink<S> {
    name: String,
    store: Arc<S>,
    table: String,
}

impl<S: TableStore> SummarySink<S> {
    pub fn new(name: impl Into<String>, store: Arc<S>) -> Self {
        Self {
            name: name.into(),
            store,
            table: SUMMARY_TABLE.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    /// Truncate-then-insert of the full summary.
    pub async fn write(&self, rows: &[SummaryRecord]) -> Result<u64, DestinationWriteError> {
        self.store
            .replace_table(&self.table, rows)
            .await
            .map_err(|source| DestinationWriteError {
                sink: self.name.clone(),
                source,
            })
    }
}

/// Result of writing to both sinks. Each entry is independent.
#[derive(Debug)]
pub struct DualSinkOutcome {
    pub primary: Result<u64, DestinationWriteError>,
    pub mirror: Result<u64, DestinationWriteError>,
    primary_name: String,
    mirror_name: String,
}

impl DualSinkOutcome {
    pub fn summaries(&self) -> Vec<SinkSummary> {
        [
            (&self.primary_name, &self.primary),
            (&self.mirror_name, &self.mirror),
        ]
        .into_iter()
        .map(|(name, result)| SinkSummary {
            sink: name.clone(),
            rows_written: *result.as_ref().unwrap_or(&0),
            error: result.as_ref().err().map(|e| e.to_string()),
        })
        .collect()
    }

    /// All failures, or `Ok` when both sinks were written.
    pub fn into_result(self) -> Result<(), Vec<DestinationWriteError>> {
        let failures: Vec<_> = [self.primary, self.mirror]
            .into_iter()
            .filter_map(Result::err)
            .collect();
        if failures.is_empty() {
            Ok(())
        } else {
            Err(failures)
        }
    }
}

pub struct DualSinkWriter<S> {
    primary: SummarySink<S>,
    mirror: SummarySink<S>,
}

impl<S: TableStore> DualSinkWriter<S> {
    pub fn new(primary: SummarySink<S>, mirror: SummarySink<S>) -> Self {
        Self { primary, mirror }
    }

    /// The destination the query surface reads from.
    pub fn primary(&self) -> &SummarySink<S> {
        &self.primary
    }

    /// Write `rows` to both sinks concurrently. A failure in one sink does
    /// not stop or undo the other.
    pub async fn write(&self, rows: &[SummaryRecord]) -> DualSinkOutcome {
        let (primary, mirror) = tokio::join!(self.primary.write(rows), self.mirror.write(rows));

        for (sink, result) in [(&self.primary, &primary), (&self.mirror, &mirror)] {
            match result {
                Ok(written) => info!(sink = sink.name(), rows = written, "Summary written"),
                Err(e) => error!(sink = sink.name(), error = %e, "Summary write failed"),
            }
        }

        DualSinkOutcome {
            primary,
            mirror,
            primary_name: self.primary.name.clone(),
            mirror_name: self.mirror.name.clone(),
        }
    }
}
