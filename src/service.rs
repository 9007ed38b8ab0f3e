//! Shared application state behind the HTTP handlers, the scheduler and the CLI.

use std::sync::{Arc, RwLock};

use tokio::sync::Mutex;
use tracing::{error, info, warn};

use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::pipeline::{Pipeline, PipelineHaltError, RunReport, RunTrigger};
use crate::store::{StoreError, TableStore};
use crate::utils::summary_cache::SummaryCache;

#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("a pipeline run is already in progress")]
    Busy,

    #[error(transparent)]
    Halted(#[from] PipelineHaltError),

    #[error(
        "pipeline run {} did not complete: {}",
        .0.run_id,
        .0.error.as_deref().unwrap_or("unknown")
    )]
    Aborted(Box<RunReport>),
}

impl TriggerError {
    /// Report of the run this error ended, if a run was started.
    pub fn report(&self) -> Option<&RunReport> {
        match self {
            TriggerError::Busy => None,
            TriggerError::Halted(halt) => Some(halt.report.as_ref()),
            TriggerError::Aborted(report) => Some(report.as_ref()),
        }
    }
}

pub struct PipelineService<S> {
    pipeline: Arc<Pipeline<S>>,
    run_lock: Arc<Mutex<()>>,
    latest: Arc<RwLock<Option<RunReport>>>,
    cache: SummaryCache,
}

/// What a spawned run needs once it no longer borrows the service.
struct RunContext<S> {
    pipeline: Arc<Pipeline<S>>,
    latest: Arc<RwLock<Option<RunReport>>>,
    cache: SummaryCache,
}

fn aborted(trigger: RunTrigger, reason: String) -> TriggerError {
    let mut report = RunReport::start(trigger);
    report.abort(reason);
    error!(
        run_id = %report.run_id,
        error = report.error.as_deref().unwrap_or_default(),
        "Pipeline run task did not complete"
    );
    TriggerError::Aborted(Box::new(report))
}

fn record_latest(latest: &RwLock<Option<RunReport>>, report: RunReport) {
    info!(run_id = %report.run_id, status = %report.status, "Run report recorded");
    match latest.write() {
        Ok(mut latest) => *latest = Some(report),
        Err(poisoned) => *poisoned.into_inner() = Some(report),
    }
}

impl<S: TableStore> RunContext<S> {
    async fn execute(
        self,
        trigger: RunTrigger,
        min_fiscal_year: Option<String>,
    ) -> Result<RunReport, TriggerError> {
        let pipeline = self.pipeline.clone();
        let run =
            tokio::spawn(async move { pipeline.run(trigger, min_fiscal_year.as_deref()).await });
        let result = match run.await {
            Ok(result) => result.map_err(TriggerError::from),
            Err(e) => Err(aborted(trigger, e.to_string())),
        };

        // Parameter failures never touch a table, anything later may have.
        let touched_data = !matches!(&result, Err(TriggerError::Halted(h)) if h.is_parameter_error());
        if touched_data {
            self.cache.invalidate_all();
        }

        let report = match &result {
            Ok(report) => Some(report),
            Err(e) => e.report(),
        };
        if let Some(report) = report {
            record_latest(&self.latest, report.clone());
        }

        result
    }
}

impl<S: TableStore> PipelineService<S> {
    pub fn new(pipeline: Pipeline<S>, cache: SummaryCache) -> Self {
        Self {
            pipeline: Arc::new(pipeline),
            run_lock: Arc::new(Mutex::new(())),
            latest: Arc::new(RwLock::new(None)),
            cache,
        }
    }

    pub fn is_running(&self) -> bool {
        self.run_lock.try_lock().is_err()
    }

    /// Run the pipeline unless another run holds the lock.
    ///
    /// The run executes on its own task, which owns the lock. Dropping the
    /// returned future does not stop the run; its report is still recorded.
    pub async fn trigger(
        &self,
        trigger: RunTrigger,
        min_fiscal_year: Option<&str>,
    ) -> Result<RunReport, TriggerError> {
        let Ok(guard) = self.run_lock.clone().try_lock_owned() else {
            warn!(trigger = %trigger, "Run rejected, another run is active");
            return Err(TriggerError::Busy);
        };

        let context = RunContext {
            pipeline: self.pipeline.clone(),
            latest: self.latest.clone(),
            cache: self.cache.clone(),
        };
        let min_fiscal_year = min_fiscal_year.map(str::to_string);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            context.execute(trigger, min_fiscal_year).await
        });

        match handle.await {
            Ok(result) => result,
            Err(e) => {
                let err = aborted(trigger, e.to_string());
                if let Some(report) = err.report() {
                    record_latest(&self.latest, report.clone());
                }
                Err(err)
            }
        }
    }

    pub fn latest_report(&self) -> Option<RunReport> {
        match self.latest.read() {
            Ok(latest) => latest.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Summary rows from the primary destination, served through the cache.
    /// Before the first run has written the table the result is empty.
    pub async fn query_summary(
        &self,
        filter: SummaryFilter,
    ) -> Result<Arc<Vec<SummaryRecord>>, Arc<StoreError>> {
        let primary = self.pipeline.sinks().primary();
        let store = primary.store().clone();
        let table = primary.table().to_string();
        let load_filter = filter.clone();

        self.cache
            .get_or_load(filter, async move {
                match store.query_summary(&table, &load_filter).await {
                    Err(StoreError::MissingTable(_)) => Ok(Vec::new()),
                    other => other,
                }
            })
            .await
    }

    #[cfg(test)]
    pub(crate) async fn hold_run_lock(&self) -> tokio::sync::OwnedMutexGuard<()> {
        self.run_lock.clone().lock_owned().await
    }
}

/// Service over in-memory stores reading sources from `data_dir`.
#[cfg(test)]
pub(crate) fn memory_service(data_dir: &std::path::Path) -> PipelineService<crate::store::MemoryStore> {
    use crate::pipeline::PipelineSettings;
    use crate::pipeline::reader::MalformedRecordPolicy;
    use crate::pipeline::sink::{DualSinkWriter, SummarySink};
    use crate::store::MemoryStore;

    let staging = Arc::new(MemoryStore::new("staging"));
    let mirror = Arc::new(MemoryStore::new("mirror"));
    let sinks = DualSinkWriter::new(
        SummarySink::new("primary", staging.clone()),
        SummarySink::new("mirror", mirror),
    );
    let settings = PipelineSettings {
        data_dir: data_dir.to_path_buf(),
        min_fiscal_year: Some("2021".to_string()),
        on_malformed_record: MalformedRecordPolicy::Abort,
    };
    PipelineService::new(
        Pipeline::new(staging, sinks, settings),
        SummaryCache::new(std::time::Duration::from_secs(60)),
    )
}
