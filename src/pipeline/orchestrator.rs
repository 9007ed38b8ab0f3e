//! Runs the pipeline: validate -> parallel loads -> aggregate -> dual sink.

use std::path::PathBuf;
use std::sync::Arc;

use futures::future::join_all;
use strum::IntoEnumIterator;
use tokio::task::JoinHandle;
use tracing::{error, info};

use crate::model::agency::AgencyMaster;
use crate::model::employee::EmployeeMaster;
use crate::model::entity::SourceEntity;
use crate::model::payroll::PayrollRecord;
use crate::model::title::TitleMaster;
use crate::pipeline::aggregator::{AggregationParams, run_aggregation};
use crate::pipeline::errors::{LoadError, PipelineError, PipelineHaltError};
use crate::pipeline::loader::load_entity;
use crate::pipeline::reader::{MalformedRecordPolicy, SourceReader};
use crate::pipeline::report::{LoadSummary, RunReport, RunStep, RunTrigger};
use crate::pipeline::sink::DualSinkWriter;
use crate::store::TableStore;

#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Directory holding the five source files.
    pub data_dir: PathBuf,
    /// Raw `minFiscalYear` used when a trigger does not supply one.
    pub min_fiscal_year: Option<String>,
    pub on_malformed_record: MalformedRecordPolicy,
}

pub struct Pipeline<S> {
    staging: Arc<S>,
    sinks: DualSinkWriter<S>,
    settings: PipelineSettings,
}

fn spawn_load<S: TableStore>(
    entity: SourceEntity,
    store: Arc<S>,
    reader: SourceReader,
) -> JoinHandle<Result<LoadSummary, LoadError>> {
    match entity {
        SourceEntity::Employee => tokio::spawn(load_entity::<S, EmployeeMaster>(store, reader)),
        SourceEntity::Agency => tokio::spawn(load_entity::<S, AgencyMaster>(store, reader)),
        SourceEntity::Title => tokio::spawn(load_entity::<S, TitleMaster>(store, reader)),
        SourceEntity::Payroll2020 | SourceEntity::Payroll2021 => {
            tokio::spawn(load_entity::<S, PayrollRecord>(store, reader))
        }
    }
}

fn failed_load(entity: SourceEntity, error: &LoadError) -> LoadSummary {
    LoadSummary {
        entity,
        table: entity.table().to_string(),
        records_read: 0,
        records_skipped: 0,
        records_written: 0,
        duration_secs: 0.0,
        error: Some(error.to_string()),
    }
}

fn halt(mut report: RunReport, step: RunStep, error: PipelineError) -> PipelineHaltError {
    report.fail(step, error.to_string());
    error!(
        run_id = %report.run_id,
        step = %step,
        error = %error,
        "Pipeline run halted"
    );
    PipelineHaltError {
        step,
        error,
        report: Box::new(report),
    }
}

impl<S: TableStore> Pipeline<S> {
    pub fn new(staging: Arc<S>, sinks: DualSinkWriter<S>, settings: PipelineSettings) -> Self {
        Self {
            staging,
            sinks,
            settings,
        }
    }

    pub fn sinks(&self) -> &DualSinkWriter<S> {
        &self.sinks
    }

    /// Execute one run. `min_fiscal_year` overrides the configured default.
    ///
    /// # Errors
    ///
    /// Returns a [`PipelineHaltError`] naming the first failed step. Tables
    /// written before the failure keep their new contents.
    pub async fn run(
        &self,
        trigger: RunTrigger,
        min_fiscal_year: Option<&str>,
    ) -> Result<RunReport, PipelineHaltError> {
        let mut report = RunReport::start(trigger);
        info!(run_id = %report.run_id, trigger = %trigger, "Pipeline run started");

        let raw = min_fiscal_year.or(self.settings.min_fiscal_year.as_deref());
        let params = match AggregationParams::parse(raw) {
            Ok(params) => params,
            Err(e) => return Err(halt(report, RunStep::Validate, e.into())),
        };

        let mut failures = Vec::new();
        for (entity, result) in self.load_sources().await {
            match result {
                Ok(summary) => report.loads.push(summary),
                Err(e) => {
                    report.loads.push(failed_load(entity, &e));
                    failures.push(e);
                }
            }
        }
        if !failures.is_empty() {
            return Err(halt(report, RunStep::Load, PipelineError::Load(failures)));
        }

        let output = match run_aggregation(self.staging.as_ref(), params).await {
            Ok(output) => output,
            Err(e) => return Err(halt(report, RunStep::Aggregate, PipelineError::Aggregation(e))),
        };
        report.aggregation = Some(output.stats);

        let outcome = self.sinks.write(&output.summary).await;
        report.sinks = outcome.summaries();
        if let Err(failures) = outcome.into_result() {
            return Err(halt(report, RunStep::Sink, PipelineError::Sink(failures)));
        }

        report.succeed();
        info!(
            run_id = %report.run_id,
            summary_rows = output.summary.len(),
            "Pipeline run succeeded"
        );
        Ok(report)
    }

    /// Load all five sources concurrently and wait for every one of them.
    /// A failed load does not cancel its siblings.
    async fn load_sources(&self) -> Vec<(SourceEntity, Result<LoadSummary, LoadError>)> {
        let handles: Vec<_> = SourceEntity::iter()
            .map(|entity| {
                let reader = SourceReader::in_dir(
                    entity,
                    &self.settings.data_dir,
                    self.settings.on_malformed_record,
                );
                (entity, spawn_load(entity, self.staging.clone(), reader))
            })
            .collect();

        join_all(handles.into_iter().map(|(entity, handle)| async move {
            let result = match handle.await {
                Ok(result) => result,
                Err(join_err) => Err(LoadError::Task {
                    entity,
                    reason: join_err.to_string(),
                }),
            };
            if let Err(e) = &result {
                error!(entity = %entity, error = %e, "Source load failed");
            }
            (entity, result)
        }))
        .await
    }
}
