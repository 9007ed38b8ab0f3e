//! Per-run reporting surfaced to whoever triggered the run.

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::model::entity::SourceEntity;

/// Who started a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunTrigger {
    Manual,
    Scheduled,
    Cli,
}

/// Pipeline stage, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStep {
    Validate,
    Load,
    Aggregate,
    Sink,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum RunStatus {
    Running,
    Succeeded,
    Failed,
}

/// Outcome of one source-to-table load.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct LoadSummary {
    pub entity: SourceEntity,
    pub table: String,
    pub records_read: u64,
    pub records_skipped: u64,
    pub records_written: u64,
    pub duration_secs: f64,
    /// Set when the load failed.
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct AggregationStats {
    pub min_fiscal_year: i32,
    /// Rows in the union of both payroll tables.
    pub records_in: u64,
    pub records_excluded: u64,
    /// Rows whose fiscal year differs from their extract's year.
    pub records_outside_extract_year: u64,
    pub groups: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct SinkSummary {
    pub sink: String,
    pub rows_written: u64,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct RunReport {
    pub run_id: Uuid,
    pub trigger: RunTrigger,
    pub status: RunStatus,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub loads: Vec<LoadSummary>,
    pub aggregation: Option<AggregationStats>,
    pub sinks: Vec<SinkSummary>,
    pub failed_step: Option<RunStep>,
    pub error: Option<String>,
}

impl RunReport {
    pub fn start(trigger: RunTrigger) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            trigger,
            status: RunStatus::Running,
            started_at: Utc::now(),
            finished_at: None,
            loads: Vec::new(),
            aggregation: None,
            sinks: Vec::new(),
            failed_step: None,
            error: None,
        }
    }

    pub fn succeed(&mut self) {
        self.status = RunStatus::Succeeded;
        self.finished_at = Some(Utc::now());
    }

    pub fn fail(&mut self, step: RunStep, error: String) {
        self.status = RunStatus::Failed;
        self.failed_step = Some(step);
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    /// The run task died before the pipeline returned. No step is blamed.
    pub fn abort(&mut self, error: String) {
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.finished_at = Some(Utc::now());
    }

    pub fn is_success(&self) -> bool {
        self.status == RunStatus::Succeeded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failing_a_run_records_step_and_error() {
        let mut report = RunReport::start(RunTrigger::Manual);
        assert_eq!(report.status, RunStatus::Running);

        report.fail(RunStep::Sink, "mirror down".to_string());

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_step, Some(RunStep::Sink));
        assert!(report.finished_at.is_some());
        assert!(!report.is_success());
    }

    #[test]
    fn aborted_run_has_no_failed_step() {
        let mut report = RunReport::start(RunTrigger::Scheduled);
        report.abort("task panicked".to_string());

        assert_eq!(report.status, RunStatus::Failed);
        assert_eq!(report.failed_step, None);
        assert_eq!(report.error.as_deref(), Some("task panicked"));
    }

    #[test]
    fn report_serializes_enums_as_snake_case() {
        let mut report = RunReport::start(RunTrigger::Scheduled);
        report.succeed();
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["trigger"], "scheduled");
        assert_eq!(json["status"], "succeeded");
    }
}
