//! Error taxonomy for a pipeline run.

use std::path::PathBuf;

use crate::model::entity::SourceEntity;
use crate::pipeline::report::{RunReport, RunStep};
use crate::store::StoreError;

/// Failures while reading a source file.
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("source '{entity}' unavailable at {}: {source}", .path.display())]
    SourceUnavailable {
        entity: SourceEntity,
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("malformed record in '{entity}' at line {line}: {reason}")]
    MalformedRecord {
        entity: SourceEntity,
        line: u64,
        reason: String,
    },
}

impl IngestError {
    pub fn malformed(entity: SourceEntity, line: u64, reason: impl Into<String>) -> Self {
        IngestError::MalformedRecord {
            entity,
            line,
            reason: reason.into(),
        }
    }

    pub fn is_malformed(&self) -> bool {
        matches!(self, IngestError::MalformedRecord { .. })
    }
}

/// `minFiscalYear` could not be turned into an integer.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParameterError {
    #[error("minFiscalYear is missing")]
    Missing,

    #[error("minFiscalYear must be an integer, got '{0}'")]
    NotInteger(String),
}

/// Failure of one source-to-table load.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error(transparent)]
    Ingest(#[from] IngestError),

    #[error("writing '{entity}' to table '{table}' failed: {source}")]
    Store {
        entity: SourceEntity,
        table: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("load task for '{entity}' did not complete: {reason}")]
    Task { entity: SourceEntity, reason: String },
}

/// A summary sink could not be written. Never affects the sibling sink.
#[derive(Debug, thiserror::Error)]
#[error("summary sink '{sink}' write failed: {source}")]
pub struct DestinationWriteError {
    pub sink: String,
    #[source]
    pub source: StoreError,
}

/// Why a run stopped.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("invalid pipeline parameter: {0}")]
    Parameter(#[from] ParameterError),

    #[error("{} source load(s) failed: {}", .0.len(), join_messages(.0))]
    Load(Vec<LoadError>),

    #[error("aggregation failed: {0}")]
    Aggregation(#[source] StoreError),

    #[error("{}", join_messages(.0))]
    Sink(Vec<DestinationWriteError>),
}

fn join_messages<E: std::fmt::Display>(errors: &[E]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// A run halted at `step`. Carries the partial report so the trigger can
/// see what completed before the failure.
#[derive(Debug, thiserror::Error)]
#[error("pipeline run {} halted at {step}: {error}", .report.run_id)]
pub struct PipelineHaltError {
    pub step: RunStep,
    pub error: PipelineError,
    pub report: Box<RunReport>,
}

impl PipelineHaltError {
    pub fn is_parameter_error(&self) -> bool {
        matches!(self.error, PipelineError::Parameter(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_record_names_entity_and_line() {
        let err = IngestError::malformed(SourceEntity::Agency, 7, "expected 2 fields, found 3");
        let msg = err.to_string();
        assert!(msg.contains("agency"), "got: {msg}");
        assert!(msg.contains("line 7"), "got: {msg}");
        assert!(err.is_malformed());
    }

    #[test]
    fn parameter_error_quotes_raw_value() {
        let err = ParameterError::NotInteger("twenty".to_string());
        assert_eq!(
            err.to_string(),
            "minFiscalYear must be an integer, got 'twenty'"
        );
    }

    #[test]
    fn sink_error_lists_every_failed_sink() {
        let err = PipelineError::Sink(vec![
            DestinationWriteError {
                sink: "primary".to_string(),
                source: StoreError::LockPoisoned,
            },
            DestinationWriteError {
                sink: "mirror".to_string(),
                source: StoreError::MissingTable("payroll_summary".to_string()),
            },
        ]);
        let msg = err.to_string();
        assert!(msg.contains("'primary'"));
        assert!(msg.contains("'mirror'"));
    }
}
