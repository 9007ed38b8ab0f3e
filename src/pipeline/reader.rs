//! Ingestion reader: typed records from a comma-separated source file.
//!
//! The header row is skipped. Each call to [`SourceReader::records`] opens the
//! file again, so a source can be re-read and yields the same sequence.

use std::fs::File;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, StringRecordsIntoIter, Trim};
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use tracing::warn;

use crate::model::entity::SourceEntity;
use crate::model::fields::RowFields;
use crate::pipeline::errors::IngestError;
use crate::store::TableRow;

/// A table row that can be parsed from one CSV row laid out in `COLUMNS` order.
pub trait SourceRecord: TableRow {
    fn from_fields(fields: &RowFields<'_>) -> Result<Self, IngestError>;
}

/// What to do with a row that has the wrong field count or a bad value.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case", ascii_case_insensitive)]
pub enum MalformedRecordPolicy {
    /// Log the row and continue.
    Skip,
    /// Fail the whole entity load.
    #[default]
    Abort,
}

#[derive(Debug, Clone)]
pub struct SourceReader {
    entity: SourceEntity,
    path: PathBuf,
    policy: MalformedRecordPolicy,
}

/// Everything read from one source.
#[derive(Debug)]
pub struct ReadOutcome<T> {
    pub records: Vec<T>,
    pub skipped: u64,
}

impl SourceReader {
    pub fn new(entity: SourceEntity, path: impl Into<PathBuf>, policy: MalformedRecordPolicy) -> Self {
        Self {
            entity,
            path: path.into(),
            policy,
        }
    }

    /// Reader for `entity` using its default file name under `data_dir`.
    pub fn in_dir(entity: SourceEntity, data_dir: &Path, policy: MalformedRecordPolicy) -> Self {
        Self::new(entity, data_dir.join(entity.file_name()), policy)
    }

    pub fn entity(&self) -> SourceEntity {
        self.entity
    }

    /// Open the source and return a lazy record iterator.
    pub fn records<T: SourceRecord>(&self) -> Result<SourceRecords<T>, IngestError> {
        let reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .trim(Trim::All)
            .from_path(&self.path)
            .map_err(|source| IngestError::SourceUnavailable {
                entity: self.entity,
                path: self.path.clone(),
                source,
            })?;

        Ok(SourceRecords {
            entity: self.entity,
            path: self.path.clone(),
            policy: self.policy,
            rows: reader.into_records(),
            skipped: 0,
            _record: PhantomData,
        })
    }

    /// Drain the source into memory.
    pub fn read_all<T: SourceRecord>(&self) -> Result<ReadOutcome<T>, IngestError> {
        let mut iter = self.records::<T>()?;
        let mut records = Vec::new();
        for record in iter.by_ref() {
            records.push(record?);
        }
        Ok(ReadOutcome {
            records,
            skipped: iter.skipped(),
        })
    }
}

pub struct SourceRecords<T> {
    entity: SourceEntity,
    path: PathBuf,
    policy: MalformedRecordPolicy,
    rows: StringRecordsIntoIter<File>,
    skipped: u64,
    _record: PhantomData<T>,
}

impl<T> SourceRecords<T> {
    /// Rows dropped so far under [`MalformedRecordPolicy::Skip`].
    pub fn skipped(&self) -> u64 {
        self.skipped
    }
}

impl<T: SourceRecord> SourceRecords<T> {
    fn parse(&self, row: Result<csv::StringRecord, csv::Error>) -> Result<T, IngestError> {
        let row = match row {
            Ok(row) => row,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(IngestError::SourceUnavailable {
                    entity: self.entity,
                    path: self.path.clone(),
                    source: e,
                });
            }
            Err(e) => {
                let line = e.position().map(|p| p.line()).unwrap_or(0);
                return Err(IngestError::malformed(self.entity, line, e.to_string()));
            }
        };

        let line = row.position().map(|p| p.line()).unwrap_or(0);
        let expected = T::COLUMNS.len();
        if row.len() != expected {
            return Err(IngestError::malformed(
                self.entity,
                line,
                format!("expected {} fields, found {}", expected, row.len()),
            ));
        }

        T::from_fields(&RowFields::new(self.entity, line, &row))
    }
}

impl<T: SourceRecord> Iterator for SourceRecords<T> {
    type Item = Result<T, IngestError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let row = self.rows.next()?;
            match self.parse(row) {
                Ok(record) => return Some(Ok(record)),
                Err(e) if e.is_malformed() && self.policy == MalformedRecordPolicy::Skip => {
                    self.skipped += 1;
                    warn!(entity = %self.entity, error = %e, "Skipping malformed record");
                }
                Err(e) => return Some(Err(e)),
            }
        }
    }
}
