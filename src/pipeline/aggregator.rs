//! Yearly per-agency pay totals from the two payroll extracts.
//!
//! The stages are plain functions over record iterators:
//! [`union`] -> [`passes_fiscal_year`] -> [`total_paid`] -> [`aggregate`].
//! [`run_aggregation`] wires them to the payroll tables in a store.

use std::collections::HashMap;

use tracing::{info, warn};

use crate::model::entity::SourceEntity;
use crate::model::payroll::PayrollRecord;
use crate::model::summary::SummaryRecord;
use crate::pipeline::errors::ParameterError;
use crate::pipeline::report::AggregationStats;
use crate::store::{StoreError, TableStore};

pub const DEFAULT_MIN_FISCAL_YEAR: i32 = 2021;

/// Validated aggregation parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregationParams {
    pub min_fiscal_year: i32,
}

impl Default for AggregationParams {
    fn default() -> Self {
        Self {
            min_fiscal_year: DEFAULT_MIN_FISCAL_YEAR,
        }
    }
}

impl AggregationParams {
    /// Parse `minFiscalYear` from its raw text form.
    pub fn parse(raw: Option<&str>) -> Result<Self, ParameterError> {
        let raw = raw.map(str::trim).unwrap_or("");
        if raw.is_empty() {
            return Err(ParameterError::Missing);
        }
        raw.parse()
            .map(|min_fiscal_year| Self { min_fiscal_year })
            .map_err(|_| ParameterError::NotInteger(raw.to_string()))
    }
}

/// Multiset append of both extracts. No dedup, no ordering guarantee.
pub fn union<'a, A, B>(first: A, second: B) -> impl Iterator<Item = &'a PayrollRecord>
where
    A: IntoIterator<Item = &'a PayrollRecord>,
    B: IntoIterator<Item = &'a PayrollRecord>,
{
    first.into_iter().chain(second)
}

/// A NULL fiscal year never passes.
pub fn passes_fiscal_year(record: &PayrollRecord, min_fiscal_year: i32) -> bool {
    record
        .fiscal_year
        .is_some_and(|year| year >= min_fiscal_year)
}

/// Regular gross + overtime + other pay, with NULL components as zero.
pub fn total_paid(record: &PayrollRecord) -> f64 {
    record.regular_gross_paid.unwrap_or(0.0)
        + record.total_ot_paid.unwrap_or(0.0)
        + record.total_other_pay.unwrap_or(0.0)
}

/// Filter, derive and sum per (agency name, fiscal year).
///
/// Output is sorted by fiscal year then agency name.
pub fn aggregate<'a, I>(records: I, min_fiscal_year: i32) -> Vec<SummaryRecord>
where
    I: IntoIterator<Item = &'a PayrollRecord>,
{
    let mut groups: HashMap<(String, i32), f64> = HashMap::new();

    for record in records {
        if !passes_fiscal_year(record, min_fiscal_year) {
            continue;
        }
        let Some(year) = record.fiscal_year else {
            continue;
        };
        *groups
            .entry((record.agency_name.clone(), year))
            .or_insert(0.0) += total_paid(record);
    }

    let mut summary: Vec<SummaryRecord> = groups
        .into_iter()
        .map(|((agency_name, fiscal_year), total_paid)| SummaryRecord {
            fiscal_year,
            agency_name,
            total_paid,
        })
        .collect();
    summary.sort_by(|a, b| {
        a.fiscal_year
            .cmp(&b.fiscal_year)
            .then_with(|| a.agency_name.cmp(&b.agency_name))
    });
    summary
}

/// Rows in `records` whose fiscal year is set and differs from `extract_year`.
fn count_outside_extract(records: &[PayrollRecord], extract_year: Option<i32>) -> u64 {
    let Some(expected) = extract_year else {
        return 0;
    };
    records
        .iter()
        .filter(|r| r.fiscal_year.is_some_and(|y| y != expected))
        .count() as u64
}

#[derive(Debug, Clone)]
pub struct AggregationOutput {
    pub summary: Vec<SummaryRecord>,
    pub stats: AggregationStats,
}

/// Read both payroll tables from `store` and aggregate them.
pub async fn run_aggregation<S: TableStore>(
    store: &S,
    params: AggregationParams,
) -> Result<AggregationOutput, StoreError> {
    let extracts = [SourceEntity::Payroll2020, SourceEntity::Payroll2021];
    let first: Vec<PayrollRecord> = store.fetch_all(extracts[0].table()).await?;
    let second: Vec<PayrollRecord> = store.fetch_all(extracts[1].table()).await?;

    let outside = count_outside_extract(&first, extracts[0].extract_year())
        + count_outside_extract(&second, extracts[1].extract_year());
    if outside > 0 {
        warn!(
            records = outside,
            "Payroll rows carry a fiscal year different from their extract"
        );
    }

    let records_in = (first.len() + second.len()) as u64;
    let included = union(&first, &second)
        .filter(|r| passes_fiscal_year(r, params.min_fiscal_year))
        .count() as u64;
    let summary = aggregate(union(&first, &second), params.min_fiscal_year);

    let stats = AggregationStats {
        min_fiscal_year: params.min_fiscal_year,
        records_in,
        records_excluded: records_in - included,
        records_outside_extract_year: outside,
        groups: summary.len() as u64,
    };

    info!(
        min_fiscal_year = stats.min_fiscal_year,
        records_in = stats.records_in,
        records_excluded = stats.records_excluded,
        groups = stats.groups,
        "Payroll aggregated"
    );

    Ok(AggregationOutput { summary, stats })
}
