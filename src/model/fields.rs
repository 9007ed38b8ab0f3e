//! Typed access to the fields of one CSV row.

use chrono::NaiveDate;
use csv::StringRecord;

use crate::model::entity::SourceEntity;
use crate::pipeline::errors::IngestError;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y"];

pub struct RowFields<'a> {
    entity: SourceEntity,
    line: u64,
    record: &'a StringRecord,
}

impl<'a> RowFields<'a> {
    pub fn new(entity: SourceEntity, line: u64, record: &'a StringRecord) -> Self {
        Self {
            entity,
            line,
            record,
        }
    }

    pub fn line(&self) -> u64 {
        self.line
    }

    fn raw(&self, idx: usize) -> &'a str {
        self.record.get(idx).map(str::trim).unwrap_or("")
    }

    fn malformed(&self, reason: String) -> IngestError {
        IngestError::malformed(self.entity, self.line, reason)
    }

    /// Text column bounded by its VARCHAR length.
    pub fn text(&self, idx: usize, column: &str, max_len: usize) -> Result<String, IngestError> {
        let value = self.raw(idx);
        let len = value.chars().count();
        if len > max_len {
            return Err(self.malformed(format!(
                "{} is {} characters, limit is {}",
                column, len, max_len
            )));
        }
        Ok(value.to_string())
    }

    /// Key column; must be an integer.
    pub fn key(&self, idx: usize, column: &str) -> Result<i32, IngestError> {
        let value = self.raw(idx);
        value
            .parse()
            .map_err(|_| self.malformed(format!("{} '{}' is not an integer", column, value)))
    }

    /// Integer column where blank or non-numeric text reads as NULL.
    pub fn lenient_int(&self, idx: usize) -> Option<i32> {
        parse_int(self.raw(idx))
    }

    /// Amount column where blank or non-numeric text reads as NULL.
    pub fn amount(&self, idx: usize) -> Option<f64> {
        parse_amount(self.raw(idx))
    }

    pub fn date(&self, idx: usize) -> Option<NaiveDate> {
        parse_date(self.raw(idx))
    }
}

pub fn parse_int(value: &str) -> Option<i32> {
    value.trim().parse().ok()
}

/// Accepts plain decimals and thousands separators ("1,250.00").
/// NaN and infinities are rejected.
pub fn parse_amount(value: &str) -> Option<f64> {
    let cleaned = value.trim().replace(',', "");
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

pub fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(value, fmt).ok())
}
