use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::store::{ColumnDef, SqlType, TableRow};
use crate::utils::db_utils::SqlValue;

pub const SUMMARY_TABLE: &str = "payroll_summary";

/// Yearly pay total for one agency. Unique per (agency_name, fiscal_year).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
#[schema(
    example = json!({
        "fiscal_year": 2021,
        "agency_name": "POLICE DEPARTMENT",
        "total_paid": 82500.0
    })
)]
pub struct SummaryRecord {
    #[sqlx(rename = "FiscalYear")]
    pub fiscal_year: i32,

    #[sqlx(rename = "AgencyName")]
    pub agency_name: String,

    #[sqlx(rename = "TotalPaid")]
    pub total_paid: f64,
}

impl TableRow for SummaryRecord {
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::required("FiscalYear", SqlType::Int),
        ColumnDef::required("AgencyName", SqlType::VarChar(50)),
        ColumnDef::required("TotalPaid", SqlType::Double),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.fiscal_year.into(),
            self.agency_name.as_str().into(),
            self.total_paid.into(),
        ]
    }
}

/// Read-side filter over the summary table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct SummaryFilter {
    pub fiscal_year: Option<i32>,
    pub agency: Option<String>,
}

impl SummaryFilter {
    /// Agency matching is case-insensitive on the full name.
    pub fn matches(&self, record: &SummaryRecord) -> bool {
        if let Some(year) = self.fiscal_year {
            if record.fiscal_year != year {
                return false;
            }
        }
        match &self.agency {
            Some(agency) => record.agency_name.eq_ignore_ascii_case(agency),
            None => true,
        }
    }
}
