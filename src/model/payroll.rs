use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::model::fields::RowFields;
use crate::pipeline::errors::IngestError;
use crate::pipeline::reader::SourceRecord;
use crate::store::{ColumnDef, SqlType, TableRow};
use crate::utils::db_utils::SqlValue;

/// One line of a fiscal-year payroll extract.
///
/// Numeric columns are nullable: blank or non-numeric source text loads as
/// NULL and counts as zero when pay is summed.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct PayrollRecord {
    #[sqlx(rename = "FiscalYear")]
    pub fiscal_year: Option<i32>,
    #[sqlx(rename = "PayrollNumber")]
    pub payroll_number: Option<i32>,
    #[sqlx(rename = "AgencyID")]
    pub agency_id: String,
    #[sqlx(rename = "AgencyName")]
    pub agency_name: String,
    #[sqlx(rename = "EmployeeID")]
    pub employee_id: String,
    #[sqlx(rename = "LastName")]
    pub last_name: String,
    #[sqlx(rename = "FirstName")]
    pub first_name: String,
    #[sqlx(rename = "AgencyStartDate")]
    pub agency_start_date: Option<NaiveDate>,
    #[sqlx(rename = "WorkLocationBorough")]
    pub work_location_borough: String,
    #[sqlx(rename = "TitleCode")]
    pub title_code: String,
    #[sqlx(rename = "TitleDescription")]
    pub title_description: String,
    #[sqlx(rename = "LeaveStatus")]
    pub leave_status: String,
    #[sqlx(rename = "BaseSalary")]
    pub base_salary: Option<f64>,
    #[sqlx(rename = "PayBasis")]
    pub pay_basis: String,
    #[sqlx(rename = "RegularHours")]
    pub regular_hours: Option<f64>,
    #[sqlx(rename = "RegularGrossPaid")]
    pub regular_gross_paid: Option<f64>,
    #[sqlx(rename = "OTHours")]
    pub ot_hours: Option<f64>,
    #[sqlx(rename = "TotalOTPaid")]
    pub total_ot_paid: Option<f64>,
    #[sqlx(rename = "TotalOtherPay")]
    pub total_other_pay: Option<f64>,
}

impl TableRow for PayrollRecord {
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::nullable("FiscalYear", SqlType::Int),
        ColumnDef::nullable("PayrollNumber", SqlType::Int),
        ColumnDef::required("AgencyID", SqlType::VarChar(10)),
        ColumnDef::required("AgencyName", SqlType::VarChar(50)),
        ColumnDef::required("EmployeeID", SqlType::VarChar(10)),
        ColumnDef::required("LastName", SqlType::VarChar(20)),
        ColumnDef::required("FirstName", SqlType::VarChar(20)),
        ColumnDef::nullable("AgencyStartDate", SqlType::Date),
        ColumnDef::required("WorkLocationBorough", SqlType::VarChar(50)),
        ColumnDef::required("TitleCode", SqlType::VarChar(10)),
        ColumnDef::required("TitleDescription", SqlType::VarChar(100)),
        ColumnDef::required("LeaveStatus", SqlType::VarChar(50)),
        ColumnDef::nullable("BaseSalary", SqlType::Double),
        ColumnDef::required("PayBasis", SqlType::VarChar(50)),
        ColumnDef::nullable("RegularHours", SqlType::Double),
        ColumnDef::nullable("RegularGrossPaid", SqlType::Double),
        ColumnDef::nullable("OTHours", SqlType::Double),
        ColumnDef::nullable("TotalOTPaid", SqlType::Double),
        ColumnDef::nullable("TotalOtherPay", SqlType::Double),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.fiscal_year.into(),
            self.payroll_number.into(),
            self.agency_id.as_str().into(),
            self.agency_name.as_str().into(),
            self.employee_id.as_str().into(),
            self.last_name.as_str().into(),
            self.first_name.as_str().into(),
            self.agency_start_date.into(),
            self.work_location_borough.as_str().into(),
            self.title_code.as_str().into(),
            self.title_description.as_str().into(),
            self.leave_status.as_str().into(),
            self.base_salary.into(),
            self.pay_basis.as_str().into(),
            self.regular_hours.into(),
            self.regular_gross_paid.into(),
            self.ot_hours.into(),
            self.total_ot_paid.into(),
            self.total_other_pay.into(),
        ]
    }
}

impl SourceRecord for PayrollRecord {
    fn from_fields(fields: &RowFields<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            fiscal_year: fields.lenient_int(0),
            payroll_number: fields.lenient_int(1),
            agency_id: fields.text(2, "AgencyID", 10)?,
            agency_name: fields.text(3, "AgencyName", 50)?,
            employee_id: fields.text(4, "EmployeeID", 10)?,
            last_name: fields.text(5, "LastName", 20)?,
            first_name: fields.text(6, "FirstName", 20)?,
            agency_start_date: fields.date(7),
            work_location_borough: fields.text(8, "WorkLocationBorough", 50)?,
            title_code: fields.text(9, "TitleCode", 10)?,
            title_description: fields.text(10, "TitleDescription", 100)?,
            leave_status: fields.text(11, "LeaveStatus", 50)?,
            base_salary: fields.amount(12),
            pay_basis: fields.text(13, "PayBasis", 50)?,
            regular_hours: fields.amount(14),
            regular_gross_paid: fields.amount(15),
            ot_hours: fields.amount(16),
            total_ot_paid: fields.amount(17),
            total_other_pay: fields.amount(18),
        })
    }
}
