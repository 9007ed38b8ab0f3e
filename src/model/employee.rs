use serde::{Deserialize, Serialize};

use crate::model::fields::RowFields;
use crate::pipeline::errors::IngestError;
use crate::pipeline::reader::SourceRecord;
use crate::store::{ColumnDef, SqlType, TableRow};
use crate::utils::db_utils::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct EmployeeMaster {
    #[sqlx(rename = "EmployeeID")]
    pub employee_id: i32,

    #[sqlx(rename = "LastName")]
    pub last_name: String,

    #[sqlx(rename = "FirstName")]
    pub first_name: String,
}

impl TableRow for EmployeeMaster {
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::required("EmployeeID", SqlType::Int),
        ColumnDef::required("LastName", SqlType::VarChar(20)),
        ColumnDef::required("FirstName", SqlType::VarChar(20)),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![
            self.employee_id.into(),
            self.last_name.as_str().into(),
            self.first_name.as_str().into(),
        ]
    }
}

impl SourceRecord for EmployeeMaster {
    fn from_fields(fields: &RowFields<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            employee_id: fields.key(0, "EmployeeID")?,
            last_name: fields.text(1, "LastName", 20)?,
            first_name: fields.text(2, "FirstName", 20)?,
        })
    }
}
