use serde::{Deserialize, Serialize};

use crate::model::fields::RowFields;
use crate::pipeline::errors::IngestError;
use crate::pipeline::reader::SourceRecord;
use crate::store::{ColumnDef, SqlType, TableRow};
use crate::utils::db_utils::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct AgencyMaster {
    #[sqlx(rename = "AgencyID")]
    pub agency_id: i32,
    #[sqlx(rename = "AgencyName")]
    pub agency_name: String,
}

impl TableRow for AgencyMaster {
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::required("AgencyID", SqlType::Int),
        ColumnDef::required("AgencyName", SqlType::VarChar(50)),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![self.agency_id.into(), self.agency_name.as_str().into()]
    }
}

impl SourceRecord for AgencyMaster {
    fn from_fields(fields: &RowFields<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            agency_id: fields.key(0, "AgencyID")?,
            agency_name: fields.text(1, "AgencyName", 50)?,
        })
    }
}
