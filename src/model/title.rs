use serde::{Deserialize, Serialize};

use crate::model::fields::RowFields;
use crate::pipeline::errors::IngestError;
use crate::pipeline::reader::SourceRecord;
use crate::store::{ColumnDef, SqlType, TableRow};
use crate::utils::db_utils::SqlValue;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TitleMaster {
    #[sqlx(rename = "TitleCode")]
    pub title_code: i32,
    #[sqlx(rename = "TitleDescription")]
    pub title_description: String,
}

impl TableRow for TitleMaster {
    const COLUMNS: &'static [ColumnDef] = &[
        ColumnDef::required("TitleCode", SqlType::Int),
        ColumnDef::required("TitleDescription", SqlType::VarChar(100)),
    ];

    fn values(&self) -> Vec<SqlValue> {
        vec![self.title_code.into(), self.title_description.as_str().into()]
    }
}

impl SourceRecord for TitleMaster {
    fn from_fields(fields: &RowFields<'_>) -> Result<Self, IngestError> {
        Ok(Self {
            title_code: fields.key(0, "TitleCode")?,
            title_description: fields.text(1, "TitleDescription", 100)?,
        })
    }
}
