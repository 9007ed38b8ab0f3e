use serde::Serialize;
use strum_macros::{AsRefStr, Display, EnumIter};
use utoipa::ToSchema;

/// The five source files the pipeline ingests, one table each.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, ToSchema, Display, AsRefStr, EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SourceEntity {
    Employee,
    Agency,
    Title,
    #[serde(rename = "payroll_2020")]
    #[strum(serialize = "payroll_2020")]
    Payroll2020,
    #[serde(rename = "payroll_2021")]
    #[strum(serialize = "payroll_2021")]
    Payroll2021,
}

impl SourceEntity {
    pub fn table(&self) -> &'static str {
        match self {
            SourceEntity::Employee => "employee_master",
            SourceEntity::Agency => "agency_master",
            SourceEntity::Title => "title_master",
            SourceEntity::Payroll2020 => "payroll_2020",
            SourceEntity::Payroll2021 => "payroll_2021",
        }
    }

    pub fn file_name(&self) -> &'static str {
        match self {
            SourceEntity::Employee => "EmpMaster.csv",
            SourceEntity::Agency => "AgencyMaster.csv",
            SourceEntity::Title => "TitleMaster.csv",
            SourceEntity::Payroll2020 => "nycpayroll_2020.csv",
            SourceEntity::Payroll2021 => "nycpayroll_2021.csv",
        }
    }

    /// Fiscal year a payroll extract is named for.
    pub fn extract_year(&self) -> Option<i32> {
        match self {
            SourceEntity::Payroll2020 => Some(2020),
            SourceEntity::Payroll2021 => Some(2021),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use strum::IntoEnumIterator;

    #[test]
    fn every_entity_has_its_own_table() {
        let tables: HashSet<_> = SourceEntity::iter().map(|e| e.table()).collect();
        assert_eq!(tables.len(), 5);
    }

    #[test]
    fn display_is_snake_case() {
        assert_eq!(SourceEntity::Payroll2021.to_string(), "payroll_2021");
        assert_eq!(SourceEntity::Employee.as_ref(), "employee");
    }
}
