#![allow(dead_code)]

use std::fs;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use payroll_pipeline::pipeline::reader::MalformedRecordPolicy;
use payroll_pipeline::pipeline::sink::{DualSinkWriter, SummarySink};
use payroll_pipeline::pipeline::{Pipeline, PipelineSettings};
use payroll_pipeline::service::PipelineService;
use payroll_pipeline::store::MemoryStore;
use payroll_pipeline::utils::summary_cache::SummaryCache;
use tempfile::TempDir;

const PAYROLL_HEADER: &str = "FiscalYear,PayrollNumber,AgencyID,AgencyName,EmployeeID,LastName,\
FirstName,AgencyStartDate,WorkLocationBorough,TitleCode,TitleDescription,LeaveStatus,BaseSalary,\
PayBasis,RegularHours,RegularGrossPaid,OTHours,TotalOTPaid,TotalOtherPay";

pub fn payroll_row(year: &str, agency: &str, gross: &str, ot: &str, other: &str) -> String {
    format!(
        "{year},17,056,{agency},1001,SMITH,JOHN,07/01/2015,BROOKLYN,70210,POLICE OFFICER,\
         ACTIVE,85000,per Annum,2080,{gross},10,{ot},{other}"
    )
}

pub fn payroll_file(rows: &[String]) -> String {
    let mut body = String::from(PAYROLL_HEADER);
    for row in rows {
        body.push('\n');
        body.push_str(row);
    }
    body.push('\n');
    body
}

/// Five source files: two NYPD rows and one FDNY row pass the 2021 filter.
pub fn write_sources(dir: &Path) {
    fs::write(
        dir.join("EmpMaster.csv"),
        "EmployeeID,LastName,FirstName\n1001,SMITH,JOHN\n1002,DOE,JANE\n",
    )
    .unwrap();
    fs::write(
        dir.join("AgencyMaster.csv"),
        "AgencyID,AgencyName\n56,POLICE DEPARTMENT\n57,FIRE DEPARTMENT\n",
    )
    .unwrap();
    fs::write(
        dir.join("TitleMaster.csv"),
        "TitleCode,TitleDescription\n70210,POLICE OFFICER\n",
    )
    .unwrap();
    fs::write(
        dir.join("nycpayroll_2020.csv"),
        payroll_file(&[
            payroll_row("2020", "POLICE DEPARTMENT", "40000", "100", "0"),
            payroll_row("2020", "FIRE DEPARTMENT", "1000", "", ""),
        ]),
    )
    .unwrap();
    fs::write(
        dir.join("nycpayroll_2021.csv"),
        payroll_file(&[
            payroll_row("2021", "POLICE DEPARTMENT", "50000", "2000", "0"),
            payroll_row("2021", "POLICE DEPARTMENT", "30000", "0", "500"),
            payroll_row("2021", "FIRE DEPARTMENT", "", "150.5", ""),
            payroll_row("N/A", "POLICE DEPARTMENT", "99999", "0", "0"),
        ]),
    )
    .unwrap();
}

pub struct Fixture {
    pub dir: TempDir,
    pub staging: Arc<MemoryStore>,
    pub mirror: Arc<MemoryStore>,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        write_sources(dir.path());
        Self {
            dir,
            staging: Arc::new(MemoryStore::new("staging")),
            mirror: Arc::new(MemoryStore::new("mirror")),
        }
    }

    pub fn pipeline(&self, policy: MalformedRecordPolicy) -> Pipeline<MemoryStore> {
        let sinks = DualSinkWriter::new(
            SummarySink::new("primary", self.staging.clone()),
            SummarySink::new("mirror", self.mirror.clone()),
        );
        Pipeline::new(
            self.staging.clone(),
            sinks,
            PipelineSettings {
                data_dir: self.dir.path().to_path_buf(),
                min_fiscal_year: Some("2021".to_string()),
                on_malformed_record: policy,
            },
        )
    }

    pub fn service(&self) -> Arc<PipelineService<MemoryStore>> {
        Arc::new(PipelineService::new(
            self.pipeline(MalformedRecordPolicy::Abort),
            SummaryCache::new(Duration::from_secs(60)),
        ))
    }
}
