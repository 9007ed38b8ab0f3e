mod common;

use std::collections::HashSet;
use std::fs;

use common::{Fixture, payroll_file, payroll_row};
use payroll_pipeline::model::entity::SourceEntity;
use payroll_pipeline::model::payroll::PayrollRecord;
use payroll_pipeline::model::summary::{SUMMARY_TABLE, SummaryRecord};
use payroll_pipeline::model::title::TitleMaster;
use payroll_pipeline::pipeline::reader::MalformedRecordPolicy;
use payroll_pipeline::pipeline::report::RunStep;
use payroll_pipeline::pipeline::{PipelineError, RunTrigger};
use payroll_pipeline::store::TableStore;

fn keyed(rows: &[SummaryRecord]) -> HashSet<(i32, String, u64)> {
    rows.iter()
        .map(|r| (r.fiscal_year, r.agency_name.clone(), r.total_paid.to_bits()))
        .collect()
}

#[tokio::test]
async fn full_run_writes_same_summary_to_both_sinks() {
    let fx = Fixture::new();

    let report = fx
        .pipeline(MalformedRecordPolicy::Abort)
        .run(RunTrigger::Manual, None)
        .await
        .unwrap();

    assert!(report.is_success());
    assert_eq!(report.loads.len(), 5);

    let primary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();
    let mirror: Vec<SummaryRecord> = fx.mirror.fetch_all(SUMMARY_TABLE).await.unwrap();
    assert_eq!(keyed(&primary), keyed(&mirror));

    let totals: Vec<_> = primary
        .iter()
        .map(|r| (r.fiscal_year, r.agency_name.as_str(), r.total_paid))
        .collect();
    assert_eq!(
        totals,
        vec![
            (2021, "FIRE DEPARTMENT", 150.5),
            (2021, "POLICE DEPARTMENT", 82500.0),
        ]
    );

    let stats = report.aggregation.unwrap();
    assert_eq!(stats.records_in, 6);
    assert_eq!(stats.records_excluded, 3);
    assert_eq!(stats.groups, 2);
}

#[tokio::test]
async fn rerun_leaves_tables_unchanged() {
    let fx = Fixture::new();
    let pipeline = fx.pipeline(MalformedRecordPolicy::Abort);

    pipeline.run(RunTrigger::Manual, None).await.unwrap();
    let first: Vec<PayrollRecord> = fx.staging.fetch_all("payroll_2021").await.unwrap();
    let first_summary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();

    pipeline.run(RunTrigger::Manual, None).await.unwrap();
    let second: Vec<PayrollRecord> = fx.staging.fetch_all("payroll_2021").await.unwrap();
    let second_summary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first.len(), 4);
    assert_eq!(first_summary, second_summary);
    assert_eq!(fx.staging.write_count("payroll_2021"), 2);
}

#[tokio::test]
async fn missing_source_halts_at_load_after_siblings_finish() {
    let fx = Fixture::new();
    fs::remove_file(fx.dir.path().join("TitleMaster.csv")).unwrap();

    let halt = fx
        .pipeline(MalformedRecordPolicy::Abort)
        .run(RunTrigger::Manual, None)
        .await
        .unwrap_err();

    assert_eq!(halt.step, RunStep::Load);
    assert!(matches!(&halt.error, PipelineError::Load(failures) if failures.len() == 1));

    let failed: Vec<_> = halt
        .report
        .loads
        .iter()
        .filter(|l| l.error.is_some())
        .map(|l| l.entity)
        .collect();
    assert_eq!(failed, vec![SourceEntity::Title]);
    assert_eq!(halt.report.loads.len(), 5);

    // siblings ran to completion, downstream steps did not
    assert!(fx.staging.has_table("employee_master"));
    assert!(fx.staging.has_table("payroll_2021"));
    assert!(!fx.staging.has_table("title_master"));
    assert!(!fx.staging.has_table(SUMMARY_TABLE));
    assert!(!fx.mirror.has_table(SUMMARY_TABLE));
    assert!(halt.report.aggregation.is_none());
}

#[tokio::test]
async fn invalid_min_fiscal_year_fails_before_any_write() {
    let fx = Fixture::new();

    for raw in ["", "twenty-one", "2021.5"] {
        let halt = fx
            .pipeline(MalformedRecordPolicy::Abort)
            .run(RunTrigger::Manual, Some(raw))
            .await
            .unwrap_err();

        assert_eq!(halt.step, RunStep::Validate, "input {raw:?}");
        assert!(halt.is_parameter_error());
        assert!(halt.report.loads.is_empty());
    }

    for entity in [SourceEntity::Employee, SourceEntity::Payroll2020] {
        assert!(!fx.staging.has_table(entity.table()));
    }
}

#[tokio::test]
async fn threshold_above_data_writes_empty_summary() {
    let fx = Fixture::new();
    let pipeline = fx.pipeline(MalformedRecordPolicy::Abort);
    pipeline.run(RunTrigger::Manual, None).await.unwrap();

    let report = pipeline
        .run(RunTrigger::Manual, Some("2022"))
        .await
        .unwrap();

    assert_eq!(report.aggregation.unwrap().groups, 0);
    let primary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();
    let mirror: Vec<SummaryRecord> = fx.mirror.fetch_all(SUMMARY_TABLE).await.unwrap();
    assert!(primary.is_empty());
    assert!(mirror.is_empty());
}

#[tokio::test]
async fn malformed_rows_follow_policy() {
    let fx = Fixture::new();
    fs::write(
        fx.dir.path().join("TitleMaster.csv"),
        "TitleCode,TitleDescription\n70210,POLICE OFFICER\nclerk,CLERK\n10001,CLERK,EXTRA\n",
    )
    .unwrap();

    let report = fx
        .pipeline(MalformedRecordPolicy::Skip)
        .run(RunTrigger::Manual, None)
        .await
        .unwrap();
    let titles = report
        .loads
        .iter()
        .find(|l| l.entity == SourceEntity::Title)
        .unwrap();
    assert_eq!(titles.records_skipped, 2);
    assert_eq!(titles.records_written, 1);
    let rows: Vec<TitleMaster> = fx.staging.fetch_all("title_master").await.unwrap();
    assert_eq!(rows.len(), 1);

    let halt = fx
        .pipeline(MalformedRecordPolicy::Abort)
        .run(RunTrigger::Manual, None)
        .await
        .unwrap_err();
    assert_eq!(halt.step, RunStep::Load);
}

#[tokio::test]
async fn mirror_failure_keeps_primary_and_fails_run() {
    let fx = Fixture::new();
    fx.mirror.reject_writes_to(SUMMARY_TABLE).unwrap();

    let halt = fx
        .pipeline(MalformedRecordPolicy::Abort)
        .run(RunTrigger::Scheduled, None)
        .await
        .unwrap_err();

    assert_eq!(halt.step, RunStep::Sink);
    let sinks = &halt.report.sinks;
    assert_eq!(sinks.len(), 2);
    assert!(sinks[0].error.is_none());
    assert_eq!(sinks[0].rows_written, 2);
    assert!(sinks[1].error.as_deref().unwrap().contains("mirror"));

    let primary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();
    assert_eq!(primary.len(), 2);
}

#[tokio::test]
async fn rows_are_unioned_without_dedup() {
    let fx = Fixture::new();
    let row = payroll_row("2021", "SANITATION", "10", "0", "0");
    fs::write(
        fx.dir.path().join("nycpayroll_2020.csv"),
        payroll_file(&[row.clone()]),
    )
    .unwrap();
    fs::write(
        fx.dir.path().join("nycpayroll_2021.csv"),
        payroll_file(&[row]),
    )
    .unwrap();

    let report = fx
        .pipeline(MalformedRecordPolicy::Abort)
        .run(RunTrigger::Cli, None)
        .await
        .unwrap();

    let summary: Vec<SummaryRecord> = fx.staging.fetch_all(SUMMARY_TABLE).await.unwrap();
    assert_eq!(summary.len(), 1);
    assert_eq!(summary[0].total_paid, 20.0);
    // the 2020 extract carried a 2021 row
    assert_eq!(report.aggregation.unwrap().records_outside_extract_year, 1);
}
