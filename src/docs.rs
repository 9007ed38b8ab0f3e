use crate::api::pipeline::{RunFailureResponse, TriggerQuery};
use crate::api::summary::{SummaryListResponse, SummaryQuery};
use crate::model::entity::SourceEntity;
use crate::model::summary::SummaryRecord;
use crate::pipeline::report::{
    AggregationStats, LoadSummary, RunReport, RunStatus, RunStep, RunTrigger, SinkSummary,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Payroll Pipeline API",
        version = "1.0.0",
        description = r#"
## Payroll Pipeline

Loads the employee, agency and title master files and two yearly payroll
extracts into staging tables, then writes a per-agency, per-fiscal-year pay
summary to two destinations.

### Endpoints
- **Pipeline**
  - Trigger a run, optionally overriding `min_fiscal_year`
  - Fetch the report of the latest run
- **Summary**
  - Page through yearly agency totals from the primary destination

Every table write is a full replace, so re-triggering a failed run is safe.
"#,
    ),
    paths(
        crate::api::pipeline::trigger_run,
        crate::api::pipeline::latest_run,
        crate::api::summary::list_summary
    ),
    components(
        schemas(
            TriggerQuery,
            RunFailureResponse,
            RunReport,
            RunStatus,
            RunStep,
            RunTrigger,
            LoadSummary,
            AggregationStats,
            SinkSummary,
            SourceEntity,
            SummaryQuery,
            SummaryListResponse,
            SummaryRecord
        )
    ),
    tags(
        (name = "Pipeline", description = "Run triggering and reporting"),
        (name = "Summary", description = "Read-only yearly agency totals"),
    )
)]
pub struct ApiDoc;
