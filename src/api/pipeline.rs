use actix_web::{HttpResponse, Responder, web};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{error, info};
use utoipa::ToSchema;

use crate::pipeline::report::RunStep;
use crate::pipeline::{RunReport, RunTrigger};
use crate::service::{PipelineService, TriggerError};
use crate::store::TableStore;

#[derive(Debug, Deserialize, ToSchema)]
pub struct TriggerQuery {
    /// Overrides the configured minimum fiscal year for this run.
    #[schema(example = "2021")]
    pub min_fiscal_year: Option<String>,
}

/// Body returned when a run halts.
#[derive(Serialize, ToSchema)]
pub struct RunFailureResponse {
    #[schema(example = "invalid pipeline parameter: minFiscalYear must be an integer, got 'abc'")]
    pub message: String,
    pub failed_step: RunStep,
    pub report: RunReport,
}

/// Run the pipeline now
#[utoipa::path(
    post,
    path = "/api/pipeline/runs",
    params(
        ("min_fiscal_year", Query, description = "Lowest fiscal year kept in the summary")
    ),
    responses(
        (status = 200, description = "Run succeeded", body = RunReport),
        (status = 400, description = "Invalid minFiscalYear", body = RunFailureResponse),
        (status = 409, description = "A run is already in progress", body = Object, example = json!({
            "message": "a pipeline run is already in progress"
        })),
        (status = 429, description = "Too many trigger requests"),
        (status = 500, description = "Run halted, partial report attached", body = RunFailureResponse)
    ),
    tag = "Pipeline"
)]
pub async fn trigger_run<S: TableStore>(
    service: web::Data<PipelineService<S>>,
    query: web::Query<TriggerQuery>,
) -> impl Responder {
    info!(min_fiscal_year = ?query.min_fiscal_year, "Manual run requested");

    match service
        .trigger(RunTrigger::Manual, query.min_fiscal_year.as_deref())
        .await
    {
        Ok(report) => HttpResponse::Ok().json(report),
        Err(TriggerError::Busy) => HttpResponse::Conflict().json(json!({
            "message": TriggerError::Busy.to_string()
        })),
        Err(TriggerError::Halted(halt)) => {
            let bad_request = halt.is_parameter_error();
            let body = RunFailureResponse {
                message: halt.error.to_string(),
                failed_step: halt.step,
                report: *halt.report,
            };
            if bad_request {
                HttpResponse::BadRequest().json(body)
            } else {
                error!(run_id = %body.report.run_id, step = %body.failed_step, "Manual run failed");
                HttpResponse::InternalServerError().json(body)
            }
        }
        Err(TriggerError::Aborted(report)) => HttpResponse::InternalServerError().json(json!({
            "message": report.error,
            "report": *report
        })),
    }
}

/// Latest run report
#[utoipa::path(
    get,
    path = "/api/pipeline/runs/latest",
    responses(
        (status = 200, description = "Report of the most recent run", body = RunReport),
        (status = 404, description = "No run yet", body = Object, example = json!({
            "message": "no pipeline run recorded yet"
        }))
    ),
    tag = "Pipeline"
)]
pub async fn latest_run<S: TableStore>(service: web::Data<PipelineService<S>>) -> impl Responder {
    match service.latest_report() {
        Some(report) => HttpResponse::Ok().json(report),
        None => HttpResponse::NotFound().json(json!({
            "message": "no pipeline run recorded yet"
        })),
    }
}
