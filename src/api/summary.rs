use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use serde::{Deserialize, Serialize};
use tracing::{debug, error};
use utoipa::ToSchema;

use crate::model::summary::{SummaryFilter, SummaryRecord};
use crate::service::PipelineService;
use crate::store::TableStore;

#[derive(Debug, Deserialize, ToSchema)]
pub struct SummaryQuery {
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub fiscal_year: Option<i32>,
    pub agency: Option<String>,
}

impl SummaryQuery {
    fn filter(&self) -> SummaryFilter {
        SummaryFilter {
            fiscal_year: self.fiscal_year,
            agency: self
                .agency
                .as_deref()
                .map(str::trim)
                .filter(|a| !a.is_empty())
                .map(str::to_string),
        }
    }
}

#[derive(Serialize, ToSchema)]
pub struct SummaryListResponse {
    pub data: Vec<SummaryRecord>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 20)]
    pub per_page: u32,
    #[schema(example = 57)]
    pub total: u64,
}

#[utoipa::path(
    get,
    path = "/api/summary",
    params(
        ("page", Query, description = "Page number"),
        ("per_page", Query, description = "Items per page"),
        ("fiscal_year", Query, description = "Filter by fiscal year"),
        ("agency", Query, description = "Filter by agency name, case-insensitive")
    ),
    responses(
        (status = 200, description = "Paginated yearly agency totals", body = SummaryListResponse),
        (status = 500, description = "Summary destination unavailable")
    ),
    tag = "Summary"
)]
pub async fn list_summary<S: TableStore>(
    service: web::Data<PipelineService<S>>,
    query: web::Query<SummaryQuery>,
) -> actix_web::Result<impl Responder> {
    let page = query.page.unwrap_or(1).max(1);
    let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
    let offset = ((page - 1) as usize).saturating_mul(per_page as usize);
    let filter = query.filter();

    debug!(filter = ?filter, page, per_page, "Fetching summary");

    let rows = service.query_summary(filter).await.map_err(|e| {
        error!(error = %e, "Failed to read payroll summary");
        ErrorInternalServerError("Database error")
    })?;

    Ok(HttpResponse::Ok().json(SummaryListResponse {
        data: rows.iter().skip(offset).take(per_page as usize).cloned().collect(),
        page,
        per_page,
        total: rows.len() as u64,
    }))
}
