use axum::{
    extract::{Query, State},
    response::{IntoResponse, Json},
};
use validator::Validate;

use crate::{
    dto::search_dto::{CanadaJobsQuery, CanadaJobsResponse},
    error::Result,
    services::job_bank_service::JobBankQuery,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/proxy/canada-jobs",
    params(
        ("keywords" = Option<String>, Query, description = "Free-text keywords"),
        ("location" = Option<String>, Query, description = "Location string"),
        ("distance" = Option<u32>, Query, description = "Distance in km"),
        ("page" = Option<i64>, Query, description = "Page number")
    ),
    responses(
        (status = 200, description = "Scraped Canada job bank page", body = Json<CanadaJobsResponse>),
        (status = 502, description = "Upstream fetch or parse failure")
    )
)]
#[axum::debug_handler]
pub async fn canada_jobs(
    State(state): State<AppState>,
    Query(query): Query<CanadaJobsQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let page = state
        .job_bank_service
        .fetch(&JobBankQuery {
            keywords: query.keywords,
            location: query.location,
            distance: query.distance,
            page: query.page.unwrap_or(1),
            skills: vec![],
        })
        .await?;
    Ok(Json(CanadaJobsResponse::from(page)))
}
