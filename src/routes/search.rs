use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
};
use tokio_util::sync::CancellationToken;
use validator::Validate;

use crate::{
    dto::search_dto::{JobSearchQuery, SearchResponse},
    error::Result,
    models::search::SearchParams,
    AppState,
};

#[utoipa::path(
    get,
    path = "/api/jobs/search",
    params(
        ("keywords" = Option<String>, Query, description = "Free-text keywords"),
        ("location" = Option<String>, Query, description = "Location substring"),
        ("radius_km" = Option<u32>, Query, description = "Search radius in km"),
        ("job_type" = Option<String>, Query, description = "Job type filter"),
        ("industry" = Option<String>, Query, description = "Industry filter"),
        ("remote" = Option<bool>, Query, description = "Remote-only filter"),
        ("country" = Option<String>, Query, description = "us or canada"),
        ("skills" = Option<String>, Query, description = "Comma-separated skills"),
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page")
    ),
    responses(
        (status = 200, description = "Merged search results", body = Json<SearchResponse>),
        (status = 404, description = "No jobs found matching the criteria")
    )
)]
#[axum::debug_handler]
pub async fn search_jobs(
    State(state): State<AppState>,
    Query(query): Query<JobSearchQuery>,
) -> Result<impl IntoResponse> {
    query.validate()?;
    let params = SearchParams::from(query);

    // Request-scoped token with a cancel-on-drop guard: a client disconnect
    // drops this future and the guard cancels anything still racing the
    // token. A new search supersedes any pending prefetch below.
    let cancel = CancellationToken::new();
    let _guard = cancel.clone().drop_guard();
    let page = state.search_service.search(&params, &cancel).await?;

    state.prefetch_service.schedule(&params, page.total_pages);

    Ok(Json(SearchResponse::from_page(page, &params)))
}

#[utoipa::path(
    post,
    path = "/api/jobs/search/invalidate",
    responses(
        (status = 204, description = "Search cache cleared")
    )
)]
#[axum::debug_handler]
pub async fn invalidate_search_cache(State(state): State<AppState>) -> Result<impl IntoResponse> {
    state.prefetch_service.cancel_pending();
    state.search_service.invalidate();
    Ok(StatusCode::NO_CONTENT)
}
