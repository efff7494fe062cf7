use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json},
};
use serde_json::json;
use validator::Validate;

use crate::{
    dto::search_dto::{RateLimitCheckPayload, RateLimitCheckResponse},
    error::Result,
    middleware::rate_limit::{client_ip, set_limit_headers},
    AppState,
};

/// Explicit quota check for clients that want to know their remaining allowance
/// before issuing a burst of search calls. Counts against the same window as
/// the middleware.
#[utoipa::path(
    post,
    path = "/api/rate-limit/check",
    request_body = RateLimitCheckPayload,
    responses(
        (status = 200, description = "Request allowed", body = Json<RateLimitCheckResponse>),
        (status = 429, description = "Too many requests")
    )
)]
#[axum::debug_handler]
pub async fn check_rate_limit(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(payload): Json<RateLimitCheckPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let ip = client_ip(&headers);

    let decision = state.api_limiter.check(&ip);
    let mut response = if decision.allowed {
        Json(RateLimitCheckResponse {
            success: true,
            remaining_requests: decision.remaining,
        })
        .into_response()
    } else {
        let body = Json(json!({
            "error": "Too many requests",
            "retryAfter": decision.retry_after_secs,
        }));
        (StatusCode::TOO_MANY_REQUESTS, body).into_response()
    };
    set_limit_headers(&mut response, &state.api_limiter, &decision);
    Ok(response)
}
