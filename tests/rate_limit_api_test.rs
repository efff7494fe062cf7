use std::env;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use serde_json::{json, Value as JsonValue};
use tower::ServiceExt;

use vetjobs_backend::middleware::rate_limit::{rate_limit_middleware, RateLimiter};

fn limited_router(limiter: RateLimiter) -> Router {
    Router::new()
        .route("/ping", get(|| async { "pong" }))
        .layer(axum::middleware::from_fn_with_state(
            limiter,
            rate_limit_middleware,
        ))
}

fn ping(ip: &str) -> Request<Body> {
    Request::builder()
        .method("GET")
        .uri("/ping")
        .header("x-forwarded-for", ip)
        .body(Body::empty())
        .unwrap()
}

#[tokio::test]
async fn sixty_first_request_is_rejected_with_retry_hint() {
    let app = limited_router(RateLimiter::new(60, Duration::from_secs(60)));

    for i in 0..60 {
        let resp = app.clone().oneshot(ping("203.0.113.7")).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK, "request {} should pass", i);
    }

    let resp = app.clone().oneshot(ping("203.0.113.7")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    assert!(resp.headers().contains_key("retry-after"));

    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["error"], "Too many requests");
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn allowed_responses_carry_quota_headers() {
    let app = limited_router(RateLimiter::new(5, Duration::from_secs(60)));

    let resp = app.clone().oneshot(ping("198.51.100.2")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "5");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "4");
    assert_eq!(resp.headers()["x-ratelimit-reset"], "60");
}

#[tokio::test]
async fn clients_get_independent_windows() {
    let app = limited_router(RateLimiter::new(1, Duration::from_secs(60)));

    let first = app.clone().oneshot(ping("10.0.0.1")).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    let blocked = app.clone().oneshot(ping("10.0.0.1")).await.unwrap();
    assert_eq!(blocked.status(), StatusCode::TOO_MANY_REQUESTS);
    let other = app.clone().oneshot(ping("10.0.0.2")).await.unwrap();
    assert_eq!(other.status(), StatusCode::OK);
}

#[tokio::test]
async fn check_endpoint_reports_remaining_quota() {
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("DATABASE_URL", "postgres://localhost/vetjobs_test");
    env::set_var("RATE_LIMIT_MAX_REQUESTS", "2");
    env::set_var("RATE_LIMIT_WINDOW_SECS", "60");
    vetjobs_backend::config::init_config().ok();

    // Lazy pool: the quota endpoint never touches the database.
    let pool = sqlx::postgres::PgPoolOptions::new()
        .connect_lazy("postgres://localhost/vetjobs_test")
        .expect("lazy pool");
    let state = vetjobs_backend::AppState::new(pool);

    let app = Router::new()
        .route(
            "/api/rate-limit/check",
            post(vetjobs_backend::routes::rate_limit::check_rate_limit),
        )
        .with_state(state);

    let request = |ip: &str| {
        Request::builder()
            .method("POST")
            .uri("/api/rate-limit/check")
            .header("content-type", "application/json")
            .header("x-forwarded-for", ip)
            .body(Body::from(json!({"endpoint": "/api/jobs/search"}).to_string()))
            .unwrap()
    };

    let resp = app.clone().oneshot(request("192.0.2.9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()["x-ratelimit-limit"], "2");
    assert_eq!(resp.headers()["x-ratelimit-remaining"], "1");
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(body["success"], true);
    assert_eq!(body["remainingRequests"], 1);

    let resp = app.clone().oneshot(request("192.0.2.9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = app.clone().oneshot(request("192.0.2.9")).await.unwrap();
    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);
    let bytes = to_bytes(resp.into_body(), 64 * 1024).await.unwrap();
    let body: JsonValue = serde_json::from_slice(&bytes).unwrap();
    assert!(body["retryAfter"].as_u64().unwrap() >= 1);
}
