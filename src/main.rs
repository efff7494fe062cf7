use axum::{
    routing::{get, post},
    Router,
};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use vetjobs_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    {
        // Periodic sweep keeps the limiter's per-client windows bounded.
        let limiter = app_state.api_limiter.clone();
        let interval = Duration::from_secs(config.rate_limit_window_secs.max(1));
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(interval).await;
                limiter.prune();
            }
        });
    }

    let base_routes = Router::new().route("/health", get(routes::health::health));

    let api = Router::new()
        .route("/api/jobs/search", get(routes::search::search_jobs))
        .route(
            "/api/jobs/search/invalidate",
            post(routes::search::invalidate_search_cache),
        )
        .route("/api/proxy/canada-jobs", get(routes::proxy::canada_jobs))
        .layer(axum::middleware::from_fn_with_state(
            app_state.api_limiter.clone(),
            vetjobs_backend::middleware::rate_limit::rate_limit_middleware,
        ));

    // The check endpoint runs its own limiter pass, so it is not wrapped by
    // the middleware; wrapping it would count every check twice.
    let quota_api = Router::new().route(
        "/api/rate-limit/check",
        post(routes::rate_limit::check_rate_limit),
    );

    let app = base_routes
        .merge(api)
        .merge(quota_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Server listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
