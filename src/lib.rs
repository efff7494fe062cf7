pub mod cache;
pub mod config;
pub mod database;
pub mod dto;
pub mod error;
pub mod middleware;
pub mod models;
pub mod routes;
pub mod services;

use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use sqlx::PgPool;

use crate::cache::SearchCache;
use crate::middleware::rate_limit::RateLimiter;
use crate::services::{
    feed_service::SecondaryFeedService,
    job_bank_service::{CanadaJobSource, JobBankService},
    job_store_service::JobStoreService,
    prefetch_service::PrefetchService,
    search_service::{JobSource, SearchService},
};

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub search_service: Arc<SearchService>,
    pub prefetch_service: Arc<PrefetchService>,
    pub job_bank_service: Arc<JobBankService>,
    pub api_limiter: RateLimiter,
}

impl AppState {
    pub fn new(pool: PgPool) -> Self {
        let config = crate::config::get_config();
        let http_client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .expect("failed to build HTTP client");

        let cache = Arc::new(SearchCache::new(
            Duration::from_secs(config.cache_ttl_secs),
            config.cache_max_size_bytes,
        ));

        let job_bank_service = Arc::new(
            JobBankService::new(
                config.job_bank_base_url.clone(),
                Duration::from_secs(config.proxy_cache_ttl_secs),
            )
            .expect("failed to build job bank client"),
        );

        // Source precedence: primary store, Canada job bank, secondary feed.
        let sources: Vec<Arc<dyn JobSource>> = vec![
            Arc::new(JobStoreService::new(pool.clone())),
            Arc::new(CanadaJobSource::new(Arc::clone(&job_bank_service))),
            Arc::new(SecondaryFeedService::new(
                http_client,
                config.secondary_feed_url.clone(),
            )),
        ];

        let search_service = Arc::new(SearchService::new(sources, cache));
        let prefetch_service = Arc::new(PrefetchService::new(
            Arc::clone(&search_service),
            Duration::from_millis(config.prefetch_delay_ms),
        ));

        let api_limiter = RateLimiter::new(
            config.rate_limit_max_requests,
            Duration::from_secs(config.rate_limit_window_secs),
        );

        Self {
            pool,
            search_service,
            prefetch_service,
            job_bank_service,
            api_limiter,
        }
    }
}
