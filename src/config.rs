use crate::error::{Error, Result};
use dotenvy::dotenv;
use std::env;
use std::sync::OnceLock;

#[derive(Debug, Clone)]
pub struct Config {
    pub server_address: String,
    pub database_url: String,
    pub cache_ttl_secs: u64,
    pub cache_max_size_bytes: usize,
    pub proxy_cache_ttl_secs: u64,
    pub rate_limit_max_requests: u32,
    pub rate_limit_window_secs: u64,
    pub prefetch_delay_ms: u64,
    pub job_bank_base_url: String,
    pub secondary_feed_url: Option<String>,
}

pub static CONFIG: OnceLock<Config> = OnceLock::new();

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();

        Ok(Self {
            server_address: get_env("SERVER_ADDRESS")?,
            database_url: get_env("DATABASE_URL")?,
            cache_ttl_secs: get_env_or_parse("CACHE_TTL_SECS", 300)?,
            cache_max_size_bytes: get_env_or_parse("CACHE_MAX_SIZE_BYTES", 10 * 1024 * 1024)?,
            proxy_cache_ttl_secs: get_env_or_parse("PROXY_CACHE_TTL_SECS", 300)?,
            rate_limit_max_requests: get_env_or_parse("RATE_LIMIT_MAX_REQUESTS", 60)?,
            rate_limit_window_secs: get_env_or_parse("RATE_LIMIT_WINDOW_SECS", 60)?,
            prefetch_delay_ms: get_env_or_parse("PREFETCH_DELAY_MS", 500)?,
            job_bank_base_url: env::var("JOB_BANK_BASE_URL")
                .unwrap_or_else(|_| "https://www.jobbank.gc.ca/jobsearch".to_string()),
            secondary_feed_url: env::var("SECONDARY_FEED_URL").ok(),
        })
    }
}

fn get_env(name: &str) -> Result<String> {
    env::var(name).map_err(|_| Error::Config(format!("Missing environment variable: {}", name)))
}

fn get_env_or_parse<T>(name: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .parse()
            .map_err(|e| Error::Config(format!("Invalid value for {}: {}", name, e))),
        Err(_) => Ok(default),
    }
}

pub fn init_config() -> Result<()> {
    let config = Config::from_env()?;
    CONFIG
        .set(config)
        .map_err(|_| Error::Config("Configuration has already been initialized".to_string()))?;
    Ok(())
}

pub fn get_config() -> &'static Config {
    CONFIG
        .get()
        .expect("Configuration has not been initialized")
}
