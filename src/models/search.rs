use serde::{Deserialize, Serialize};

use crate::models::job::Job;

pub const DEFAULT_PER_PAGE: i64 = 10;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Country {
    #[default]
    Us,
    Canada,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Us => "us",
            Country::Canada => "canada",
        }
    }
}

/// One search request as a value object. Two instances with the same field
/// values describe the same search regardless of skill order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SearchParams {
    pub keywords: Option<String>,
    pub location: Option<String>,
    pub radius_km: Option<u32>,
    pub job_type: Option<String>,
    pub industry: Option<String>,
    pub experience_level: Option<String>,
    pub education_level: Option<String>,
    pub remote: Option<bool>,
    pub country: Country,
    pub skills: Vec<String>,
    pub page: i64,
    pub per_page: Option<i64>,
}

impl SearchParams {
    pub fn page(&self) -> i64 {
        self.page.max(1)
    }

    pub fn per_page(&self) -> i64 {
        self.per_page
            .unwrap_or(DEFAULT_PER_PAGE)
            .clamp(1, MAX_PER_PAGE)
    }

    pub fn cache_key(&self) -> CacheKey {
        CacheKey::from_params(self)
    }

    /// Same params shifted to the next page, used by the prefetcher.
    pub fn next_page(&self) -> SearchParams {
        let mut next = self.clone();
        next.page = self.page() + 1;
        next
    }
}

/// Structured cache key with defined equality, derived from normalized
/// search parameters. Free-text fields are lowercased and trimmed, skills are
/// sorted so reordering them does not change the key, and the page number is
/// part of the key. A typed key avoids the collision edge cases of
/// delimiter-joined strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    keywords: Option<String>,
    location: Option<String>,
    radius_km: Option<u32>,
    job_type: Option<String>,
    industry: Option<String>,
    experience_level: Option<String>,
    education_level: Option<String>,
    remote: Option<bool>,
    country: Country,
    skills: Vec<String>,
    page: i64,
    per_page: i64,
}

fn normalize(field: &Option<String>) -> Option<String> {
    field
        .as_ref()
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

impl CacheKey {
    pub fn from_params(params: &SearchParams) -> Self {
        let mut skills: Vec<String> = params.skills.iter().map(|s| s.to_lowercase()).collect();
        skills.sort();
        skills.dedup();

        Self {
            keywords: normalize(&params.keywords),
            location: normalize(&params.location),
            radius_km: params.radius_km,
            job_type: normalize(&params.job_type),
            industry: normalize(&params.industry),
            experience_level: normalize(&params.experience_level),
            education_level: normalize(&params.education_level),
            remote: params.remote,
            country: params.country,
            skills,
            page: params.page(),
            per_page: params.per_page(),
        }
    }
}

/// One page of merged search results, the unit stored in the cache.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchPage {
    pub jobs: Vec<Job>,
    pub total_jobs: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub source: String,
}

impl SearchPage {
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }
}
