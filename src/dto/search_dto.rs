use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::job::{Job, SkillMatch};
use crate::models::search::{Country, SearchPage, SearchParams};

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct JobSearchQuery {
    #[validate(length(max = 200))]
    pub keywords: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(max = 1000))]
    pub radius_km: Option<u32>,
    pub job_type: Option<String>,
    pub industry: Option<String>,
    pub experience_level: Option<String>,
    pub education_level: Option<String>,
    pub remote: Option<bool>,
    pub country: Option<Country>,
    /// Comma-separated skill list.
    pub skills: Option<String>,
    #[validate(range(min = 1, max = 100_000))]
    pub page: Option<i64>,
    #[validate(range(min = 1, max = 100))]
    pub per_page: Option<i64>,
}

impl From<JobSearchQuery> for SearchParams {
    fn from(query: JobSearchQuery) -> Self {
        let skills = query
            .skills
            .as_deref()
            .map(|raw| {
                raw.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        SearchParams {
            keywords: query.keywords,
            location: query.location,
            radius_km: query.radius_km,
            job_type: query.job_type,
            industry: query.industry,
            experience_level: query.experience_level,
            education_level: query.education_level,
            remote: query.remote,
            country: query.country.unwrap_or_default(),
            skills,
            page: query.page.unwrap_or(1),
            per_page: query.per_page,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobResult {
    pub id: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub description: Option<String>,
    pub required_skills: Vec<String>,
    pub preferred_skills: Vec<String>,
    pub salary: Option<String>,
    pub remote: bool,
    pub job_type: Option<String>,
    pub industry: Option<String>,
    pub source: String,
    pub url: Option<String>,
    pub posted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub matching_skills: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub match_score: Option<u32>,
}

impl JobResult {
    /// Annotation decorates presentation only; it never changes which jobs a
    /// search returns.
    pub fn annotated(job: Job, user_skills: &[String]) -> Self {
        let skill_match = (!user_skills.is_empty()).then(|| SkillMatch::compute(&job, user_skills));
        let (matching_skills, match_score) = match skill_match {
            Some(m) => (Some(m.matching_skills), Some(m.match_score)),
            None => (None, None),
        };

        Self {
            id: job.id,
            title: job.title,
            company: job.company,
            location: job.location,
            description: job.description,
            required_skills: job.required_skills,
            preferred_skills: job.preferred_skills,
            salary: job.salary,
            remote: job.remote,
            job_type: job.job_type,
            industry: job.industry,
            source: job.source,
            url: job.url,
            posted_at: job.posted_at,
            matching_skills,
            match_score,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub jobs: Vec<JobResult>,
    pub total_jobs: i64,
    pub total_pages: i64,
    pub page: i64,
    pub per_page: i64,
    pub source: String,
}

impl SearchResponse {
    pub fn from_page(page: SearchPage, params: &SearchParams) -> Self {
        let jobs = page
            .jobs
            .into_iter()
            .map(|job| JobResult::annotated(job, &params.skills))
            .collect();
        Self {
            jobs,
            total_jobs: page.total_jobs,
            total_pages: page.total_pages,
            page: page.current_page,
            per_page: params.per_page(),
            source: page.source,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate, Default)]
#[serde(default)]
pub struct CanadaJobsQuery {
    #[validate(length(max = 200))]
    pub keywords: Option<String>,
    #[validate(length(max = 200))]
    pub location: Option<String>,
    #[validate(range(max = 1000))]
    pub distance: Option<u32>,
    #[validate(range(min = 1, max = 100_000))]
    pub page: Option<i64>,
}

/// Wire shape of the proxy endpoint, camelCase to match the consumer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanadaJobsResponse {
    pub jobs: Vec<JobResult>,
    pub total_jobs: i64,
    pub current_page: i64,
    pub total_pages: i64,
}

impl From<SearchPage> for CanadaJobsResponse {
    fn from(page: SearchPage) -> Self {
        Self {
            jobs: page
                .jobs
                .into_iter()
                .map(|job| JobResult::annotated(job, &[]))
                .collect(),
            total_jobs: page.total_jobs,
            current_page: page.current_page,
            total_pages: page.total_pages,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct RateLimitCheckPayload {
    #[validate(length(min = 1, max = 200))]
    pub endpoint: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RateLimitCheckResponse {
    pub success: bool,
    pub remaining_requests: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn skills_query_is_split_and_trimmed() {
        let query = JobSearchQuery {
            skills: Some(" logistics , forklift ,, ".into()),
            ..Default::default()
        };
        let params = SearchParams::from(query);
        assert_eq!(params.skills, vec!["logistics", "forklift"]);
    }

    #[test]
    fn country_defaults_to_us() {
        let params = SearchParams::from(JobSearchQuery::default());
        assert_eq!(params.country, Country::Us);
    }

    #[test]
    fn pagination_fields_are_bounded() {
        let query = JobSearchQuery {
            page: Some(0),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = JobSearchQuery {
            page: Some(i64::MAX),
            per_page: Some(10),
            ..Default::default()
        };
        assert!(query.validate().is_err());

        let query = JobSearchQuery {
            page: Some(3),
            per_page: Some(25),
            ..Default::default()
        };
        assert!(query.validate().is_ok());
    }
}
