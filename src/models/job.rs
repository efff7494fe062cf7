use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A job listing in the common cross-source shape. Listings from the primary
/// store, the Canada job bank and the secondary feed are all mapped into this
/// record; merging deduplicates by `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct Job {
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
}

/// Skill-match annotation computed against a searcher's skill list. Derived
/// per search, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SkillMatch {
    pub matching_skills: Vec<String>,
    pub match_score: u32,
}

impl SkillMatch {
    /// Intersects the searcher's skills with the job's required skills.
    /// Matching is case-insensitive and substring in both directions, so
    /// "Postgres" matches "PostgreSQL administration". The score divides by
    /// `max(required, 1)` so jobs with no listed requirements score zero
    /// instead of dividing by zero.
    pub fn compute(job: &Job, user_skills: &[String]) -> Self {
        let matching_skills: Vec<String> = user_skills
            .iter()
            .filter(|user_skill| {
                let user_lower = user_skill.to_lowercase();
                job.required_skills.iter().any(|required| {
                    let required_lower = required.to_lowercase();
                    required_lower.contains(&user_lower) || user_lower.contains(&required_lower)
                })
            })
            .cloned()
            .collect();

        let required_count = job.required_skills.len().max(1);
        let match_score =
            ((matching_skills.len() as f64 / required_count as f64) * 100.0).round() as u32;

        Self {
            matching_skills,
            match_score,
        }
    }
}
