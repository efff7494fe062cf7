use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use tracing::info;

use crate::error::Result;
use crate::models::job::Job;
use crate::models::search::{SearchPage, SearchParams};
use crate::services::search_service::JobSource;

#[derive(Debug, Clone, Deserialize)]
struct FeedItem {
    id: String,
    title: String,
    company: String,
    #[serde(default)]
    location: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    skills: Vec<String>,
    #[serde(default)]
    salary: Option<String>,
    #[serde(default)]
    remote: bool,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    posted_at: Option<DateTime<Utc>>,
}

impl From<FeedItem> for Job {
    fn from(item: FeedItem) -> Self {
        Job {
            id: format!("feed-{}", item.id),
            title: item.title,
            company: item.company,
            location: item.location,
            description: item.description,
            required_skills: item.skills,
            preferred_skills: vec![],
            salary: item.salary,
            remote: item.remote,
            job_type: None,
            industry: None,
            source: "secondary-feed".to_string(),
            url: item.url,
            posted_at: item.posted_at,
        }
    }
}

/// Last-resort aggregated feed. The whole document is pulled per call and
/// filtering/pagination happen entirely in-process, so this source is only
/// consulted after the primary store and the Canada feed came up empty.
pub struct SecondaryFeedService {
    client: Client,
    feed_url: Option<String>,
}

impl SecondaryFeedService {
    pub fn new(client: Client, feed_url: Option<String>) -> Self {
        Self { client, feed_url }
    }

    pub async fn fetch_filtered(&self, params: &SearchParams) -> Result<SearchPage> {
        let Some(url) = self.feed_url.as_deref() else {
            return Ok(empty_page(params));
        };

        info!(%url, "pulling secondary job feed");
        let items: Vec<FeedItem> = self.client.get(url).send().await?.json().await?;
        let jobs: Vec<Job> = items.into_iter().map(Job::from).collect();
        Ok(filter_and_paginate(jobs, params))
    }
}

fn empty_page(params: &SearchParams) -> SearchPage {
    SearchPage {
        jobs: vec![],
        total_jobs: 0,
        total_pages: 0,
        current_page: params.page(),
        source: "secondary-feed".to_string(),
    }
}

/// Case-insensitive substring filter on keywords (title or description) and
/// location, then local limit/offset pagination.
pub fn filter_and_paginate(jobs: Vec<Job>, params: &SearchParams) -> SearchPage {
    let keywords = params
        .keywords
        .as_deref()
        .map(str::to_lowercase)
        .filter(|k| !k.trim().is_empty());
    let location = params
        .location
        .as_deref()
        .map(str::to_lowercase)
        .filter(|l| !l.trim().is_empty());

    let filtered: Vec<Job> = jobs
        .into_iter()
        .filter(|job| {
            let keyword_ok = keywords.as_deref().map_or(true, |kw| {
                job.title.to_lowercase().contains(kw)
                    || job
                        .description
                        .as_deref()
                        .map_or(false, |d| d.to_lowercase().contains(kw))
            });
            let location_ok = location
                .as_deref()
                .map_or(true, |loc| job.location.to_lowercase().contains(loc));
            keyword_ok && location_ok
        })
        .collect();

    let per_page = params.per_page();
    let total_jobs = filtered.len() as i64;
    let total_pages = ((total_jobs as f64) / (per_page as f64)).ceil() as i64;
    let offset = ((params.page() - 1) * per_page) as usize;

    let jobs: Vec<Job> = filtered
        .into_iter()
        .skip(offset)
        .take(per_page as usize)
        .collect();

    SearchPage {
        jobs,
        total_jobs,
        total_pages,
        current_page: params.page(),
        source: "secondary-feed".to_string(),
    }
}

#[async_trait]
impl JobSource for SecondaryFeedService {
    fn name(&self) -> &'static str {
        "secondary-feed"
    }

    async fn fetch_page(&self, params: &SearchParams) -> Result<SearchPage> {
        self.fetch_filtered(params).await
    }
}
