use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::cache::SearchCache;
use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::search::{SearchPage, SearchParams};

/// One upstream job source. Sources are consulted in precedence order; an
/// empty page means "nothing here, try the next source" and is not an error.
#[async_trait]
pub trait JobSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fetch_page(&self, params: &SearchParams) -> Result<SearchPage>;
}

/// Merges the upstream sources behind a shared result cache.
///
/// Sources are tried strictly sequentially and the first non-empty page wins.
/// A source error is logged and falls through to the next source; only
/// exhaustion of every source surfaces as `NoJobsFound`. Every awaited fetch
/// races the caller's cancellation token so a superseded search stops cleanly
/// without touching the cache.
pub struct SearchService {
    sources: Vec<Arc<dyn JobSource>>,
    cache: Arc<SearchCache>,
}

impl SearchService {
    pub fn new(sources: Vec<Arc<dyn JobSource>>, cache: Arc<SearchCache>) -> Self {
        Self { sources, cache }
    }

    pub fn cache(&self) -> &Arc<SearchCache> {
        &self.cache
    }

    pub async fn search(
        &self,
        params: &SearchParams,
        cancel: &CancellationToken,
    ) -> Result<SearchPage> {
        let key = params.cache_key();
        if let Some(hit) = self.cache.get(&key) {
            debug!(page = params.page(), "search cache hit");
            return Ok(hit);
        }

        for source in &self.sources {
            if cancel.is_cancelled() {
                return Err(Error::Cancelled);
            }

            let page = tokio::select! {
                _ = cancel.cancelled() => return Err(Error::Cancelled),
                result = source.fetch_page(params) => result,
            };

            match page {
                Ok(page) if !page.is_empty() => {
                    let mut page = page;
                    page.jobs = dedup_by_id(page.jobs);
                    info!(
                        source = source.name(),
                        jobs = page.jobs.len(),
                        page = params.page(),
                        "search served"
                    );
                    self.cache.set(key, page.clone(), None);
                    return Ok(page);
                }
                Ok(_) => {
                    debug!(source = source.name(), "source returned no jobs");
                }
                Err(err) => {
                    warn!(
                        source = source.name(),
                        error = ?err,
                        "job source failed, trying next"
                    );
                }
            }
        }

        Err(Error::NoJobsFound)
    }

    pub fn invalidate(&self) {
        self.cache.clear();
    }
}

/// Deduplicates listings by id, keeping the first occurrence. Callers merge
/// source results in precedence order before deduplicating, so the earlier
/// source's copy survives.
pub fn dedup_by_id(jobs: Vec<Job>) -> Vec<Job> {
    let mut seen = HashSet::with_capacity(jobs.len());
    jobs.into_iter()
        .filter(|job| seen.insert(job.id.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(id: &str, source: &str) -> Job {
        Job {
            id: id.into(),
            title: format!("title-{}", id),
            company: source.into(),
            location: "Ottawa, ON".into(),
            description: None,
            required_skills: vec![],
            preferred_skills: vec![],
            salary: None,
            remote: false,
            job_type: None,
            industry: None,
            source: source.into(),
            url: None,
            posted_at: None,
        }
    }

    #[test]
    fn dedup_keeps_first_occurrence_in_precedence_order() {
        let primary = vec![job("a", "primary"), job("b", "primary")];
        let fallback = vec![job("b", "feed"), job("c", "feed")];
        let merged: Vec<Job> = primary.into_iter().chain(fallback).collect();

        let deduped = dedup_by_id(merged);
        assert_eq!(deduped.len(), 3);
        let b = deduped.iter().find(|j| j.id == "b").unwrap();
        assert_eq!(b.source, "primary");
    }

    #[test]
    fn dedup_preserves_order() {
        let jobs = vec![job("x", "s"), job("y", "s"), job("x", "s")];
        let deduped = dedup_by_id(jobs);
        let ids: Vec<&str> = deduped.iter().map(|j| j.id.as_str()).collect();
        assert_eq!(ids, vec!["x", "y"]);
    }
}
