use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::error::Error;
use crate::models::search::SearchParams;
use crate::services::search_service::SearchService;

/// Warms the cache with the next result page while the current one is being
/// viewed. A settle delay keeps the prefetch from racing the primary fetch,
/// and every failure is swallowed: a prefetch must never surface an error or
/// disturb the page the user is looking at.
pub struct PrefetchService {
    search: Arc<SearchService>,
    settle_delay: Duration,
    // Token of the most recent prefetch; scheduling a new one cancels it.
    current: Mutex<CancellationToken>,
}

impl PrefetchService {
    pub fn new(search: Arc<SearchService>, settle_delay: Duration) -> Self {
        Self {
            search,
            settle_delay,
            current: Mutex::new(CancellationToken::new()),
        }
    }

    /// Schedules a prefetch of `page + 1` unless the current page is the last
    /// one or the next page is already cached.
    pub fn schedule(&self, params: &SearchParams, total_pages: i64) {
        if params.page() >= total_pages {
            return;
        }

        let next = params.next_page();
        let key = next.cache_key();
        if self.search.cache().contains(&key) {
            return;
        }

        let token = {
            let mut current = self.current.lock().expect("prefetch mutex poisoned");
            current.cancel();
            *current = CancellationToken::new();
            current.clone()
        };

        let search = Arc::clone(&self.search);
        let delay = self.settle_delay;
        tokio::spawn(async move {
            tokio::select! {
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            // Re-check: the user may have paged forward during the delay.
            if search.cache().contains(&key) {
                return;
            }

            match search.search(&next, &token).await {
                Ok(page) => {
                    debug!(
                        page = next.page(),
                        jobs = page.jobs.len(),
                        "prefetched next page"
                    );
                }
                Err(Error::NoJobsFound) | Err(Error::Cancelled) => {}
                Err(err) => {
                    debug!(page = next.page(), error = ?err, "prefetch failed");
                }
            }
        });
    }

    /// Cancels any in-flight prefetch, used when a new search supersedes the
    /// one the prefetch belonged to.
    pub fn cancel_pending(&self) {
        let current = self.current.lock().expect("prefetch mutex poisoned");
        current.cancel();
    }
}
