use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::models::search::{CacheKey, SearchPage};

struct Entry {
    payload: SearchPage,
    expires_at: Instant,
    last_accessed: Instant,
    access_seq: u64,
    size: usize,
}

struct Inner {
    entries: HashMap<CacheKey, Entry>,
    total_size: usize,
    // Monotonic counter ordering accesses; ties in Instant resolution would
    // make LRU eviction nondeterministic.
    seq: u64,
}

/// Bounded TTL + LRU cache for search result pages. Constructed once at
/// startup and shared through `AppState`; there is no global instance.
///
/// Size accounting is approximate (serialized length of the payload) and only
/// drives relative eviction order under pressure, not a hard memory bound.
/// Misses are not errors; callers fall back to the sources.
pub struct SearchCache {
    inner: Mutex<Inner>,
    default_ttl: Duration,
    max_size: usize,
}

impl SearchCache {
    pub fn new(default_ttl: Duration, max_size: usize) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                total_size: 0,
                seq: 0,
            }),
            default_ttl,
            max_size,
        }
    }

    /// Returns the cached page if present and unexpired. An expired entry is
    /// removed as a side effect and reported as a miss. A hit refreshes the
    /// entry's position in the LRU order.
    pub fn get(&self, key: &CacheKey) -> Option<SearchPage> {
        let mut inner = self.inner.lock().expect("search cache mutex poisoned");
        let now = Instant::now();

        let expired = match inner.entries.get(key) {
            Some(entry) => now >= entry.expires_at,
            None => return None,
        };

        if expired {
            if let Some(entry) = inner.entries.remove(key) {
                inner.total_size -= entry.size;
            }
            debug!(?key, "cache entry expired");
            return None;
        }

        inner.seq += 1;
        let seq = inner.seq;
        let entry = inner
            .entries
            .get_mut(key)
            .expect("entry checked present above");
        entry.last_accessed = now;
        entry.access_seq = seq;
        Some(entry.payload.clone())
    }

    /// Inserts a page, evicting least-recently-accessed entries one at a time
    /// until it fits under the configured capacity. An entry individually
    /// larger than the whole capacity is dropped with a warning; that is not
    /// an error for the caller.
    pub fn set(&self, key: CacheKey, payload: SearchPage, ttl: Option<Duration>) {
        let size = serde_json::to_string(&payload)
            .map(|s| s.len())
            .unwrap_or(0);
        self.set_sized(key, payload, ttl, size);
    }

    pub fn set_sized(
        &self,
        key: CacheKey,
        payload: SearchPage,
        ttl: Option<Duration>,
        size: usize,
    ) {
        if size > self.max_size {
            warn!(
                size,
                max_size = self.max_size,
                "cache entry larger than capacity, dropping"
            );
            return;
        }

        let mut inner = self.inner.lock().expect("search cache mutex poisoned");
        let now = Instant::now();

        // Replacing an existing entry releases its size first.
        if let Some(old) = inner.entries.remove(&key) {
            inner.total_size -= old.size;
        }

        while inner.total_size + size > self.max_size {
            let victim = inner
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.access_seq)
                .map(|(k, _)| k.clone());
            match victim {
                Some(victim_key) => {
                    if let Some(evicted) = inner.entries.remove(&victim_key) {
                        inner.total_size -= evicted.size;
                        debug!(
                            ?victim_key,
                            size = evicted.size,
                            idle_secs = evicted.last_accessed.elapsed().as_secs(),
                            "evicted LRU cache entry"
                        );
                    }
                }
                None => break,
            }
        }

        inner.seq += 1;
        let seq = inner.seq;
        inner.total_size += size;
        inner.entries.insert(
            key,
            Entry {
                payload,
                expires_at: now + ttl.unwrap_or(self.default_ttl),
                last_accessed: now,
                access_seq: seq,
                size,
            },
        );
    }

    pub fn delete(&self, key: &CacheKey) {
        let mut inner = self.inner.lock().expect("search cache mutex poisoned");
        if let Some(entry) = inner.entries.remove(key) {
            inner.total_size -= entry.size;
        }
    }

    pub fn clear(&self) {
        let mut inner = self.inner.lock().expect("search cache mutex poisoned");
        inner.entries.clear();
        inner.total_size = 0;
    }

    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .expect("search cache mutex poisoned")
            .entries
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &CacheKey) -> bool {
        let inner = self.inner.lock().expect("search cache mutex poisoned");
        inner
            .entries
            .get(key)
            .map(|entry| Instant::now() < entry.expires_at)
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::search::SearchParams;

    fn key(page: i64) -> CacheKey {
        SearchParams {
            keywords: Some(format!("page-{}", page)),
            page,
            ..Default::default()
        }
        .cache_key()
    }

    fn page(n: i64) -> SearchPage {
        SearchPage {
            jobs: vec![],
            total_jobs: n,
            total_pages: 1,
            current_page: 1,
            source: "test".into(),
        }
    }

    #[test]
    fn set_then_get_round_trips() {
        let cache = SearchCache::new(Duration::from_secs(60), 1024 * 1024);
        let k = key(1);
        cache.set(k.clone(), page(7), None);
        assert_eq!(cache.get(&k), Some(page(7)));
    }

    #[test]
    fn get_is_idempotent_and_does_not_evict_others() {
        let cache = SearchCache::new(Duration::from_secs(60), 1024 * 1024);
        cache.set(key(1), page(1), None);
        cache.set(key(2), page(2), None);
        assert_eq!(cache.get(&key(1)), Some(page(1)));
        assert_eq!(cache.get(&key(1)), Some(page(1)));
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&key(2)), Some(page(2)));
    }

    #[test]
    fn zero_ttl_entry_is_a_miss() {
        let cache = SearchCache::new(Duration::from_secs(60), 1024 * 1024);
        let k = key(1);
        cache.set(k.clone(), page(1), Some(Duration::ZERO));
        assert_eq!(cache.get(&k), None);
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn eviction_removes_least_recently_accessed_first() {
        let cache = SearchCache::new(Duration::from_secs(60), 300);
        cache.set_sized(key(1), page(1), None, 100);
        cache.set_sized(key(2), page(2), None, 100);
        cache.set_sized(key(3), page(3), None, 100);

        // Touch 1 so 2 becomes the coldest entry.
        assert!(cache.get(&key(1)).is_some());

        cache.set_sized(key(4), page(4), None, 100);
        assert!(cache.get(&key(1)).is_some());
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(3)).is_some());
        assert!(cache.get(&key(4)).is_some());
    }

    #[test]
    fn eviction_continues_until_new_entry_fits() {
        let cache = SearchCache::new(Duration::from_secs(60), 300);
        cache.set_sized(key(1), page(1), None, 100);
        cache.set_sized(key(2), page(2), None, 100);
        cache.set_sized(key(3), page(3), None, 100);
        cache.set_sized(key(4), page(4), None, 150);
        assert_eq!(cache.len(), 2);
        assert!(cache.get(&key(3)).is_some());
        assert!(cache.get(&key(4)).is_some());
    }

    #[test]
    fn oversized_entry_is_rejected_without_touching_existing() {
        let cache = SearchCache::new(Duration::from_secs(60), 200);
        cache.set_sized(key(1), page(1), None, 100);
        cache.set_sized(key(2), page(2), None, 500);
        assert!(cache.get(&key(2)).is_none());
        assert!(cache.get(&key(1)).is_some());
    }

    #[test]
    fn replacing_a_key_releases_its_old_size() {
        let cache = SearchCache::new(Duration::from_secs(60), 200);
        let k = key(1);
        cache.set_sized(k.clone(), page(1), None, 150);
        cache.set_sized(k.clone(), page(2), None, 150);
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&k), Some(page(2)));
    }

    #[test]
    fn delete_and_clear_remove_immediately() {
        let cache = SearchCache::new(Duration::from_secs(60), 1024);
        cache.set_sized(key(1), page(1), None, 10);
        cache.set_sized(key(2), page(2), None, 10);
        cache.delete(&key(1));
        assert!(cache.get(&key(1)).is_none());
        cache.clear();
        assert!(cache.is_empty());
    }
}
