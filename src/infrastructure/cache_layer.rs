// Page cache - TTL entries on top of the LRU cache

use async_trait::async_trait;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::{debug, info, instrument};

use crate::error::AppResult;
use crate::infrastructure::cache::Cache;
use crate::infrastructure::traits::CacheInterface;
use crate::render::RenderedPage;

/// Cache entry with TTL
#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub page: RenderedPage,
    pub inserted_at: Instant,
    pub ttl: Duration,
}

impl CacheEntry {
    pub fn new(page: RenderedPage, ttl: Duration) -> Self {
        Self {
            page,
            inserted_at: Instant::now(),
            ttl,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.inserted_at.elapsed() >= self.ttl
    }
}

/// In-process page cache shared by all request handlers.
pub struct LocalPageCache {
    entries: Mutex<Cache<String, CacheEntry>>,
}

impl std::fmt::Debug for LocalPageCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalPageCache").finish_non_exhaustive()
    }
}

impl LocalPageCache {
    pub fn new(capacity: usize) -> AppResult<Self> {
        Ok(Self {
            entries: Mutex::new(Cache::new(capacity)?),
        })
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

/// Drop every expired entry, keeping the recency order of the rest.
fn purge_expired(entries: &mut Cache<String, CacheEntry>) -> usize {
    let mut survivors = Vec::new();
    let mut removed = 0;
    // The LRU has no retain, so rebuild it from the live entries.
    while let Some((key, entry)) = entries.pop_lru() {
        if entry.is_expired() {
            removed += 1;
        } else {
            survivors.push((key, entry));
        }
    }
    for (key, entry) in survivors {
        entries.insert(key, entry);
    }
    removed
}

#[async_trait]
impl CacheInterface for LocalPageCache {
    async fn get_page(&self, key: &str) -> Option<RenderedPage> {
        let mut entries = self.entries.lock().await;
        let key = key.to_string();
        let expired = match entries.get(&key) {
            Some(entry) if !entry.is_expired() => {
                debug!("Page cache hit for {}", key);
                return Some(entry.page.clone());
            }
            Some(_) => true,
            None => false,
        };
        if expired {
            debug!("Page cache entry for {} expired", key);
            entries.remove(&key);
        }
        None
    }

    async fn put_page(&self, key: &str, page: RenderedPage, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }
        let mut entries = self.entries.lock().await;
        let key = key.to_string();
        // Stale pages go before a live one is evicted.
        if entries.len() >= entries.capacity() && entries.get(&key).is_none() {
            let removed = purge_expired(&mut entries);
            if removed > 0 {
                debug!("Purged {} expired pages", removed);
            }
        }
        entries.insert(key, CacheEntry::new(page, ttl));
    }

    async fn invalidate(&self, key: &str) -> bool {
        let mut entries = self.entries.lock().await;
        entries.remove(&key.to_string()).is_some()
    }

    #[instrument(skip(self))]
    async fn clear(&self) {
        let mut entries = self.entries.lock().await;
        entries.clear();
        info!("Page cache cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn page(body: &str) -> RenderedPage {
        RenderedPage {
            content_type: "application/json".to_string(),
            body: body.as_bytes().to_vec(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expires_after_ttl() {
        let cache = LocalPageCache::new(10).unwrap();
        cache.put_page("/", page("v1"), Duration::from_secs(20)).await;

        tokio::time::advance(Duration::from_secs(19)).await;
        assert_eq!(cache.get_page("/").await, Some(page("v1")));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(cache.get_page("/").await, None);
        assert_eq!(cache.len().await, 0);
    }

    #[tokio::test]
    async fn test_clear_and_invalidate() {
        let cache = LocalPageCache::new(10).unwrap();
        cache.put_page("/", page("a"), Duration::from_secs(20)).await;
        cache.put_page("/?page=2", page("b"), Duration::from_secs(20)).await;

        assert!(cache.invalidate("/?page=2").await);
        assert!(!cache.invalidate("/?page=2").await);
        assert!(cache.get_page("/").await.is_some());

        cache.clear().await;
        assert!(cache.get_page("/").await.is_none());
    }

    #[tokio::test]
    async fn test_zero_ttl_is_not_stored() {
        let cache = LocalPageCache::new(10).unwrap();
        cache.put_page("/", page("a"), Duration::ZERO).await;
        assert!(cache.get_page("/").await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_full_cache_drops_expired_before_live() {
        let cache = LocalPageCache::new(2).unwrap();
        cache.put_page("long", page("b"), Duration::from_secs(60)).await;
        cache.put_page("short", page("a"), Duration::from_secs(5)).await;

        tokio::time::advance(Duration::from_secs(10)).await;
        cache.put_page("new", page("c"), Duration::from_secs(60)).await;

        assert_eq!(cache.len().await, 2);
        assert_eq!(cache.get_page("long").await, Some(page("b")));
        assert_eq!(cache.get_page("new").await, Some(page("c")));
    }
}
