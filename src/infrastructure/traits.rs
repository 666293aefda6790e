use async_trait::async_trait;
use std::time::Duration;

use crate::render::RenderedPage;

/// Time-bounded key-value store for rendered listing pages.
///
/// Readers may see a page that is up to `ttl` old; nothing is invalidated
/// on write.
#[async_trait]
pub trait CacheInterface: Send + Sync {
    async fn get_page(&self, key: &str) -> Option<RenderedPage>;
    async fn put_page(&self, key: &str, page: RenderedPage, ttl: Duration);
    async fn invalidate(&self, key: &str) -> bool;
    async fn clear(&self);
}
