use std::sync::Arc;
use tracing::info;

use crate::{
    config::Config,
    infrastructure::{
        cache_layer::LocalPageCache, database::DatabaseInterface, media::MediaStorage,
        sqlite_database::SqliteDatabase, traits::CacheInterface,
    },
    pagination::Paginator,
    render::{JsonRenderer, Renderer},
    services::FollowService,
};

#[derive(Clone)]
pub struct AppState {
    pub db: Arc<dyn DatabaseInterface>,
    pub cache: Arc<dyn CacheInterface>,
    pub renderer: Arc<dyn Renderer>,
    pub media: Arc<MediaStorage>,
    pub follows: FollowService,
    pub paginator: Paginator,
    pub config: Arc<Config>,
}

impl AppState {
    pub async fn new(config: Config) -> anyhow::Result<Self> {
        // Connecting also creates the schema
        let database = SqliteDatabase::connect(&config.database.url).await?;
        info!("Database ready at {}", config.database.url);

        tokio::fs::create_dir_all(&config.media.root).await?;

        let cache = LocalPageCache::new(config.cache.capacity)?;

        Ok(Self::with_components(
            config,
            Arc::new(database),
            Arc::new(cache),
            Arc::new(JsonRenderer),
        ))
    }

    /// Assemble state from already-built collaborators.
    pub fn with_components(
        config: Config,
        db: Arc<dyn DatabaseInterface>,
        cache: Arc<dyn CacheInterface>,
        renderer: Arc<dyn Renderer>,
    ) -> Self {
        let media = MediaStorage::new(config.media.root.clone(), config.media.url.clone());
        Self {
            follows: FollowService::new(db.clone()),
            paginator: Paginator::new(config.listing.posts_per_page),
            media: Arc::new(media),
            config: Arc::new(config),
            db,
            cache,
            renderer,
        }
    }

    pub fn render(
        &self,
        template: &str,
        context: &serde_json::Value,
    ) -> crate::error::AppResult<crate::render::RenderedPage> {
        self.renderer.render(template, context)
    }
}
