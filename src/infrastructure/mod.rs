// Storage, caching, media and request-viewer plumbing
pub mod database;              // Store interface
pub mod sqlite_database;       // SQLite-backed store
pub mod cache;                 // LRU building block
pub mod cache_layer;           // TTL page cache
pub mod traits;                // Infrastructure traits
pub mod viewer;                // Viewer context
pub mod middleware;            // Viewer middleware and extractors
pub mod media;                 // Uploaded file storage

pub use cache::Cache;
pub use cache_layer::LocalPageCache;
pub use database::DatabaseInterface;
pub use media::MediaStorage;
pub use sqlite_database::SqliteDatabase;
pub use traits::CacheInterface;
pub use viewer::ViewerContext;
