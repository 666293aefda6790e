use serde::{Deserialize, Serialize};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub database: DatabaseConfig,
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub listing: ListingConfig,
    pub media: MediaConfig,
    pub auth: AuthConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    pub capacity: usize,
    /// Page window for the cached index listing.
    pub index_ttl_secs: u64,
}

impl CacheConfig {
    pub fn index_ttl(&self) -> Duration {
        Duration::from_secs(self.index_ttl_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingConfig {
    pub posts_per_page: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    pub root: PathBuf,
    pub url: String,
    pub max_upload_bytes: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    pub login_url: String,
    pub remote_user_header: String,
    pub create_unknown_users: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            database: DatabaseConfig {
                url: "sqlite:data/yatube.db".to_string(),
            },
            server: ServerConfig {
                host: "0.0.0.0".to_string(),
                port: 8000,
            },
            cache: CacheConfig {
                capacity: 1000,
                index_ttl_secs: 20,
            },
            listing: ListingConfig { posts_per_page: 10 },
            media: MediaConfig {
                root: PathBuf::from("media"),
                url: "/media/".to_string(),
                max_upload_bytes: 10 * 1024 * 1024,
            },
            auth: AuthConfig {
                login_url: "/auth/login/".to_string(),
                remote_user_header: "x-remote-user".to_string(),
                create_unknown_users: true,
            },
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let defaults = Self::default();
        let config = Self {
            database: DatabaseConfig {
                url: env::var("DATABASE_URL").unwrap_or(defaults.database.url),
            },
            server: ServerConfig {
                host: env::var("SERVER_HOST").unwrap_or(defaults.server.host),
                port: env_parse("SERVER_PORT", defaults.server.port)?,
            },
            cache: CacheConfig {
                capacity: env_parse("CACHE_CAPACITY", defaults.cache.capacity)?,
                index_ttl_secs: env_parse("INDEX_CACHE_TTL_SECS", defaults.cache.index_ttl_secs)?,
            },
            listing: ListingConfig {
                posts_per_page: env_parse("POSTS_PER_PAGE", defaults.listing.posts_per_page)?,
            },
            media: MediaConfig {
                root: env::var("MEDIA_ROOT")
                    .map(PathBuf::from)
                    .unwrap_or(defaults.media.root),
                url: env::var("MEDIA_URL").unwrap_or(defaults.media.url),
                max_upload_bytes: env_parse("MAX_UPLOAD_BYTES", defaults.media.max_upload_bytes)?,
            },
            auth: AuthConfig {
                login_url: env::var("LOGIN_URL").unwrap_or(defaults.auth.login_url),
                remote_user_header: env::var("REMOTE_USER_HEADER")
                    .unwrap_or(defaults.auth.remote_user_header)
                    .to_ascii_lowercase(),
                create_unknown_users: env_parse(
                    "CREATE_UNKNOWN_USERS",
                    defaults.auth.create_unknown_users,
                )?,
            },
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.listing.posts_per_page == 0 {
            anyhow::bail!("POSTS_PER_PAGE must be greater than zero");
        }
        if self.cache.capacity == 0 {
            anyhow::bail!("CACHE_CAPACITY must be greater than zero");
        }
        if self.media.url.len() < 3 || !self.media.url.starts_with('/') || !self.media.url.ends_with('/') {
            anyhow::bail!("MEDIA_URL must be a sub-path that starts and ends with '/'");
        }
        Ok(())
    }

    pub fn server_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("Invalid value for {}: {}", key, e)),
        Err(_) => Ok(default),
    }
}
