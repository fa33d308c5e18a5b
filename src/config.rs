use serde::Deserialize;

/// Client configuration loaded from environment variables
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Redis connection URL backing the favorites, play record and flag stores
    #[serde(default = "default_redis_url")]
    pub redis_url: String,

    /// Namespace prepended to every Redis key this client writes
    #[serde(default = "default_storage_prefix")]
    pub storage_prefix: String,

    /// Base URL of the remote catalog API
    #[serde(default = "default_catalog_api_url")]
    pub catalog_api_url: String,

    /// Path of the ranked listing endpoint under `catalog_api_url`
    #[serde(default = "default_catalog_path")]
    pub catalog_path: String,

    /// Tag requested for both hot catalog slices
    #[serde(default = "default_catalog_tag")]
    pub catalog_tag: String,

    /// Seconds a fetched catalog slice stays in the response cache
    #[serde(default = "default_catalog_cache_ttl")]
    pub catalog_cache_ttl: u64,

    /// Loopback address the render layer connects to
    #[serde(default = "default_host")]
    pub host: String,

    /// Port the render layer connects to
    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_redis_url() -> String {
    "redis://localhost:6379".to_string()
}

fn default_storage_prefix() -> String {
    "warhut".to_string()
}

fn default_catalog_api_url() -> String {
    "http://localhost:3000".to_string()
}

fn default_catalog_path() -> String {
    "/api/catalog".to_string()
}

fn default_catalog_tag() -> String {
    "热门".to_string()
}

fn default_catalog_cache_ttl() -> u64 {
    1800
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    3100
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        envy::from_env::<Config>().map_err(|e| anyhow::anyhow!("Failed to load config: {}", e))
    }
}
