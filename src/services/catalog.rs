//! Remote catalog access
//!
//! The catalog API ranks titles by listing type and tag. Responses are
//! ephemeral display data, so the only persistence is the optional response
//! cache in front of the HTTP call.
use tracing::instrument;

use crate::{
    cached,
    db::{Cache, CacheKey},
    error::{AppError, AppResult},
    models::{CatalogItem, CatalogKind, CatalogResponse},
};
use reqwest::Client as HttpClient;

const DEFAULT_CACHE_TTL: u64 = 1800; // 30 minutes
const DEFAULT_CATALOG_PATH: &str = "/api/catalog";

/// Source of ranked catalog slices
#[cfg_attr(test, mockall::automock)]
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    /// Fetch one ranked slice, e.g. hot movies
    async fn fetch_slice(&self, kind: CatalogKind, tag: &str) -> AppResult<Vec<CatalogItem>>;

    /// Provider name for logging and debugging
    fn name(&self) -> &'static str;
}

/// Catalog provider calling `GET {api_url}{path}?type=..&tag=..`
///
/// `path` defaults to `/api/catalog`.
#[derive(Clone)]
pub struct HttpCatalogProvider {
    http_client: HttpClient,
    api_url: String,
    path: String,
    cache: Option<Cache>,
    cache_ttl: u64,
}

impl HttpCatalogProvider {
    pub fn new(api_url: impl Into<String>) -> Self {
        Self {
            http_client: HttpClient::new(),
            api_url: api_url.into().trim_end_matches('/').to_string(),
            path: DEFAULT_CATALOG_PATH.to_string(),
            cache: None,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Request slices from `path` instead of the default endpoint
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        let path = path.into();
        self.path = if path.starts_with('/') {
            path
        } else {
            format!("/{}", path)
        };
        self
    }

    /// Serve repeated slice requests from `cache` for `ttl` seconds
    pub fn with_cache(mut self, cache: Cache, ttl: u64) -> Self {
        self.cache = Some(cache);
        self.cache_ttl = ttl;
        self
    }

    async fn request_slice(&self, kind: CatalogKind, tag: &str) -> AppResult<Vec<CatalogItem>> {
        let url = format!("{}{}", self.api_url, self.path);
        let response = self
            .http_client
            .get(&url)
            .query(&[("type", kind.as_str()), ("tag", tag)])
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::ExternalApi(format!(
                "Catalog API returned status {}: {}",
                status, body
            )));
        }

        let data: CatalogResponse = response.json().await?;

        tracing::info!(
            kind = %kind,
            tag = %tag,
            code = data.code,
            results = data.list.len(),
            provider = "http",
            "Catalog slice fetched"
        );

        Ok(data.list)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for HttpCatalogProvider {
    #[instrument(skip(self), fields(provider = "http"))]
    async fn fetch_slice(&self, kind: CatalogKind, tag: &str) -> AppResult<Vec<CatalogItem>> {
        let key = CacheKey::CatalogSlice {
            kind,
            tag: tag.to_string(),
        };

        cached!(self.cache, key, self.cache_ttl, async move {
            self.request_slice(kind, tag).await
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
