use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use warhut_client::{
    api::{create_router, AppState},
    config::Config,
    db::{create_redis_client, Cache},
    services::{HttpCatalogProvider, ViewOrchestrator},
    store::RedisStore,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "warhut_client=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let redis_client = create_redis_client(&config.redis_url)?;
    let store = RedisStore::connect(redis_client.clone(), config.storage_prefix.clone()).await?;
    let (cache, cache_handle) = Cache::new(redis_client, config.storage_prefix.clone());

    let catalog = HttpCatalogProvider::new(config.catalog_api_url.clone())
        .with_path(config.catalog_path.clone())
        .with_cache(cache, config.catalog_cache_ttl);

    let orchestrator = Arc::new(ViewOrchestrator::new(
        Arc::new(catalog),
        Arc::new(store.clone()),
        Arc::new(store.clone()),
        Arc::new(store),
        config.catalog_tag.clone(),
    ));

    // Initial catalog load runs alongside the server so the first frame renders placeholders
    {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.mount().await });
    }

    let app = create_router(AppState::new(orchestrator));

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Client state server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for shutdown signal");
            }
            tracing::info!("Shutdown signal received");
        })
        .await?;

    cache_handle.shutdown().await;
    Ok(())
}
