use anyhow::{Context, Result};
use axum::Router;
use bucket_index::{
    config::AppConfig,
    routes,
    services::{
        cache::{MemoryCache, PageCache, RedisCache},
        storage_service::{S3Lister, S3Settings},
    },
    state::AppState,
};
use std::{io::ErrorKind, sync::Arc};
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // --- Parse config ---
    let cfg = AppConfig::from_env_and_args()?;

    tracing::info!("Starting bucket-index with config: {:?}", cfg);
    if !cfg.auth_enabled() {
        tracing::info!("No PASSWORD configured, listing is public");
    }

    // --- Page cache ---
    let cache: Arc<dyn PageCache> = match &cfg.redis_url {
        Some(url) => {
            let redis = RedisCache::connect(url)
                .await
                .with_context(|| format!("connecting to redis at {}", url))?;
            tracing::info!("Using redis page cache at {}", url);
            Arc::new(redis)
        }
        None => {
            tracing::warn!("REDIS_URL not set, using an in-process page cache");
            Arc::new(MemoryCache::new())
        }
    };

    // --- Storage backend ---
    let lister = S3Lister::new(&S3Settings {
        bucket: cfg.bucket.clone(),
        region: cfg.region.clone(),
        endpoint: cfg.endpoint.clone(),
        access_key: cfg.access_key.clone(),
        secret_access_key: cfg.secret_access_key.clone(),
    })?;

    // --- Build router ---
    let state = AppState::new(&cfg, Arc::new(lister), cache);
    let app: Router = routes::routes::routes().with_state(state);

    // --- Start server ---
    let addr = cfg.addr();
    let listener = match TcpListener::bind(&addr).await {
        Ok(listener) => listener,
        Err(err)
            if err.kind() == ErrorKind::PermissionDenied
                && matches!(cfg.host.as_str(), "0.0.0.0" | "::") =>
        {
            let fallback_addr = format!("127.0.0.1:{}", cfg.port);
            tracing::warn!(
                "Permission denied binding to {} ({}). Falling back to {}",
                addr,
                err,
                fallback_addr
            );
            TcpListener::bind(&fallback_addr).await?
        }
        Err(err) => return Err(err.into()),
    };

    tracing::info!("Server listening on http://{}", listener.local_addr()?);
    axum::serve(listener, app).await?;

    Ok(())
}
