use std::sync::Arc;

use timber_inventory::{
    auth::{AuthSettings, TokenService},
    catalog::{CatalogRepository, PgCatalogRepository},
    config::AppConfig,
    create_router, db,
    inventory::{
        cache::{MemoryResolveCache, RedisResolveCache, ResolveCache},
        repository::PgInventoryRepository,
        resolver::ConfigurationResolver,
    },
    AppState,
};
use tracing_subscriber::EnvFilter;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Picks Redis when configured and reachable, otherwise an in-process cache
async fn build_cache(config: &AppConfig) -> Arc<dyn ResolveCache> {
    if let Some(redis_url) = &config.redis_url {
        match RedisResolveCache::connect(redis_url, config.resolve_cache_ttl).await {
            Ok(cache) => {
                tracing::info!("Using Redis resolver cache");
                return Arc::new(cache);
            }
            Err(e) => {
                tracing::warn!("Redis unavailable, using in-process resolver cache: {}", e);
            }
        }
    }
    Arc::new(MemoryResolveCache::new(
        config.resolve_cache_capacity,
        config.resolve_cache_ttl,
    ))
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Timber Inventory - Starting...");

    let config = AppConfig::from_env()?;
    let auth = AuthSettings::new(
        TokenService::new(config.jwt_secret.clone()),
        config.admin_emails.clone(),
    );
    let cache = build_cache(&config).await;

    let state = match &config.database_url {
        Some(database_url) => {
            tracing::info!("Connecting to database...");
            let pool = db::create_pool(database_url).await?;
            db::run_migrations(&pool).await?;

            let catalog: Arc<dyn CatalogRepository> =
                Arc::new(PgCatalogRepository::new(pool.clone()));
            let resolver = ConfigurationResolver::new(Some(catalog), cache);
            AppState::with_store(Arc::new(PgInventoryRepository::new(pool)), resolver, auth)
        }
        None => {
            tracing::warn!("DATABASE_URL not set; inventory routes will answer 503");
            AppState::without_store(ConfigurationResolver::new(None, cache), auth)
        }
    };

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Timber Inventory is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
