use std::sync::Arc;
use std::time::Duration;

use wayfare_api::{
    api::{create_router, AppState},
    db,
    services::{
        gateway::RecommendationEngine,
        stores::{
            EventStore, PgEventStore, PgPreferenceLedger, PgRatingStore, PgTagCatalog,
            PreferenceLedger, RatingStore, TagCatalog,
        },
        HttpRecommendationGateway, InteractionRecorder, RatingReconciler, WeightPolicy,
    },
    Config,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    wayfare_api::init_tracing();

    let config = Config::from_env()?;

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let redis_client = db::create_redis_client(&config.redis_url)?;
    let (cache, cache_writer) = db::Cache::new(redis_client);

    let engine: Arc<dyn RecommendationEngine> = Arc::new(HttpRecommendationGateway::new(
        config.engine_url.clone(),
        config.engine_api_key.clone(),
        Duration::from_millis(config.engine_timeout_ms),
    )?);

    let events: Arc<dyn EventStore> = Arc::new(PgEventStore::new(pool.clone()));
    let ledger: Arc<dyn PreferenceLedger> = Arc::new(PgPreferenceLedger::new(pool.clone()));
    let ratings: Arc<dyn RatingStore> = Arc::new(PgRatingStore::new(pool.clone()));
    let catalog: Arc<dyn TagCatalog> = Arc::new(PgTagCatalog::new(pool.clone(), cache.clone()));

    let policy = WeightPolicy::new();
    let recorder = Arc::new(InteractionRecorder::new(
        Arc::clone(&events),
        Arc::clone(&ledger),
        Arc::clone(&catalog),
        Arc::clone(&engine),
        policy,
    ));
    let reconciler = Arc::new(RatingReconciler::new(
        Arc::clone(&ratings),
        Arc::clone(&ledger),
        Arc::clone(&catalog),
        Arc::clone(&engine),
        policy,
    ));

    let state = AppState {
        recorder,
        reconciler,
        engine,
        ledger,
        events,
        ratings,
        cache,
    };

    let app = create_router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(addr = %addr, "Server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // Flush queued cache writes before exiting.
    cache_writer.shutdown().await;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
    }
}
