use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use menufan_api::{config::Config, db::PgDocumentStore, router, services::metrics, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;

    let store = PgDocumentStore::connect(&config.database_url, config.database_max_connections).await?;
    store.run_migrations().await?;
    info!("Database connected and migrations applied");

    metrics::start(store.clone());
    info!(
        "Sub-service matching: {:?}, cache TTL {}s",
        config.sub_service_matching, config.cache_ttl_seconds
    );

    let addr = format!("{}:{}", config.host, config.port);
    let app = router(AppState::new(store, config));

    info!("Menu fan-out API listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
