use roomgate::{gateway, AppState, InMemoryStore, KeyValueStore, RedisStore, ServerConfig};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "roomgate=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::from_env();
    info!(
        environment = ?config.environment,
        capacity = config.admission.capacity,
        stale_threshold_secs = config.admission.stale_threshold.as_secs(),
        consistency = %config.admission.consistency,
        "Starting room admission gateway"
    );

    // Redis in production, in-memory store when no URL is configured
    let store: Arc<dyn KeyValueStore + Send + Sync> = match &config.redis_url {
        Some(url) => Arc::new(RedisStore::connect(url).await?),
        None => {
            warn!("REDIS_URL not set, room state is kept in memory");
            Arc::new(InMemoryStore::new())
        }
    };

    let app_state = AppState::new(store, config.admission.clone(), config.environment);
    let app = gateway::router(app_state);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    info!(bind_addr = %config.bind_addr, "Server listening");
    axum::serve(listener, app).await?;

    Ok(())
}
