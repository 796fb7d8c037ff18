use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use brandforge::cache::AgentCache;
use brandforge::config::Config;
use brandforge::db::PgBrandStore;
use brandforge::llm::GeminiAdapter;
use brandforge::routes::create_router;
use brandforge::scrape::HttpPageFetcher;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "brandforge=debug,tower_http=debug,axum=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    let config = Config::from_env()?;
    info!("Configuration loaded: {:?}", config.server);

    // The agent graph is static; refuse to boot if it is ever edited into
    // an invalid shape.
    brandforge::agents::validate_pipeline().map_err(|e| anyhow::anyhow!(e))?;

    // Connect to database
    let pool = brandforge::db::create_pool(&config.database).await?;

    // Run migrations
    info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to run migrations: {}", e))?;
    info!("Database migrations completed");

    // Create shared state with the production collaborators
    let state = brandforge::AppState {
        store: Arc::new(PgBrandStore::new(pool)),
        cache: Arc::new(AgentCache::new(Duration::from_secs(config.cache.ttl_secs))),
        generator: Arc::new(GeminiAdapter::new(
            &config.llm.gemini_api_key,
            &config.llm.model,
        )),
        fetcher: Arc::new(HttpPageFetcher::new(config.scrape.clone())),
        config: config.clone(),
    };

    // Create router
    let app = create_router(state);

    // Start server
    let addr = SocketAddr::from(([0, 0, 0, 0], config.server.port));
    info!("Server listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .await
        .map_err(|e| anyhow::anyhow!("Server error: {}", e))?;

    Ok(())
}
