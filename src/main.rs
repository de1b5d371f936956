use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use debatedash::{
    api,
    config::AppConfig,
    state::{AppState, StatementPool},
    store::{GameRepository, InMemoryRepository, SqliteRepository},
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present (before any env var reads)
    if let Err(e) = dotenvy::dotenv() {
        // Not an error if .env doesn't exist, only log if it's a different issue
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Warning: Failed to load .env file: {}", e);
        }
    }

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "debatedash=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting debatedash...");

    let config = AppConfig::from_env();

    let repo: Arc<dyn GameRepository> = match &config.database_path {
        Some(path) => Arc::new(SqliteRepository::new(path)?),
        None => Arc::new(InMemoryRepository::new()),
    };

    let statements = StatementPool::builtin();
    tracing::info!("Loaded {} statements", statements.len());

    let state = Arc::new(AppState::new(repo, statements, &config));

    let app = api::router(state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    tracing::info!("Listening on http://{}", config.bind_addr);

    let listener = tokio::net::TcpListener::bind(config.bind_addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}
