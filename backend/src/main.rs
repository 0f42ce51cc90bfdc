//! Restaurant Inventory - Backend Server
//!
//! Records sales, deducts recipe ingredients from stock and raises
//! low stock warnings before the kitchen runs out.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use inventory_backend::{
    config::{Config, StoreBackend},
    create_app,
    store::{MemoryInventoryStore, PgInventoryStore},
    AppState,
};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "inventory_server=debug,inventory_backend=debug,tower_http=debug,sqlx=warn".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration
    dotenvy::dotenv().ok();
    let config = Config::load()?;

    tracing::info!("Starting Restaurant Inventory Server");
    tracing::info!("Environment: {}", config.environment);

    let state = match config.store.backend {
        StoreBackend::Postgres => {
            // Create database connection pool
            tracing::info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.database.max_connections)
                .min_connections(config.database.min_connections)
                .acquire_timeout(Duration::from_secs(30))
                .connect(&config.database.url)
                .await?;

            tracing::info!("Database connection established");

            // Run migrations in development
            if config.environment == "development" {
                tracing::info!("Running database migrations...");
                sqlx::migrate!("./migrations").run(&db_pool).await?;
                tracing::info!("Migrations completed");
            }

            let store = Arc::new(PgInventoryStore::new(db_pool));
            AppState {
                store: store.clone(),
                recipes: store,
                config: Arc::new(config.clone()),
            }
        }
        StoreBackend::Memory => {
            tracing::warn!("Using in-memory store, state is lost on restart");
            let store = Arc::new(MemoryInventoryStore::new());
            AppState {
                store: store.clone(),
                recipes: store,
                config: Arc::new(config.clone()),
            }
        }
    };

    // Build application
    let app = create_app(state);

    // Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
