//! Restaurant inventory backend
//!
//! Ingredient consumption and stock reconciliation behind an axum API.
//! The binary in `main.rs` only wires configuration, logging and the store.

use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod services;
pub mod store;

pub use config::Config;
pub use error::{AppError, AppResult};

use services::{CatalogService, DeductionService, LedgerService};
use store::{InventoryStore, RecipeCatalog};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn InventoryStore>,
    pub recipes: Arc<dyn RecipeCatalog>,
    pub config: Arc<Config>,
}

impl AppState {
    pub fn deduction_service(&self) -> DeductionService {
        DeductionService::new(
            self.store.clone(),
            self.recipes.clone(),
            self.config.reconciliation.max_attempts,
        )
    }

    pub fn catalog_service(&self) -> CatalogService {
        CatalogService::new(self.store.clone())
    }

    pub fn ledger_service(&self) -> LedgerService {
        LedgerService::new(self.store.clone())
    }
}

/// Create the application router with all routes and middleware
pub fn create_app(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(root))
        .route("/health", get(handlers::health_check))
        .nest("/api/v1", routes::api_routes(state.clone()))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Root endpoint
async fn root() -> &'static str {
    "Restaurant Inventory API v1.0"
}
