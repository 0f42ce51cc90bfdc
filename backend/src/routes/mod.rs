//! Route definitions for the restaurant inventory platform

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use crate::{handlers, middleware::auth_middleware, AppState};

/// Create API routes
pub fn api_routes(state: AppState) -> Router<AppState> {
    Router::new()
        // Health check (public)
        .route("/health", get(handlers::health_check))
        // Protected routes - inventory engine
        .nest("/inventory", inventory_routes(state))
}

/// Inventory routes (protected)
fn inventory_routes(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/sales",
            get(handlers::list_sales).post(handlers::record_sale),
        )
        .route("/deductions", get(handlers::list_deductions))
        .route("/warnings", get(handlers::list_warnings))
        .route("/warnings/live", get(handlers::scan_low_stock))
        .route("/warnings/:warning_id/resolve", post(handlers::resolve_warning))
        .route(
            "/ingredients",
            get(handlers::list_ingredients).post(handlers::register_ingredient),
        )
        .route(
            "/ingredients/:ingredient_id/deactivate",
            post(handlers::deactivate_ingredient),
        )
        .route(
            "/ingredients/:ingredient_id/restock",
            post(handlers::restock_ingredient),
        )
        .route(
            "/ingredients/:ingredient_id/adjust",
            post(handlers::adjust_ingredient),
        )
        .route(
            "/ingredients/:ingredient_id/adjustments",
            get(handlers::list_adjustments),
        )
        .route(
            "/ingredients/:ingredient_id/audit",
            get(handlers::audit_ingredient),
        )
        .route("/recipes", post(handlers::register_recipe))
        .route("/usage-report", get(handlers::usage_report))
        .route("/analytics", get(handlers::sales_analytics))
        .route("/dashboard", get(handlers::sales_dashboard))
        .route_layer(middleware::from_fn_with_state(state, auth_middleware))
}
