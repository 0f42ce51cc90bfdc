//! HTTP handlers for inventory endpoints

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Deserialize;
use shared::{
    DateRange, Ingredient, IngredientDeduction, LedgerAudit, LowStockWarning, NewIngredient,
    NewRecipe, Recipe, SaleItemInput, SalesAnalytics, SalesDashboard, SalesRecord,
    StockAdjustment, UsageReportRow,
};
use uuid::Uuid;

use crate::error::AppResult;
use crate::middleware::{check_permission, CurrentUser, INVENTORY_WRITE};
use crate::services::SaleOutcome;
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct RecordSaleRequest {
    pub items: Vec<SaleItemInput>,
    /// Business date of the sale, defaults to today (UTC)
    pub date: Option<NaiveDate>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RestockRequest {
    pub quantity: Decimal,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AdjustStockRequest {
    pub delta: Decimal,
    pub reason: String,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct DateRangeQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl From<DateRangeQuery> for DateRange {
    fn from(query: DateRangeQuery) -> Self {
        DateRange::new(query.start_date, query.end_date)
    }
}

#[derive(Debug, Deserialize)]
pub struct UsageReportQuery {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    /// Day to summarize, defaults to today (UTC)
    pub date: Option<NaiveDate>,
}

// ============================================================================
// Sales
// ============================================================================

/// Record a sale and deduct its ingredients
pub async fn record_sale(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<RecordSaleRequest>,
) -> AppResult<(StatusCode, Json<SaleOutcome>)> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let date = input.date.unwrap_or_else(|| Utc::now().date_naive());
    let outcome = state
        .deduction_service()
        .process_sale(current_user.0.actor(), input.items, date, input.notes)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

pub async fn list_sales(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<SalesRecord>>> {
    let sales = state
        .ledger_service()
        .list_sales(current_user.0.restaurant_id, query.into())
        .await?;
    Ok(Json(sales))
}

pub async fn list_deductions(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DateRangeQuery>,
) -> AppResult<Json<Vec<IngredientDeduction>>> {
    let deductions = state
        .ledger_service()
        .list_deductions(current_user.0.restaurant_id, query.into())
        .await?;
    Ok(Json(deductions))
}

// ============================================================================
// Warnings
// ============================================================================

/// Open low stock warnings, most urgent first
pub async fn list_warnings(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockWarning>>> {
    let warnings = state
        .deduction_service()
        .get_low_stock_warnings(current_user.0.restaurant_id)
        .await?;
    Ok(Json(warnings))
}

/// Classify current stock without persisting warnings
pub async fn scan_low_stock(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<LowStockWarning>>> {
    let warnings = state
        .deduction_service()
        .scan_low_stock(current_user.0.restaurant_id)
        .await?;
    Ok(Json(warnings))
}

pub async fn resolve_warning(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(warning_id): Path<Uuid>,
) -> AppResult<Json<LowStockWarning>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let warning = state
        .deduction_service()
        .resolve_warning(current_user.0.actor(), warning_id)
        .await?;
    Ok(Json(warning))
}

// ============================================================================
// Ingredients and recipes
// ============================================================================

pub async fn list_ingredients(
    State(state): State<AppState>,
    current_user: CurrentUser,
) -> AppResult<Json<Vec<Ingredient>>> {
    let ingredients = state
        .catalog_service()
        .list_ingredients(current_user.0.restaurant_id)
        .await?;
    Ok(Json(ingredients))
}

pub async fn register_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewIngredient>,
) -> AppResult<(StatusCode, Json<Ingredient>)> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let ingredient = state
        .catalog_service()
        .register_ingredient(current_user.0.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(ingredient)))
}

pub async fn deactivate_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Ingredient>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let ingredient = state
        .catalog_service()
        .deactivate_ingredient(current_user.0.actor(), ingredient_id)
        .await?;
    Ok(Json(ingredient))
}

pub async fn restock_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<RestockRequest>,
) -> AppResult<Json<StockAdjustment>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let reason = input.reason.unwrap_or_else(|| "Restock".to_string());
    let adjustment = state
        .deduction_service()
        .restock(current_user.0.actor(), ingredient_id, input.quantity, &reason)
        .await?;
    Ok(Json(adjustment))
}

pub async fn adjust_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
    Json(input): Json<AdjustStockRequest>,
) -> AppResult<Json<StockAdjustment>> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let adjustment = state
        .deduction_service()
        .adjust_stock(
            current_user.0.actor(),
            ingredient_id,
            input.delta,
            &input.reason,
            input.notes,
        )
        .await?;
    Ok(Json(adjustment))
}

pub async fn list_adjustments(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<Vec<StockAdjustment>>> {
    let adjustments = state
        .ledger_service()
        .list_adjustments(current_user.0.actor(), ingredient_id)
        .await?;
    Ok(Json(adjustments))
}

pub async fn audit_ingredient(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Path(ingredient_id): Path<Uuid>,
) -> AppResult<Json<LedgerAudit>> {
    let audit = state
        .ledger_service()
        .verify_ledger(current_user.0.actor(), ingredient_id)
        .await?;
    Ok(Json(audit))
}

pub async fn register_recipe(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Json(input): Json<NewRecipe>,
) -> AppResult<(StatusCode, Json<Recipe>)> {
    check_permission(&current_user.0, INVENTORY_WRITE)?;
    let recipe = state
        .catalog_service()
        .register_recipe(current_user.0.actor(), input)
        .await?;
    Ok((StatusCode::CREATED, Json(recipe)))
}

// ============================================================================
// Reporting
// ============================================================================

pub async fn usage_report(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<UsageReportQuery>,
) -> AppResult<Json<Vec<UsageReportRow>>> {
    let rows = state
        .deduction_service()
        .get_usage_report(current_user.0.restaurant_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(rows))
}

/// Sales totals, best sellers, ingredient usage and open alerts for a window
pub async fn sales_analytics(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<UsageReportQuery>,
) -> AppResult<Json<SalesAnalytics>> {
    let analytics = state
        .deduction_service()
        .get_sales_analytics(current_user.0.restaurant_id, query.start_date, query.end_date)
        .await?;
    Ok(Json(analytics))
}

pub async fn sales_dashboard(
    State(state): State<AppState>,
    current_user: CurrentUser,
    Query(query): Query<DashboardQuery>,
) -> AppResult<Json<SalesDashboard>> {
    let date = query.date.unwrap_or_else(|| Utc::now().date_naive());
    let dashboard = state
        .deduction_service()
        .get_sales_dashboard(current_user.0.restaurant_id, date)
        .await?;
    Ok(Json(dashboard))
}
