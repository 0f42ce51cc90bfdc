//! Persistence seams for the inventory engine
//!
//! The engine never holds a lock across "read stock, compute, write stock".
//! Instead it reads a versioned snapshot, prepares a [`StockCommit`] and hands
//! it to [`InventoryStore::commit`], which applies it only if every touched
//! ingredient is still at the version that was read. Sales, restocks and
//! adjustments all go through that one primitive.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    DateRange, Ingredient, IngredientDeduction, LowStockWarning, Recipe, SalesRecord,
    StockAdjustment,
};
use uuid::Uuid;

use crate::error::AppResult;

pub mod memory;
pub mod postgres;

pub use memory::MemoryInventoryStore;
pub use postgres::PgInventoryStore;

/// New stock value for one ingredient, conditional on the version it was computed from
#[derive(Debug, Clone, PartialEq)]
pub struct StockWrite {
    pub ingredient_id: Uuid,
    pub expected_version: i64,
    pub new_stock: Decimal,
}

/// One atomic unit of work: stock writes plus the ledger rows describing them
#[derive(Debug, Clone, Default)]
pub struct StockCommit {
    pub writes: Vec<StockWrite>,
    pub sale: Option<SalesRecord>,
    pub deductions: Vec<IngredientDeduction>,
    pub warnings: Vec<LowStockWarning>,
    pub adjustments: Vec<StockAdjustment>,
}

/// Result of [`InventoryStore::commit`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    Committed,
    /// The ingredient moved past the expected version; nothing was written
    Conflict { ingredient_id: Uuid },
}

/// Authoritative ingredient stock and the append-only ledgers around it
#[async_trait]
pub trait InventoryStore: Send + Sync {
    /// Connectivity check used by the health endpoint
    async fn ping(&self) -> AppResult<()> {
        Ok(())
    }

    // Ingredients

    async fn get_ingredient(&self, id: Uuid) -> AppResult<Option<Ingredient>>;

    async fn list_ingredients(&self, restaurant_id: Uuid) -> AppResult<Vec<Ingredient>>;

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> AppResult<()>;

    /// Flip the soft-deactivation flag. Returns false when the ingredient does not exist.
    async fn set_ingredient_active(&self, id: Uuid, is_active: bool) -> AppResult<bool>;

    async fn insert_recipe(&self, recipe: &Recipe) -> AppResult<()>;

    // Stock

    /// Apply every write and append every ledger row, or nothing at all.
    ///
    /// Writes are checked against `expected_version`; on the first mismatch the
    /// whole commit is discarded and [`CommitOutcome::Conflict`] is returned.
    async fn commit(&self, commit: StockCommit) -> AppResult<CommitOutcome>;

    // Ledgers

    async fn list_sales(&self, restaurant_id: Uuid, range: DateRange) -> AppResult<Vec<SalesRecord>>;

    /// Deductions whose owning sale date falls in `range`
    async fn list_deductions(
        &self,
        restaurant_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<IngredientDeduction>>;

    async fn list_ingredient_deductions(
        &self,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientDeduction>>;

    async fn list_adjustments(&self, ingredient_id: Uuid) -> AppResult<Vec<StockAdjustment>>;

    /// Date of the newest restock on or before `on_or_before`, per ingredient of a restaurant
    async fn last_restock_dates(
        &self,
        restaurant_id: Uuid,
        on_or_before: NaiveDate,
    ) -> AppResult<HashMap<Uuid, NaiveDate>>;

    // Warnings

    async fn get_warning(&self, id: Uuid) -> AppResult<Option<LowStockWarning>>;

    async fn list_open_warnings(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>>;

    /// Mark an open warning resolved. Returns false when it was not open.
    async fn resolve_warning(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<bool>;
}

/// Read-only recipe lookup
#[async_trait]
pub trait RecipeCatalog: Send + Sync {
    /// Newest recipe for a menu item, or `None` when the item has no recipe
    async fn recipe_for(&self, restaurant_id: Uuid, menu_item_id: &str) -> AppResult<Option<Recipe>>;
}
