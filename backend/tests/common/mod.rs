//! Test fixtures shared by the backend integration tests

#![allow(dead_code)]

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use inventory_backend::error::AppResult;
use inventory_backend::services::{CatalogService, DeductionService, LedgerService};
use inventory_backend::store::{
    CommitOutcome, InventoryStore, MemoryInventoryStore, RecipeCatalog, StockCommit, StockWrite,
};
use rust_decimal::Decimal;
use shared::{
    Actor, AdjustmentKind, DateRange, Ingredient, IngredientDeduction, LowStockWarning,
    NewIngredient, NewRecipe, Recipe, RecipeLine, SaleItemInput, SalesRecord, StockAdjustment,
};
use uuid::Uuid;

// Helper to create Decimal from string
pub fn dec(s: &str) -> Decimal {
    Decimal::from_str(s).unwrap()
}

pub fn date(day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, day).unwrap()
}

pub fn item(menu_item_id: &str, quantity: i64) -> SaleItemInput {
    SaleItemInput {
        menu_item_id: menu_item_id.to_string(),
        menu_item_name: menu_item_id.to_string(),
        quantity,
        unit_price: dec("4.50"),
        total_price: None,
        category: None,
    }
}

/// One restaurant wired to a store, with every service the engine exposes
pub struct Kitchen<S> {
    pub store: Arc<S>,
    pub actor: Actor,
    pub deductions: DeductionService,
    pub catalog: CatalogService,
    pub ledger: LedgerService,
}

impl Kitchen<MemoryInventoryStore> {
    pub fn new() -> Self {
        Self::with_store(Arc::new(MemoryInventoryStore::new()), 5)
    }

    pub fn with_attempts(max_attempts: u32) -> Self {
        Self::with_store(Arc::new(MemoryInventoryStore::new()), max_attempts)
    }
}

impl<S> Kitchen<S>
where
    S: InventoryStore + RecipeCatalog + 'static,
{
    pub fn with_store(store: Arc<S>, max_attempts: u32) -> Self {
        Self {
            actor: Actor {
                user_id: Uuid::new_v4(),
                restaurant_id: Uuid::new_v4(),
            },
            deductions: DeductionService::new(store.clone(), store.clone(), max_attempts),
            catalog: CatalogService::new(store.clone()),
            ledger: LedgerService::new(store.clone()),
            store,
        }
    }

    pub async fn ingredient(&self, name: &str, unit: &str, opening: &str, min: &str) -> Ingredient {
        self.catalog
            .register_ingredient(
                self.actor,
                NewIngredient {
                    name: name.to_string(),
                    unit: unit.to_string(),
                    opening_stock: dec(opening),
                    min_stock_level: dec(min),
                    cost_per_unit: dec("1.00"),
                },
            )
            .await
            .unwrap()
    }

    pub async fn recipe(&self, menu_item_id: &str, lines: &[(&Ingredient, &str)]) -> Recipe {
        self.catalog
            .register_recipe(
                self.actor,
                NewRecipe {
                    menu_item_id: menu_item_id.to_string(),
                    menu_item_name: menu_item_id.to_string(),
                    lines: lines
                        .iter()
                        .map(|(ingredient, quantity)| RecipeLine {
                            ingredient_id: ingredient.id,
                            quantity_per_unit: dec(quantity),
                            unit: ingredient.unit.clone(),
                        })
                        .collect(),
                },
            )
            .await
            .unwrap()
    }

    pub async fn stock(&self, ingredient: &Ingredient) -> Decimal {
        self.store
            .get_ingredient(ingredient.id)
            .await
            .unwrap()
            .unwrap()
            .current_stock
    }
}

/// Store wrapper that sneaks a competing restock in front of the next commits,
/// so the caller's commit always loses the version race
pub struct InterferingStore {
    pub inner: Arc<MemoryInventoryStore>,
    remaining: AtomicU32,
    pub interferences: AtomicU32,
}

impl InterferingStore {
    pub fn new(inner: Arc<MemoryInventoryStore>, times: u32) -> Self {
        Self {
            inner,
            remaining: AtomicU32::new(times),
            interferences: AtomicU32::new(0),
        }
    }

    /// Interfere with the next `times` commits
    pub fn arm(&self, times: u32) {
        self.remaining.store(times, Ordering::SeqCst);
    }

    pub fn interferences(&self) -> u32 {
        self.interferences.load(Ordering::SeqCst)
    }

    async fn interfere(&self, ingredient_id: Uuid) {
        let ingredient = self.inner.get_ingredient(ingredient_id).await.unwrap().unwrap();
        let delta = Decimal::ONE;
        let adjustment = StockAdjustment {
            id: Uuid::new_v4(),
            restaurant_id: ingredient.restaurant_id,
            ingredient_id,
            kind: AdjustmentKind::Restock,
            delta,
            reason: "delivery".to_string(),
            notes: None,
            previous_stock: ingredient.current_stock,
            new_stock: ingredient.current_stock + delta,
            stock_version: ingredient.version + 1,
            performed_by: None,
            timestamp: Utc::now(),
        };
        let outcome = self
            .inner
            .commit(StockCommit {
                writes: vec![StockWrite {
                    ingredient_id,
                    expected_version: ingredient.version,
                    new_stock: adjustment.new_stock,
                }],
                adjustments: vec![adjustment],
                ..StockCommit::default()
            })
            .await
            .unwrap();
        assert_eq!(outcome, CommitOutcome::Committed);
        self.interferences.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl InventoryStore for InterferingStore {
    async fn get_ingredient(&self, id: Uuid) -> AppResult<Option<Ingredient>> {
        self.inner.get_ingredient(id).await
    }

    async fn list_ingredients(&self, restaurant_id: Uuid) -> AppResult<Vec<Ingredient>> {
        self.inner.list_ingredients(restaurant_id).await
    }

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> AppResult<()> {
        self.inner.insert_ingredient(ingredient).await
    }

    async fn set_ingredient_active(&self, id: Uuid, is_active: bool) -> AppResult<bool> {
        self.inner.set_ingredient_active(id, is_active).await
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        self.inner.insert_recipe(recipe).await
    }

    async fn commit(&self, commit: StockCommit) -> AppResult<CommitOutcome> {
        if let Some(write) = commit.writes.first() {
            let should_interfere = self
                .remaining
                .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
                .is_ok();
            if should_interfere {
                self.interfere(write.ingredient_id).await;
            }
        }
        self.inner.commit(commit).await
    }

    async fn list_sales(&self, restaurant_id: Uuid, range: DateRange) -> AppResult<Vec<SalesRecord>> {
        self.inner.list_sales(restaurant_id, range).await
    }

    async fn list_deductions(
        &self,
        restaurant_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<IngredientDeduction>> {
        self.inner.list_deductions(restaurant_id, range).await
    }

    async fn list_ingredient_deductions(
        &self,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientDeduction>> {
        self.inner.list_ingredient_deductions(ingredient_id).await
    }

    async fn list_adjustments(&self, ingredient_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        self.inner.list_adjustments(ingredient_id).await
    }

    async fn last_restock_dates(
        &self,
        restaurant_id: Uuid,
        on_or_before: NaiveDate,
    ) -> AppResult<HashMap<Uuid, NaiveDate>> {
        self.inner.last_restock_dates(restaurant_id, on_or_before).await
    }

    async fn get_warning(&self, id: Uuid) -> AppResult<Option<LowStockWarning>> {
        self.inner.get_warning(id).await
    }

    async fn list_open_warnings(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>> {
        self.inner.list_open_warnings(restaurant_id).await
    }

    async fn resolve_warning(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        self.inner.resolve_warning(id, resolved_by, resolved_at).await
    }
}

#[async_trait]
impl RecipeCatalog for InterferingStore {
    async fn recipe_for(&self, restaurant_id: Uuid, menu_item_id: &str) -> AppResult<Option<Recipe>> {
        self.inner.recipe_for(restaurant_id, menu_item_id).await
    }
}
