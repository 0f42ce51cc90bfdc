//! In-process store used in development mode and in tests
//!
//! Reads hand out cloned snapshots and release the lock immediately, so
//! callers really can race each other between reading stock and committing.
//! The write lock is only held inside [`InventoryStore::commit`] while versions
//! are checked and rows are applied.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use shared::{
    AdjustmentKind, DateRange, Ingredient, IngredientDeduction, LowStockWarning, Recipe, SalesRecord,
    StockAdjustment,
};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{CommitOutcome, InventoryStore, RecipeCatalog, StockCommit};
use crate::error::{AppError, AppResult};

#[derive(Default)]
struct State {
    ingredients: HashMap<Uuid, Ingredient>,
    recipes: Vec<Recipe>,
    sales: Vec<SalesRecord>,
    deductions: Vec<IngredientDeduction>,
    warnings: Vec<LowStockWarning>,
    adjustments: Vec<StockAdjustment>,
}

#[derive(Default)]
pub struct MemoryInventoryStore {
    state: RwLock<State>,
}

impl MemoryInventoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl InventoryStore for MemoryInventoryStore {
    async fn get_ingredient(&self, id: Uuid) -> AppResult<Option<Ingredient>> {
        Ok(self.state.read().await.ingredients.get(&id).cloned())
    }

    async fn list_ingredients(&self, restaurant_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let state = self.state.read().await;
        let mut ingredients: Vec<Ingredient> = state
            .ingredients
            .values()
            .filter(|i| i.restaurant_id == restaurant_id)
            .cloned()
            .collect();
        ingredients.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(ingredients)
    }

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> AppResult<()> {
        let mut state = self.state.write().await;
        if state.ingredients.contains_key(&ingredient.id) {
            return Err(AppError::Internal(format!(
                "Ingredient {} already exists",
                ingredient.id
            )));
        }
        state.ingredients.insert(ingredient.id, ingredient.clone());
        Ok(())
    }

    async fn set_ingredient_active(&self, id: Uuid, is_active: bool) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.ingredients.get_mut(&id) {
            Some(ingredient) => {
                ingredient.is_active = is_active;
                ingredient.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        self.state.write().await.recipes.push(recipe.clone());
        Ok(())
    }

    async fn commit(&self, commit: StockCommit) -> AppResult<CommitOutcome> {
        let mut state = self.state.write().await;

        let mut seen = HashSet::new();
        for write in &commit.writes {
            if !seen.insert(write.ingredient_id) {
                return Err(AppError::Internal(format!(
                    "Ingredient {} written twice in one commit",
                    write.ingredient_id
                )));
            }
            let current = state
                .ingredients
                .get(&write.ingredient_id)
                .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;
            if current.version != write.expected_version {
                return Ok(CommitOutcome::Conflict {
                    ingredient_id: write.ingredient_id,
                });
            }
        }

        let now = Utc::now();
        for write in &commit.writes {
            if let Some(ingredient) = state.ingredients.get_mut(&write.ingredient_id) {
                ingredient.current_stock = write.new_stock;
                ingredient.version += 1;
                ingredient.updated_at = now;
            }
        }

        if let Some(sale) = commit.sale {
            state.sales.push(sale);
        }
        state.deductions.extend(commit.deductions);
        state.warnings.extend(commit.warnings);
        state.adjustments.extend(commit.adjustments);

        Ok(CommitOutcome::Committed)
    }

    async fn list_sales(&self, restaurant_id: Uuid, range: DateRange) -> AppResult<Vec<SalesRecord>> {
        let state = self.state.read().await;
        Ok(state
            .sales
            .iter()
            .filter(|s| s.restaurant_id == restaurant_id && range.contains(s.date))
            .cloned()
            .collect())
    }

    async fn list_deductions(
        &self,
        restaurant_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<IngredientDeduction>> {
        let state = self.state.read().await;
        let sale_ids: HashSet<Uuid> = state
            .sales
            .iter()
            .filter(|s| s.restaurant_id == restaurant_id && range.contains(s.date))
            .map(|s| s.id)
            .collect();
        Ok(state
            .deductions
            .iter()
            .filter(|d| sale_ids.contains(&d.sale_id))
            .cloned()
            .collect())
    }

    async fn list_ingredient_deductions(
        &self,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientDeduction>> {
        let state = self.state.read().await;
        Ok(state
            .deductions
            .iter()
            .filter(|d| d.ingredient_id == ingredient_id)
            .cloned()
            .collect())
    }

    async fn list_adjustments(&self, ingredient_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        let state = self.state.read().await;
        Ok(state
            .adjustments
            .iter()
            .filter(|a| a.ingredient_id == ingredient_id)
            .cloned()
            .collect())
    }

    async fn last_restock_dates(
        &self,
        restaurant_id: Uuid,
        on_or_before: NaiveDate,
    ) -> AppResult<HashMap<Uuid, NaiveDate>> {
        let state = self.state.read().await;
        let mut dates: HashMap<Uuid, NaiveDate> = HashMap::new();
        for adjustment in state.adjustments.iter().filter(|a| {
            a.restaurant_id == restaurant_id && a.kind == AdjustmentKind::Restock
        }) {
            let date = adjustment.timestamp.date_naive();
            if date > on_or_before {
                continue;
            }
            let latest = dates.entry(adjustment.ingredient_id).or_insert(date);
            if date > *latest {
                *latest = date;
            }
        }
        Ok(dates)
    }

    async fn get_warning(&self, id: Uuid) -> AppResult<Option<LowStockWarning>> {
        let state = self.state.read().await;
        Ok(state.warnings.iter().find(|w| w.id == id).cloned())
    }

    async fn list_open_warnings(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>> {
        let state = self.state.read().await;
        Ok(state
            .warnings
            .iter()
            .filter(|w| w.restaurant_id == restaurant_id && !w.is_resolved)
            .cloned()
            .collect())
    }

    async fn resolve_warning(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let mut state = self.state.write().await;
        match state.warnings.iter_mut().find(|w| w.id == id && !w.is_resolved) {
            Some(warning) => {
                warning.is_resolved = true;
                warning.resolved_at = Some(resolved_at);
                warning.resolved_by = Some(resolved_by);
                Ok(true)
            }
            None => Ok(false),
        }
    }
}

#[async_trait]
impl RecipeCatalog for MemoryInventoryStore {
    async fn recipe_for(&self, restaurant_id: Uuid, menu_item_id: &str) -> AppResult<Option<Recipe>> {
        let state = self.state.read().await;
        Ok(state
            .recipes
            .iter()
            .filter(|r| r.restaurant_id == restaurant_id && r.menu_item_id == menu_item_id)
            .max_by_key(|r| r.created_at)
            .cloned())
    }
}
