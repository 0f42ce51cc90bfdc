//! Ingredient consumption and stock reconciliation
//!
//! A sale is turned into a per-ingredient requirement before any stock is
//! read. Each attempt then reads the touched ingredients, clamps the draw to
//! what is on hand, classifies urgency and hands everything to the store as a
//! single versioned commit. Restocks and corrections use the same commit path.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::Serialize;
use shared::{
    calculate_consumption, classify_urgency, max_quantity, sale_totals, summarize_sales,
    summarize_usage, urgency_for, validate_adjustment_delta, validate_date_window, validate_reason,
    validate_restock_quantity, validate_sale_items, Actor, AdjustmentKind, DateRange, Ingredient,
    IngredientDeduction, LowStockWarning, Recipe, SaleItem, SaleItemInput, SalesAnalytics,
    SalesDashboard, SalesRecord, StockAdjustment, StockDraw, UsageReportRow,
};
use uuid::Uuid;

use super::{with_retry, Attempt};
use crate::error::{AppError, AppResult};
use crate::store::{CommitOutcome, InventoryStore, RecipeCatalog, StockCommit, StockWrite};

/// Everything a processed sale produced
#[derive(Debug, Clone, Serialize)]
pub struct SaleOutcome {
    pub sale: SalesRecord,
    pub deductions: Vec<IngredientDeduction>,
    pub warnings: Vec<LowStockWarning>,
}

#[derive(Clone)]
pub struct DeductionService {
    store: Arc<dyn InventoryStore>,
    recipes: Arc<dyn RecipeCatalog>,
    max_attempts: u32,
}

/// Validated sale data that stays fixed across commit attempts
struct PreparedSale {
    id: Uuid,
    restaurant_id: Uuid,
    date: NaiveDate,
    items: Vec<SaleItem>,
    total_sales_amount: Decimal,
    total_items_sold: i64,
    required: BTreeMap<Uuid, Decimal>,
    notes: Option<String>,
    recorded_by: Uuid,
}

impl DeductionService {
    pub fn new(
        store: Arc<dyn InventoryStore>,
        recipes: Arc<dyn RecipeCatalog>,
        max_attempts: u32,
    ) -> Self {
        Self {
            store,
            recipes,
            max_attempts,
        }
    }

    // ========================================================================
    // Sales
    // ========================================================================

    /// Record a sale and deduct the ingredients its items consume.
    ///
    /// Shortfalls never block the sale: the draw is clamped to the stock on
    /// hand and the ingredient is flagged critical.
    pub async fn process_sale(
        &self,
        actor: Actor,
        items: Vec<SaleItemInput>,
        date: NaiveDate,
        notes: Option<String>,
    ) -> AppResult<SaleOutcome> {
        let items = validate_sale_items(items)?;
        let notes = notes
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let recipes = self.resolve_recipes(actor.restaurant_id, &items).await?;
        let required = calculate_consumption(
            items
                .iter()
                .map(|item| (item, recipes.get(&item.menu_item_id).and_then(Option::as_ref))),
        )?;
        let (total_sales_amount, total_items_sold) = sale_totals(&items)?;

        let sale = PreparedSale {
            id: Uuid::new_v4(),
            restaurant_id: actor.restaurant_id,
            date,
            items,
            total_sales_amount,
            total_items_sold,
            required,
            notes,
            recorded_by: actor.user_id,
        };

        let outcome = with_retry(self.max_attempts, sale.id, |_| self.try_commit_sale(&sale)).await?;

        tracing::info!(
            sale_id = %outcome.sale.id,
            restaurant_id = %outcome.sale.restaurant_id,
            items = outcome.sale.total_items_sold,
            deductions = outcome.deductions.len(),
            warnings = outcome.warnings.len(),
            "Processed sale"
        );

        Ok(outcome)
    }

    async fn resolve_recipes(
        &self,
        restaurant_id: Uuid,
        items: &[SaleItem],
    ) -> AppResult<HashMap<String, Option<Recipe>>> {
        let mut recipes = HashMap::new();
        for item in items {
            if recipes.contains_key(&item.menu_item_id) {
                continue;
            }
            let recipe = self
                .recipes
                .recipe_for(restaurant_id, &item.menu_item_id)
                .await?;
            if recipe.is_none() {
                tracing::warn!(
                    menu_item_id = %item.menu_item_id,
                    "No recipe for menu item, nothing deducted for it"
                );
            }
            recipes.insert(item.menu_item_id.clone(), recipe);
        }
        Ok(recipes)
    }

    async fn try_commit_sale(&self, sale: &PreparedSale) -> AppResult<Attempt<SaleOutcome>> {
        let now = Utc::now();
        let mut writes = Vec::with_capacity(sale.required.len());
        let mut deductions = Vec::with_capacity(sale.required.len());
        let mut warnings = Vec::new();
        let mut ingredients_deducted = BTreeMap::new();

        for (&ingredient_id, &required) in &sale.required {
            let ingredient = match self.store.get_ingredient(ingredient_id).await? {
                Some(ingredient) if ingredient.restaurant_id == sale.restaurant_id => ingredient,
                _ => {
                    tracing::warn!(
                        %ingredient_id,
                        sale_id = %sale.id,
                        "Recipe references an unknown ingredient, skipping"
                    );
                    continue;
                }
            };

            let draw = StockDraw::compute(required, ingredient.current_stock);
            if draw.is_short() {
                tracing::warn!(
                    ingredient = %ingredient.name,
                    required = %draw.required,
                    available = %draw.previous_stock,
                    shortfall = %draw.shortfall(),
                    "Insufficient stock, deducting what is on hand"
                );
            }

            let stock_version = ingredient.version + 1;
            writes.push(StockWrite {
                ingredient_id,
                expected_version: ingredient.version,
                new_stock: draw.new_stock,
            });
            ingredients_deducted.insert(ingredient_id, draw.deducted);
            deductions.push(IngredientDeduction {
                id: Uuid::new_v4(),
                sale_id: sale.id,
                restaurant_id: sale.restaurant_id,
                ingredient_id,
                ingredient_name: ingredient.name.clone(),
                unit: ingredient.unit.clone(),
                quantity_required: draw.required,
                quantity_deducted: draw.deducted,
                previous_stock: draw.previous_stock,
                new_stock: draw.new_stock,
                min_stock_level: ingredient.min_stock_level,
                is_low_stock: draw.new_stock <= ingredient.min_stock_level,
                stock_version,
                timestamp: now,
            });

            if let Some(urgency) =
                urgency_for(draw.new_stock, ingredient.min_stock_level, draw.is_short())
            {
                warnings.push(LowStockWarning {
                    id: Uuid::new_v4(),
                    restaurant_id: sale.restaurant_id,
                    ingredient_id,
                    ingredient_name: ingredient.name.clone(),
                    unit: ingredient.unit.clone(),
                    current_stock: draw.new_stock,
                    min_stock_level: ingredient.min_stock_level,
                    urgency,
                    sale_id: Some(sale.id),
                    timestamp: now,
                    is_resolved: false,
                    resolved_at: None,
                    resolved_by: None,
                });
            }
        }

        let record = SalesRecord {
            id: sale.id,
            restaurant_id: sale.restaurant_id,
            date: sale.date,
            timestamp: now,
            items: sale.items.clone(),
            total_sales_amount: sale.total_sales_amount,
            total_items_sold: sale.total_items_sold,
            ingredients_deducted,
            warning_ids: warnings.iter().map(|w| w.id).collect(),
            notes: sale.notes.clone(),
            recorded_by: Some(sale.recorded_by),
        };

        let commit = StockCommit {
            writes,
            sale: Some(record.clone()),
            deductions: deductions.clone(),
            warnings: warnings.clone(),
            adjustments: Vec::new(),
        };

        match self.store.commit(commit).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(SaleOutcome {
                sale: record,
                deductions,
                warnings,
            })),
            CommitOutcome::Conflict { ingredient_id } => Ok(Attempt::Conflict(ingredient_id)),
        }
    }

    // ========================================================================
    // Restocks and corrections
    // ========================================================================

    /// Add delivered stock
    pub async fn restock(
        &self,
        actor: Actor,
        ingredient_id: Uuid,
        quantity: Decimal,
        reason: &str,
    ) -> AppResult<StockAdjustment> {
        validate_restock_quantity(quantity)?;
        let reason = validate_reason(reason)?;
        self.apply_adjustment(actor, ingredient_id, AdjustmentKind::Restock, quantity, reason, None)
            .await
    }

    /// Apply a signed manual correction, e.g. spoilage or a stock count
    pub async fn adjust_stock(
        &self,
        actor: Actor,
        ingredient_id: Uuid,
        delta: Decimal,
        reason: &str,
        notes: Option<String>,
    ) -> AppResult<StockAdjustment> {
        validate_adjustment_delta(delta)?;
        let reason = validate_reason(reason)?;
        self.apply_adjustment(
            actor,
            ingredient_id,
            AdjustmentKind::Correction,
            delta,
            reason,
            notes,
        )
        .await
    }

    async fn apply_adjustment(
        &self,
        actor: Actor,
        ingredient_id: Uuid,
        kind: AdjustmentKind,
        delta: Decimal,
        reason: String,
        notes: Option<String>,
    ) -> AppResult<StockAdjustment> {
        let adjustment = with_retry(self.max_attempts, ingredient_id, |_| {
            self.try_commit_adjustment(&actor, ingredient_id, kind, delta, &reason, &notes)
        })
        .await?;

        tracing::info!(
            %ingredient_id,
            kind = kind.as_str(),
            delta = %adjustment.delta,
            new_stock = %adjustment.new_stock,
            "Adjusted stock"
        );

        Ok(adjustment)
    }

    async fn try_commit_adjustment(
        &self,
        actor: &Actor,
        ingredient_id: Uuid,
        kind: AdjustmentKind,
        delta: Decimal,
        reason: &str,
        notes: &Option<String>,
    ) -> AppResult<Attempt<StockAdjustment>> {
        let ingredient = self.owned_ingredient(actor, ingredient_id).await?;
        if !ingredient.is_active {
            return Err(AppError::Validation {
                field: "ingredient_id".to_string(),
                message: format!("{} is deactivated", ingredient.name),
            });
        }

        let new_stock = ingredient
            .current_stock
            .checked_add(delta)
            .filter(|stock| *stock <= max_quantity())
            .ok_or_else(|| AppError::Validation {
                field: match kind {
                    AdjustmentKind::Restock => "quantity",
                    AdjustmentKind::Correction => "delta",
                }
                .to_string(),
                message: format!(
                    "Adding {} {} to {} would exceed the largest storable stock level",
                    delta, ingredient.unit, ingredient.name
                ),
            })?;
        if new_stock < Decimal::ZERO {
            return Err(AppError::InsufficientInventory(format!(
                "Cannot remove {} {} of {}: only {} on hand",
                -delta, ingredient.unit, ingredient.name, ingredient.current_stock
            )));
        }

        let adjustment = StockAdjustment {
            id: Uuid::new_v4(),
            restaurant_id: ingredient.restaurant_id,
            ingredient_id,
            kind,
            delta,
            reason: reason.to_string(),
            notes: notes.clone(),
            previous_stock: ingredient.current_stock,
            new_stock,
            stock_version: ingredient.version + 1,
            performed_by: Some(actor.user_id),
            timestamp: Utc::now(),
        };

        let commit = StockCommit {
            writes: vec![StockWrite {
                ingredient_id,
                expected_version: ingredient.version,
                new_stock,
            }],
            adjustments: vec![adjustment.clone()],
            ..StockCommit::default()
        };

        match self.store.commit(commit).await? {
            CommitOutcome::Committed => Ok(Attempt::Done(adjustment)),
            CommitOutcome::Conflict { ingredient_id } => Ok(Attempt::Conflict(ingredient_id)),
        }
    }

    async fn owned_ingredient(&self, actor: &Actor, ingredient_id: Uuid) -> AppResult<Ingredient> {
        self.store
            .get_ingredient(ingredient_id)
            .await?
            .filter(|i| i.restaurant_id == actor.restaurant_id)
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    // ========================================================================
    // Warnings
    // ========================================================================

    /// Open warnings, most urgent first and newest first within a tier
    pub async fn get_low_stock_warnings(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>> {
        let mut warnings = self.store.list_open_warnings(restaurant_id).await?;
        warnings.sort_by(|a, b| {
            b.urgency
                .cmp(&a.urgency)
                .then_with(|| b.timestamp.cmp(&a.timestamp))
        });
        Ok(warnings)
    }

    /// Classify current stock of every active ingredient without persisting anything
    pub async fn scan_low_stock(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>> {
        let now = Utc::now();
        let mut warnings: Vec<LowStockWarning> = self
            .store
            .list_ingredients(restaurant_id)
            .await?
            .into_iter()
            .filter(|i| i.is_active)
            .filter_map(|ingredient| {
                let urgency = classify_urgency(ingredient.current_stock, ingredient.min_stock_level)?;
                Some(LowStockWarning {
                    id: Uuid::new_v4(),
                    restaurant_id,
                    ingredient_id: ingredient.id,
                    ingredient_name: ingredient.name,
                    unit: ingredient.unit,
                    current_stock: ingredient.current_stock,
                    min_stock_level: ingredient.min_stock_level,
                    urgency,
                    sale_id: None,
                    timestamp: now,
                    is_resolved: false,
                    resolved_at: None,
                    resolved_by: None,
                })
            })
            .collect();

        warnings.sort_by(|a, b| {
            b.urgency
                .cmp(&a.urgency)
                .then_with(|| a.ingredient_name.cmp(&b.ingredient_name))
        });
        Ok(warnings)
    }

    pub async fn resolve_warning(&self, actor: Actor, warning_id: Uuid) -> AppResult<LowStockWarning> {
        let mut warning = self
            .store
            .get_warning(warning_id)
            .await?
            .filter(|w| w.restaurant_id == actor.restaurant_id)
            .ok_or_else(|| AppError::NotFound("Warning".to_string()))?;

        let already_resolved = || AppError::Validation {
            field: "warning_id".to_string(),
            message: "Warning is already resolved".to_string(),
        };
        if warning.is_resolved {
            return Err(already_resolved());
        }

        let resolved_at = Utc::now();
        if !self
            .store
            .resolve_warning(warning_id, actor.user_id, resolved_at)
            .await?
        {
            return Err(already_resolved());
        }

        warning.is_resolved = true;
        warning.resolved_at = Some(resolved_at);
        warning.resolved_by = Some(actor.user_id);

        tracing::info!(%warning_id, ingredient = %warning.ingredient_name, "Resolved low stock warning");
        Ok(warning)
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Usage and runway per ingredient for sales dated within `[start, end]`
    pub async fn get_usage_report(
        &self,
        restaurant_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<Vec<UsageReportRow>> {
        validate_date_window(start, end)?;

        let deductions = self
            .store
            .list_deductions(restaurant_id, DateRange::between(start, end))
            .await?;
        let usage = summarize_usage(&deductions);

        let ingredients: HashMap<Uuid, Ingredient> = self
            .store
            .list_ingredients(restaurant_id)
            .await?
            .into_iter()
            .map(|i| (i.id, i))
            .collect();

        let restocks = self.store.last_restock_dates(restaurant_id, end).await?;

        let mut rows = Vec::new();
        for (ingredient_id, total_used) in usage {
            if total_used <= Decimal::ZERO {
                continue;
            }
            let Some(ingredient) = ingredients.get(&ingredient_id) else {
                continue;
            };
            rows.push(UsageReportRow::build(
                ingredient,
                total_used,
                start,
                end,
                restocks.get(&ingredient_id).copied(),
            ));
        }

        rows.sort_by(|a, b| a.ingredient_name.cmp(&b.ingredient_name));
        Ok(rows)
    }

    /// Sales summary for sales dated within `[start, end]`, with the usage
    /// report for the same window and the open warnings
    pub async fn get_sales_analytics(
        &self,
        restaurant_id: Uuid,
        start: NaiveDate,
        end: NaiveDate,
    ) -> AppResult<SalesAnalytics> {
        validate_date_window(start, end)?;

        let sales = self
            .store
            .list_sales(restaurant_id, DateRange::between(start, end))
            .await?;
        let summary = summarize_sales(&sales);
        let ingredient_usage = self.get_usage_report(restaurant_id, start, end).await?;
        let low_stock_alerts = self.get_low_stock_warnings(restaurant_id).await?;

        tracing::debug!(
            %restaurant_id,
            sales = summary.sale_count,
            total = %summary.total_sales,
            "Built sales analytics"
        );

        Ok(SalesAnalytics {
            period_start: start,
            period_end: end,
            summary,
            ingredient_usage,
            low_stock_alerts,
        })
    }

    /// Sales for one business day next to the current inventory health
    pub async fn get_sales_dashboard(
        &self,
        restaurant_id: Uuid,
        date: NaiveDate,
    ) -> AppResult<SalesDashboard> {
        let sales = self
            .store
            .list_sales(restaurant_id, DateRange::between(date, date))
            .await?;
        let active_ingredients = self
            .store
            .list_ingredients(restaurant_id)
            .await?
            .iter()
            .filter(|i| i.is_active)
            .count();
        let warnings = self.get_low_stock_warnings(restaurant_id).await?;

        Ok(SalesDashboard::build(
            restaurant_id,
            date,
            &sales,
            active_ingredients,
            &warnings,
        ))
    }
}
