//! PostgreSQL store
//!
//! A stock commit is one transaction. Each write is a conditional
//! `UPDATE ... WHERE version = $expected`; a write that matches no row means
//! another writer got there first and the transaction is rolled back.

use std::collections::{BTreeMap, HashMap};

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use shared::{
    AdjustmentKind, DateRange, Ingredient, IngredientDeduction, LowStockWarning, Recipe,
    RecipeLine, SaleItem, SalesRecord, StockAdjustment, UrgencyTier,
};
use sqlx::{types::Json, FromRow, PgPool, Postgres, Transaction};
use uuid::Uuid;

use super::{CommitOutcome, InventoryStore, RecipeCatalog, StockCommit};
use crate::error::{AppError, AppResult};

#[derive(Clone)]
pub struct PgInventoryStore {
    db: PgPool,
}

impl PgInventoryStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

// ============================================================================
// Row types
// ============================================================================

#[derive(Debug, FromRow)]
struct IngredientRow {
    id: Uuid,
    restaurant_id: Uuid,
    name: String,
    unit: String,
    current_stock: Decimal,
    min_stock_level: Decimal,
    cost_per_unit: Decimal,
    opening_stock: Decimal,
    version: i64,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<IngredientRow> for Ingredient {
    fn from(row: IngredientRow) -> Self {
        Ingredient {
            id: row.id,
            restaurant_id: row.restaurant_id,
            name: row.name,
            unit: row.unit,
            current_stock: row.current_stock,
            min_stock_level: row.min_stock_level,
            cost_per_unit: row.cost_per_unit,
            opening_stock: row.opening_stock,
            version: row.version,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct RecipeRow {
    id: Uuid,
    restaurant_id: Uuid,
    menu_item_id: String,
    menu_item_name: String,
    lines: Json<Vec<RecipeLine>>,
    created_at: DateTime<Utc>,
}

impl From<RecipeRow> for Recipe {
    fn from(row: RecipeRow) -> Self {
        Recipe {
            id: row.id,
            restaurant_id: row.restaurant_id,
            menu_item_id: row.menu_item_id,
            menu_item_name: row.menu_item_name,
            lines: row.lines.0,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct SaleRow {
    id: Uuid,
    restaurant_id: Uuid,
    sale_date: NaiveDate,
    recorded_at: DateTime<Utc>,
    items: Json<Vec<SaleItem>>,
    total_sales_amount: Decimal,
    total_items_sold: i64,
    ingredients_deducted: Json<BTreeMap<Uuid, Decimal>>,
    warning_ids: Vec<Uuid>,
    notes: Option<String>,
    recorded_by: Option<Uuid>,
}

impl From<SaleRow> for SalesRecord {
    fn from(row: SaleRow) -> Self {
        SalesRecord {
            id: row.id,
            restaurant_id: row.restaurant_id,
            date: row.sale_date,
            timestamp: row.recorded_at,
            items: row.items.0,
            total_sales_amount: row.total_sales_amount,
            total_items_sold: row.total_items_sold,
            ingredients_deducted: row.ingredients_deducted.0,
            warning_ids: row.warning_ids,
            notes: row.notes,
            recorded_by: row.recorded_by,
        }
    }
}

#[derive(Debug, FromRow)]
struct DeductionRow {
    id: Uuid,
    sale_id: Uuid,
    restaurant_id: Uuid,
    ingredient_id: Uuid,
    ingredient_name: String,
    unit: String,
    quantity_required: Decimal,
    quantity_deducted: Decimal,
    previous_stock: Decimal,
    new_stock: Decimal,
    min_stock_level: Decimal,
    is_low_stock: bool,
    stock_version: i64,
    recorded_at: DateTime<Utc>,
}

impl From<DeductionRow> for IngredientDeduction {
    fn from(row: DeductionRow) -> Self {
        IngredientDeduction {
            id: row.id,
            sale_id: row.sale_id,
            restaurant_id: row.restaurant_id,
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            unit: row.unit,
            quantity_required: row.quantity_required,
            quantity_deducted: row.quantity_deducted,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            min_stock_level: row.min_stock_level,
            is_low_stock: row.is_low_stock,
            stock_version: row.stock_version,
            timestamp: row.recorded_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct WarningRow {
    id: Uuid,
    restaurant_id: Uuid,
    ingredient_id: Uuid,
    ingredient_name: String,
    unit: String,
    current_stock: Decimal,
    min_stock_level: Decimal,
    urgency: String,
    sale_id: Option<Uuid>,
    recorded_at: DateTime<Utc>,
    is_resolved: bool,
    resolved_at: Option<DateTime<Utc>>,
    resolved_by: Option<Uuid>,
}

impl TryFrom<WarningRow> for LowStockWarning {
    type Error = AppError;

    fn try_from(row: WarningRow) -> Result<Self, Self::Error> {
        let urgency = UrgencyTier::from_str(&row.urgency)
            .ok_or_else(|| AppError::Internal(format!("Unknown urgency tier '{}'", row.urgency)))?;
        Ok(LowStockWarning {
            id: row.id,
            restaurant_id: row.restaurant_id,
            ingredient_id: row.ingredient_id,
            ingredient_name: row.ingredient_name,
            unit: row.unit,
            current_stock: row.current_stock,
            min_stock_level: row.min_stock_level,
            urgency,
            sale_id: row.sale_id,
            timestamp: row.recorded_at,
            is_resolved: row.is_resolved,
            resolved_at: row.resolved_at,
            resolved_by: row.resolved_by,
        })
    }
}

#[derive(Debug, FromRow)]
struct AdjustmentRow {
    id: Uuid,
    restaurant_id: Uuid,
    ingredient_id: Uuid,
    kind: String,
    delta: Decimal,
    reason: String,
    notes: Option<String>,
    previous_stock: Decimal,
    new_stock: Decimal,
    stock_version: i64,
    performed_by: Option<Uuid>,
    recorded_at: DateTime<Utc>,
}

impl TryFrom<AdjustmentRow> for StockAdjustment {
    type Error = AppError;

    fn try_from(row: AdjustmentRow) -> Result<Self, Self::Error> {
        let kind = AdjustmentKind::from_str(&row.kind)
            .ok_or_else(|| AppError::Internal(format!("Unknown adjustment kind '{}'", row.kind)))?;
        Ok(StockAdjustment {
            id: row.id,
            restaurant_id: row.restaurant_id,
            ingredient_id: row.ingredient_id,
            kind,
            delta: row.delta,
            reason: row.reason,
            notes: row.notes,
            previous_stock: row.previous_stock,
            new_stock: row.new_stock,
            stock_version: row.stock_version,
            performed_by: row.performed_by,
            timestamp: row.recorded_at,
        })
    }
}

const INGREDIENT_COLUMNS: &str = "id, restaurant_id, name, unit, current_stock, min_stock_level, \
     cost_per_unit, opening_stock, version, is_active, created_at, updated_at";

const DEDUCTION_COLUMNS: &str = "d.id, d.sale_id, d.restaurant_id, d.ingredient_id, d.ingredient_name, \
     d.unit, d.quantity_required, d.quantity_deducted, d.previous_stock, d.new_stock, \
     d.min_stock_level, d.is_low_stock, d.stock_version, d.recorded_at";

const WARNING_COLUMNS: &str = "id, restaurant_id, ingredient_id, ingredient_name, unit, current_stock, \
     min_stock_level, urgency, sale_id, recorded_at, is_resolved, resolved_at, resolved_by";

// ============================================================================
// Ledger inserts
// ============================================================================

async fn insert_sale(tx: &mut Transaction<'_, Postgres>, sale: &SalesRecord) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, restaurant_id, sale_date, recorded_at, items, total_sales_amount,
            total_items_sold, ingredients_deducted, warning_ids, notes, recorded_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
        "#,
    )
    .bind(sale.id)
    .bind(sale.restaurant_id)
    .bind(sale.date)
    .bind(sale.timestamp)
    .bind(Json(&sale.items))
    .bind(sale.total_sales_amount)
    .bind(sale.total_items_sold)
    .bind(Json(&sale.ingredients_deducted))
    .bind(&sale.warning_ids)
    .bind(&sale.notes)
    .bind(sale.recorded_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_deduction(
    tx: &mut Transaction<'_, Postgres>,
    deduction: &IngredientDeduction,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO ingredient_deductions (
            id, sale_id, restaurant_id, ingredient_id, ingredient_name, unit,
            quantity_required, quantity_deducted, previous_stock, new_stock,
            min_stock_level, is_low_stock, stock_version, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(deduction.id)
    .bind(deduction.sale_id)
    .bind(deduction.restaurant_id)
    .bind(deduction.ingredient_id)
    .bind(&deduction.ingredient_name)
    .bind(&deduction.unit)
    .bind(deduction.quantity_required)
    .bind(deduction.quantity_deducted)
    .bind(deduction.previous_stock)
    .bind(deduction.new_stock)
    .bind(deduction.min_stock_level)
    .bind(deduction.is_low_stock)
    .bind(deduction.stock_version)
    .bind(deduction.timestamp)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_warning(
    tx: &mut Transaction<'_, Postgres>,
    warning: &LowStockWarning,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO low_stock_warnings (
            id, restaurant_id, ingredient_id, ingredient_name, unit, current_stock,
            min_stock_level, urgency, sale_id, recorded_at, is_resolved, resolved_at, resolved_by
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(warning.id)
    .bind(warning.restaurant_id)
    .bind(warning.ingredient_id)
    .bind(&warning.ingredient_name)
    .bind(&warning.unit)
    .bind(warning.current_stock)
    .bind(warning.min_stock_level)
    .bind(warning.urgency.as_str())
    .bind(warning.sale_id)
    .bind(warning.timestamp)
    .bind(warning.is_resolved)
    .bind(warning.resolved_at)
    .bind(warning.resolved_by)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

async fn insert_adjustment(
    tx: &mut Transaction<'_, Postgres>,
    adjustment: &StockAdjustment,
) -> AppResult<()> {
    sqlx::query(
        r#"
        INSERT INTO stock_adjustments (
            id, restaurant_id, ingredient_id, kind, delta, reason, notes,
            previous_stock, new_stock, stock_version, performed_by, recorded_at
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(adjustment.id)
    .bind(adjustment.restaurant_id)
    .bind(adjustment.ingredient_id)
    .bind(adjustment.kind.as_str())
    .bind(adjustment.delta)
    .bind(&adjustment.reason)
    .bind(&adjustment.notes)
    .bind(adjustment.previous_stock)
    .bind(adjustment.new_stock)
    .bind(adjustment.stock_version)
    .bind(adjustment.performed_by)
    .bind(adjustment.timestamp)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl InventoryStore for PgInventoryStore {
    async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.db).await?;
        Ok(())
    }

    async fn get_ingredient(&self, id: Uuid) -> AppResult<Option<Ingredient>> {
        let row = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE id = $1",
            INGREDIENT_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Ingredient::from))
    }

    async fn list_ingredients(&self, restaurant_id: Uuid) -> AppResult<Vec<Ingredient>> {
        let rows = sqlx::query_as::<_, IngredientRow>(&format!(
            "SELECT {} FROM ingredients WHERE restaurant_id = $1 ORDER BY name",
            INGREDIENT_COLUMNS
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(Ingredient::from).collect())
    }

    async fn insert_ingredient(&self, ingredient: &Ingredient) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO ingredients (
                id, restaurant_id, name, unit, current_stock, min_stock_level,
                cost_per_unit, opening_stock, version, is_active, created_at, updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            "#,
        )
        .bind(ingredient.id)
        .bind(ingredient.restaurant_id)
        .bind(&ingredient.name)
        .bind(&ingredient.unit)
        .bind(ingredient.current_stock)
        .bind(ingredient.min_stock_level)
        .bind(ingredient.cost_per_unit)
        .bind(ingredient.opening_stock)
        .bind(ingredient.version)
        .bind(ingredient.is_active)
        .bind(ingredient.created_at)
        .bind(ingredient.updated_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn set_ingredient_active(&self, id: Uuid, is_active: bool) -> AppResult<bool> {
        let result = sqlx::query(
            "UPDATE ingredients SET is_active = $1, updated_at = NOW() WHERE id = $2",
        )
        .bind(is_active)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn insert_recipe(&self, recipe: &Recipe) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO recipes (id, restaurant_id, menu_item_id, menu_item_name, lines, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(recipe.id)
        .bind(recipe.restaurant_id)
        .bind(&recipe.menu_item_id)
        .bind(&recipe.menu_item_name)
        .bind(Json(&recipe.lines))
        .bind(recipe.created_at)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    async fn commit(&self, commit: StockCommit) -> AppResult<CommitOutcome> {
        let mut tx = self.db.begin().await?;

        // Lock rows in a fixed order so two commits never wait on each other in a cycle
        let mut writes = commit.writes;
        writes.sort_by_key(|w| w.ingredient_id);

        for write in &writes {
            let result = sqlx::query(
                r#"
                UPDATE ingredients
                SET current_stock = $1, version = version + 1, updated_at = NOW()
                WHERE id = $2 AND version = $3
                "#,
            )
            .bind(write.new_stock)
            .bind(write.ingredient_id)
            .bind(write.expected_version)
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 0 {
                tx.rollback().await?;
                return Ok(CommitOutcome::Conflict {
                    ingredient_id: write.ingredient_id,
                });
            }
        }

        if let Some(sale) = &commit.sale {
            insert_sale(&mut tx, sale).await?;
        }
        for deduction in &commit.deductions {
            insert_deduction(&mut tx, deduction).await?;
        }
        for warning in &commit.warnings {
            insert_warning(&mut tx, warning).await?;
        }
        for adjustment in &commit.adjustments {
            insert_adjustment(&mut tx, adjustment).await?;
        }

        tx.commit().await?;
        Ok(CommitOutcome::Committed)
    }

    async fn list_sales(&self, restaurant_id: Uuid, range: DateRange) -> AppResult<Vec<SalesRecord>> {
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT id, restaurant_id, sale_date, recorded_at, items, total_sales_amount,
                   total_items_sold, ingredients_deducted, warning_ids, notes, recorded_by
            FROM sales
            WHERE restaurant_id = $1
              AND ($2::date IS NULL OR sale_date >= $2)
              AND ($3::date IS NULL OR sale_date <= $3)
            ORDER BY recorded_at
            "#,
        )
        .bind(restaurant_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(SalesRecord::from).collect())
    }

    async fn list_deductions(
        &self,
        restaurant_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<IngredientDeduction>> {
        let rows = sqlx::query_as::<_, DeductionRow>(&format!(
            r#"
            SELECT {}
            FROM ingredient_deductions d
            JOIN sales s ON s.id = d.sale_id
            WHERE s.restaurant_id = $1
              AND ($2::date IS NULL OR s.sale_date >= $2)
              AND ($3::date IS NULL OR s.sale_date <= $3)
            ORDER BY d.recorded_at
            "#,
            DEDUCTION_COLUMNS
        ))
        .bind(restaurant_id)
        .bind(range.start)
        .bind(range.end)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(IngredientDeduction::from).collect())
    }

    async fn list_ingredient_deductions(
        &self,
        ingredient_id: Uuid,
    ) -> AppResult<Vec<IngredientDeduction>> {
        let rows = sqlx::query_as::<_, DeductionRow>(&format!(
            "SELECT {} FROM ingredient_deductions d WHERE d.ingredient_id = $1 ORDER BY d.stock_version",
            DEDUCTION_COLUMNS
        ))
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().map(IngredientDeduction::from).collect())
    }

    async fn list_adjustments(&self, ingredient_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        let rows = sqlx::query_as::<_, AdjustmentRow>(
            r#"
            SELECT id, restaurant_id, ingredient_id, kind, delta, reason, notes,
                   previous_stock, new_stock, stock_version, performed_by, recorded_at
            FROM stock_adjustments
            WHERE ingredient_id = $1
            ORDER BY stock_version
            "#,
        )
        .bind(ingredient_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(StockAdjustment::try_from).collect()
    }

    async fn last_restock_dates(
        &self,
        restaurant_id: Uuid,
        on_or_before: NaiveDate,
    ) -> AppResult<HashMap<Uuid, NaiveDate>> {
        let rows: Vec<(Uuid, NaiveDate)> = sqlx::query_as(
            r#"
            SELECT ingredient_id, MAX((recorded_at AT TIME ZONE 'UTC')::date)
            FROM stock_adjustments
            WHERE restaurant_id = $1
              AND kind = 'restock'
              AND (recorded_at AT TIME ZONE 'UTC')::date <= $2
            GROUP BY ingredient_id
            "#,
        )
        .bind(restaurant_id)
        .bind(on_or_before)
        .fetch_all(&self.db)
        .await?;

        Ok(rows.into_iter().collect())
    }

    async fn get_warning(&self, id: Uuid) -> AppResult<Option<LowStockWarning>> {
        let row = sqlx::query_as::<_, WarningRow>(&format!(
            "SELECT {} FROM low_stock_warnings WHERE id = $1",
            WARNING_COLUMNS
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;

        row.map(LowStockWarning::try_from).transpose()
    }

    async fn list_open_warnings(&self, restaurant_id: Uuid) -> AppResult<Vec<LowStockWarning>> {
        let rows = sqlx::query_as::<_, WarningRow>(&format!(
            "SELECT {} FROM low_stock_warnings WHERE restaurant_id = $1 AND NOT is_resolved ORDER BY recorded_at",
            WARNING_COLUMNS
        ))
        .bind(restaurant_id)
        .fetch_all(&self.db)
        .await?;

        rows.into_iter().map(LowStockWarning::try_from).collect()
    }

    async fn resolve_warning(
        &self,
        id: Uuid,
        resolved_by: Uuid,
        resolved_at: DateTime<Utc>,
    ) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE low_stock_warnings
            SET is_resolved = TRUE, resolved_at = $1, resolved_by = $2
            WHERE id = $3 AND NOT is_resolved
            "#,
        )
        .bind(resolved_at)
        .bind(resolved_by)
        .bind(id)
        .execute(&self.db)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl RecipeCatalog for PgInventoryStore {
    async fn recipe_for(&self, restaurant_id: Uuid, menu_item_id: &str) -> AppResult<Option<Recipe>> {
        let row = sqlx::query_as::<_, RecipeRow>(
            r#"
            SELECT id, restaurant_id, menu_item_id, menu_item_name, lines, created_at
            FROM recipes
            WHERE restaurant_id = $1 AND menu_item_id = $2
            ORDER BY created_at DESC
            LIMIT 1
            "#,
        )
        .bind(restaurant_id)
        .bind(menu_item_id)
        .fetch_optional(&self.db)
        .await?;

        Ok(row.map(Recipe::from))
    }
}
