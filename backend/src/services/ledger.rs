//! Read access to the sales, deduction and adjustment ledgers

use std::sync::Arc;

use shared::{
    replay_ledger, Actor, DateRange, Ingredient, IngredientDeduction, LedgerAudit, LedgerEntry,
    SalesRecord, StockAdjustment,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

#[derive(Clone)]
pub struct LedgerService {
    store: Arc<dyn InventoryStore>,
}

impl LedgerService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn list_sales(&self, restaurant_id: Uuid, range: DateRange) -> AppResult<Vec<SalesRecord>> {
        let mut sales = self.store.list_sales(restaurant_id, range).await?;
        sales.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(sales)
    }

    pub async fn list_deductions(
        &self,
        restaurant_id: Uuid,
        range: DateRange,
    ) -> AppResult<Vec<IngredientDeduction>> {
        let mut deductions = self.store.list_deductions(restaurant_id, range).await?;
        deductions.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(deductions)
    }

    pub async fn list_adjustments(&self, actor: Actor, ingredient_id: Uuid) -> AppResult<Vec<StockAdjustment>> {
        self.owned_ingredient(actor, ingredient_id).await?;
        let mut adjustments = self.store.list_adjustments(ingredient_id).await?;
        adjustments.sort_by_key(|a| a.stock_version);
        Ok(adjustments)
    }

    /// Replay the ingredient's ledger from its opening stock and compare with what is stored
    pub async fn verify_ledger(&self, actor: Actor, ingredient_id: Uuid) -> AppResult<LedgerAudit> {
        let ingredient = self.owned_ingredient(actor, ingredient_id).await?;

        let deductions = self.store.list_ingredient_deductions(ingredient_id).await?;
        let adjustments = self.store.list_adjustments(ingredient_id).await?;
        let entries: Vec<LedgerEntry> = deductions
            .iter()
            .map(LedgerEntry::from)
            .chain(adjustments.iter().map(LedgerEntry::from))
            .collect();

        let audit = replay_ledger(&ingredient, entries);
        if !audit.is_consistent {
            tracing::warn!(
                %ingredient_id,
                discrepancies = audit.discrepancies.len(),
                "Ledger replay does not match stored stock"
            );
        }
        Ok(audit)
    }

    async fn owned_ingredient(&self, actor: Actor, ingredient_id: Uuid) -> AppResult<Ingredient> {
        self.store
            .get_ingredient(ingredient_id)
            .await?
            .filter(|i| i.restaurant_id == actor.restaurant_id)
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }
}
