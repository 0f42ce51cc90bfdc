//! Sales models

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::validation::{validate_amount, ValidationError, MAX_ITEM_QUANTITY};

/// A line of a sale as submitted by the point of sale
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaleItemInput {
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    /// Optional cross-check; must equal quantity × unit_price when present
    #[serde(default)]
    pub total_price: Option<Decimal>,
    /// Menu category used for revenue breakdowns
    #[serde(default)]
    pub category: Option<String>,
}

/// A validated sale line. `total_price` is always `quantity × unit_price`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SaleItem {
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub quantity: i64,
    pub unit_price: Decimal,
    pub total_price: Decimal,
    #[serde(default)]
    pub category: Option<String>,
}

impl SaleItem {
    /// Validate a submitted line and compute its total
    pub fn new(input: SaleItemInput) -> Result<Self, ValidationError> {
        if input.menu_item_id.trim().is_empty() {
            return Err(ValidationError::new("menu_item_id", "Menu item id is required"));
        }
        if input.quantity <= 0 {
            return Err(ValidationError::new(
                "quantity",
                format!("Quantity sold must be positive for {}", input.menu_item_id),
            ));
        }
        if input.quantity > MAX_ITEM_QUANTITY {
            return Err(ValidationError::new(
                "quantity",
                format!(
                    "Quantity sold must not exceed {} for {}",
                    MAX_ITEM_QUANTITY, input.menu_item_id
                ),
            ));
        }
        if input.unit_price < Decimal::ZERO {
            return Err(ValidationError::new(
                "unit_price",
                format!("Unit price cannot be negative for {}", input.menu_item_id),
            ));
        }
        validate_amount("unit_price", input.unit_price)?;

        let total_price = input
            .unit_price
            .checked_mul(Decimal::from(input.quantity))
            .filter(|total| validate_amount("total_price", *total).is_ok())
            .ok_or_else(|| {
                ValidationError::new(
                    "total_price",
                    format!("Line total is too large for {}", input.menu_item_id),
                )
            })?;
        if let Some(submitted) = input.total_price {
            if submitted != total_price {
                return Err(ValidationError::new(
                    "total_price",
                    format!(
                        "Total price {} does not match {} × {} for {}",
                        submitted, input.quantity, input.unit_price, input.menu_item_id
                    ),
                ));
            }
        }

        Ok(Self {
            menu_item_id: input.menu_item_id,
            menu_item_name: input.menu_item_name,
            quantity: input.quantity,
            unit_price: input.unit_price,
            total_price,
            category: input
                .category
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty()),
        })
    }
}

/// A completed sale together with what it took out of stock
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SalesRecord {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub date: NaiveDate,
    pub timestamp: DateTime<Utc>,
    pub items: Vec<SaleItem>,
    pub total_sales_amount: Decimal,
    pub total_items_sold: i64,
    /// Quantity actually deducted per ingredient (after clamping)
    pub ingredients_deducted: BTreeMap<Uuid, Decimal>,
    pub warning_ids: Vec<Uuid>,
    pub notes: Option<String>,
    pub recorded_by: Option<Uuid>,
}

/// Sum of line totals and of quantities for a sale.
///
/// Fails when the amount no longer fits the sales ledger.
pub fn sale_totals(items: &[SaleItem]) -> Result<(Decimal, i64), ValidationError> {
    let too_large = || ValidationError::new("total_sales_amount", "Sale total is too large");

    let mut amount = Decimal::ZERO;
    let mut count: i64 = 0;
    for item in items {
        amount = amount.checked_add(item.total_price).ok_or_else(too_large)?;
        count = count.checked_add(item.quantity).ok_or_else(too_large)?;
    }
    validate_amount("total_sales_amount", amount).map_err(|_| too_large())?;
    Ok((amount, count))
}
