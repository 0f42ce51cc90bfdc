//! Validation utilities for the restaurant inventory platform
//!
//! Every check here runs before any stock is read or written, so a rejected
//! request never leaves partial effects behind.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::models::{sale_totals, NewIngredient, NewRecipe, SaleItem, SaleItemInput};

/// A rejected input, naming the offending field
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// Numeric limits
// ============================================================================

/// Decimal places kept for stock quantities, recipe quantities and unit costs
pub const QUANTITY_SCALE: u32 = 4;

/// Decimal places kept for money
pub const PRICE_SCALE: u32 = 2;

/// Largest quantity a line of a sale may carry
pub const MAX_ITEM_QUANTITY: i64 = 1_000_000;

/// Largest stock or recipe quantity: ten integer digits at [`QUANTITY_SCALE`]
pub fn max_quantity() -> Decimal {
    Decimal::new(99_999_999_999_999, QUANTITY_SCALE)
}

/// Largest money amount: twelve integer digits at [`PRICE_SCALE`]
pub fn max_amount() -> Decimal {
    Decimal::new(99_999_999_999_999, PRICE_SCALE)
}

/// Check that a quantity is storable exactly: at most [`QUANTITY_SCALE`] places
/// and no larger than [`max_quantity`] in magnitude
pub fn validate_quantity(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > QUANTITY_SCALE {
        return Err(ValidationError::new(
            field,
            format!("At most {} decimal places are allowed", QUANTITY_SCALE),
        ));
    }
    if value.abs() > max_quantity() {
        return Err(ValidationError::new(
            field,
            format!("Quantity must not exceed {}", max_quantity()),
        ));
    }
    Ok(())
}

/// Check that a money amount has at most [`PRICE_SCALE`] places and fits [`max_amount`]
pub fn validate_amount(field: &str, value: Decimal) -> Result<(), ValidationError> {
    if value.normalize().scale() > PRICE_SCALE {
        return Err(ValidationError::new(
            field,
            format!("At most {} decimal places are allowed", PRICE_SCALE),
        ));
    }
    if value.abs() > max_amount() {
        return Err(ValidationError::new(
            field,
            format!("Amount must not exceed {}", max_amount()),
        ));
    }
    Ok(())
}

// ============================================================================
// Sales
// ============================================================================

/// Validate every line of a sale. A sale needs at least one line and its
/// totals must fit the sales ledger.
pub fn validate_sale_items(items: Vec<SaleItemInput>) -> Result<Vec<SaleItem>, ValidationError> {
    if items.is_empty() {
        return Err(ValidationError::new("items", "A sale needs at least one item"));
    }
    let items = items
        .into_iter()
        .map(SaleItem::new)
        .collect::<Result<Vec<_>, _>>()?;
    sale_totals(&items)?;
    Ok(items)
}

// ============================================================================
// Stock changes
// ============================================================================

/// Validate a restock quantity
pub fn validate_restock_quantity(quantity: Decimal) -> Result<(), ValidationError> {
    if quantity <= Decimal::ZERO {
        return Err(ValidationError::new(
            "quantity",
            "Restock quantity must be positive",
        ));
    }
    validate_quantity("quantity", quantity)
}

/// Validate a signed adjustment
pub fn validate_adjustment_delta(delta: Decimal) -> Result<(), ValidationError> {
    if delta.is_zero() {
        return Err(ValidationError::new(
            "delta",
            "Adjustment amount cannot be zero",
        ));
    }
    validate_quantity("delta", delta)
}

/// Validate and normalize the reason recorded with a stock change
pub fn validate_reason(reason: &str) -> Result<String, ValidationError> {
    let reason = reason.trim();
    if reason.is_empty() {
        return Err(ValidationError::new("reason", "A reason is required"));
    }
    if reason.len() > 200 {
        return Err(ValidationError::new(
            "reason",
            "Reason must be at most 200 characters",
        ));
    }
    Ok(reason.to_string())
}

// ============================================================================
// Catalog
// ============================================================================

/// Validate a new ingredient
pub fn validate_new_ingredient(input: &NewIngredient) -> Result<(), ValidationError> {
    if input.name.trim().is_empty() {
        return Err(ValidationError::new("name", "Ingredient name is required"));
    }
    if input.unit.trim().is_empty() {
        return Err(ValidationError::new("unit", "Unit is required"));
    }
    if input.min_stock_level <= Decimal::ZERO {
        return Err(ValidationError::new(
            "min_stock_level",
            "Minimum stock level must be positive",
        ));
    }
    if input.opening_stock < Decimal::ZERO {
        return Err(ValidationError::new(
            "opening_stock",
            "Opening stock cannot be negative",
        ));
    }
    if input.cost_per_unit < Decimal::ZERO {
        return Err(ValidationError::new(
            "cost_per_unit",
            "Cost per unit cannot be negative",
        ));
    }
    validate_quantity("opening_stock", input.opening_stock)?;
    validate_quantity("min_stock_level", input.min_stock_level)?;
    validate_quantity("cost_per_unit", input.cost_per_unit)
}

/// Validate the shape of a new recipe. Ingredient existence is checked by the caller.
pub fn validate_new_recipe(input: &NewRecipe) -> Result<(), ValidationError> {
    if input.menu_item_id.trim().is_empty() {
        return Err(ValidationError::new("menu_item_id", "Menu item id is required"));
    }
    if input.lines.is_empty() {
        return Err(ValidationError::new(
            "lines",
            "A recipe needs at least one ingredient",
        ));
    }
    if input
        .lines
        .iter()
        .any(|line| line.quantity_per_unit <= Decimal::ZERO)
    {
        return Err(ValidationError::new(
            "quantity_per_unit",
            "Recipe quantities must be positive",
        ));
    }
    for line in &input.lines {
        validate_quantity("quantity_per_unit", line.quantity_per_unit)?;
    }
    Ok(())
}

// ============================================================================
// Reporting
// ============================================================================

/// Validate a reporting window
pub fn validate_date_window(start: NaiveDate, end: NaiveDate) -> Result<(), ValidationError> {
    if end < start {
        return Err(ValidationError::new(
            "end_date",
            "End date must not be before start date",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeLine;
    use std::str::FromStr;
    use uuid::Uuid;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn line(quantity: i64, unit_price: &str, total_price: Option<&str>) -> SaleItemInput {
        SaleItemInput {
            menu_item_id: "latte".to_string(),
            menu_item_name: "Latte".to_string(),
            quantity,
            unit_price: dec(unit_price),
            total_price: total_price.map(dec),
            category: None,
        }
    }

    #[test]
    fn test_sale_item_total_is_computed() {
        let items = validate_sale_items(vec![line(3, "4.50", None)]).unwrap();
        assert_eq!(items[0].total_price, dec("13.50"));
    }

    #[test]
    fn test_sale_item_matching_total_accepted() {
        assert!(validate_sale_items(vec![line(3, "4.50", Some("13.5"))]).is_ok());
    }

    #[test]
    fn test_sale_item_inconsistent_total_rejected() {
        let err = validate_sale_items(vec![line(3, "4.50", Some("14.00"))]).unwrap_err();
        assert_eq!(err.field, "total_price");
    }

    #[test]
    fn test_sale_item_zero_quantity_rejected() {
        let err = validate_sale_items(vec![line(0, "4.50", None)]).unwrap_err();
        assert_eq!(err.field, "quantity");
    }

    #[test]
    fn test_sale_item_negative_price_rejected() {
        let err = validate_sale_items(vec![line(1, "-1.00", None)]).unwrap_err();
        assert_eq!(err.field, "unit_price");
    }

    #[test]
    fn test_empty_sale_rejected() {
        assert!(validate_sale_items(vec![]).is_err());
    }

    #[test]
    fn test_restock_quantity() {
        assert!(validate_restock_quantity(dec("0.5")).is_ok());
        assert!(validate_restock_quantity(Decimal::ZERO).is_err());
        assert!(validate_restock_quantity(dec("-2")).is_err());
    }

    #[test]
    fn test_adjustment_delta() {
        assert!(validate_adjustment_delta(dec("-2")).is_ok());
        assert!(validate_adjustment_delta(Decimal::ZERO).is_err());
    }

    #[test]
    fn test_reason_is_trimmed() {
        assert_eq!(validate_reason("  spoilage ").unwrap(), "spoilage");
        assert!(validate_reason("   ").is_err());
    }

    #[test]
    fn test_new_ingredient_needs_positive_minimum() {
        let input = NewIngredient {
            name: "Milk".to_string(),
            unit: "L".to_string(),
            opening_stock: dec("8.0"),
            min_stock_level: Decimal::ZERO,
            cost_per_unit: dec("1.10"),
        };
        let err = validate_new_ingredient(&input).unwrap_err();
        assert_eq!(err.field, "min_stock_level");
    }

    #[test]
    fn test_new_recipe_rejects_zero_quantity() {
        let input = NewRecipe {
            menu_item_id: "latte".to_string(),
            menu_item_name: "Latte".to_string(),
            lines: vec![RecipeLine {
                ingredient_id: Uuid::new_v4(),
                quantity_per_unit: Decimal::ZERO,
                unit: "L".to_string(),
            }],
        };
        assert!(validate_new_recipe(&input).is_err());
    }

    #[test]
    fn test_sale_item_huge_price_rejected() {
        let mut input = line(2, "1", None);
        input.unit_price = Decimal::MAX;
        let err = validate_sale_items(vec![input]).unwrap_err();
        assert_eq!(err.field, "unit_price");
    }

    #[test]
    fn test_sale_item_huge_quantity_rejected() {
        let err = validate_sale_items(vec![line(i64::MAX, "4.50", None)]).unwrap_err();
        assert_eq!(err.field, "quantity");
    }

    #[test]
    fn test_sale_total_beyond_ledger_rejected() {
        let big = "999999999999.99";
        let err = validate_sale_items(vec![line(1, big, None), line(1, big, None)]).unwrap_err();
        assert_eq!(err.field, "total_sales_amount");
    }

    #[test]
    fn test_price_with_sub_cent_places_rejected() {
        let err = validate_sale_items(vec![line(1, "1.005", None)]).unwrap_err();
        assert_eq!(err.field, "unit_price");
        assert!(validate_sale_items(vec![line(1, "1.500", None)]).is_ok());
    }

    #[test]
    fn test_quantity_scale_and_magnitude() {
        assert!(validate_quantity("quantity", dec("0.0001")).is_ok());
        assert!(validate_quantity("quantity", dec("2.50000")).is_ok());
        assert!(validate_quantity("quantity", dec("0.00005")).is_err());
        assert!(validate_quantity("quantity", max_quantity()).is_ok());
        assert!(validate_quantity("quantity", Decimal::MAX).is_err());
        assert!(validate_restock_quantity(Decimal::MAX).is_err());
        assert!(validate_adjustment_delta(Decimal::MIN).is_err());
    }

    #[test]
    fn test_new_recipe_rejects_unstorable_quantity() {
        let input = NewRecipe {
            menu_item_id: "latte".to_string(),
            menu_item_name: "Latte".to_string(),
            lines: vec![RecipeLine {
                ingredient_id: Uuid::new_v4(),
                quantity_per_unit: dec("0.00005"),
                unit: "L".to_string(),
            }],
        };
        let err = validate_new_recipe(&input).unwrap_err();
        assert_eq!(err.field, "quantity_per_unit");
    }

    #[test]
    fn test_date_window() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 7).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert!(validate_date_window(end, start).is_ok());
        assert!(validate_date_window(start, end).is_err());
    }
}
