//! Ingredient usage and runway reporting models

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{Ingredient, IngredientDeduction};

/// Usage of one ingredient over a reporting window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageReportRow {
    pub ingredient_id: Uuid,
    pub ingredient_name: String,
    pub unit: String,
    pub total_used: Decimal,
    /// Human-readable window, e.g. "2024-03-01 to 2024-03-07"
    pub usage_period: String,
    pub days_in_period: i64,
    pub average_daily_usage: Decimal,
    pub current_stock: Decimal,
    pub min_stock_level: Decimal,
    /// Projected days of runway; `None` when there is no measurable depletion rate
    pub days_until_stockout: Option<Decimal>,
    pub last_restock_date: Option<NaiveDate>,
}

impl UsageReportRow {
    pub fn build(
        ingredient: &Ingredient,
        total_used: Decimal,
        start: NaiveDate,
        end: NaiveDate,
        last_restock_date: Option<NaiveDate>,
    ) -> Self {
        let days = days_in_period(start, end);
        let average = average_daily_usage(total_used, days);

        Self {
            ingredient_id: ingredient.id,
            ingredient_name: ingredient.name.clone(),
            unit: ingredient.unit.clone(),
            total_used,
            usage_period: format!("{} to {}", start, end),
            days_in_period: days,
            average_daily_usage: average,
            current_stock: ingredient.current_stock,
            min_stock_level: ingredient.min_stock_level,
            days_until_stockout: days_until_stockout(ingredient.current_stock, average),
            last_restock_date,
        }
    }
}

/// Inclusive number of calendar days in a window, never less than one
pub fn days_in_period(start: NaiveDate, end: NaiveDate) -> i64 {
    ((end - start).num_days() + 1).max(1)
}

pub fn average_daily_usage(total_used: Decimal, days: i64) -> Decimal {
    if days <= 0 {
        return Decimal::ZERO;
    }
    total_used / Decimal::from(days)
}

/// Days until stock runs out at the given daily rate
pub fn days_until_stockout(current_stock: Decimal, average_daily_usage: Decimal) -> Option<Decimal> {
    if average_daily_usage > Decimal::ZERO {
        Some(current_stock / average_daily_usage)
    } else {
        None
    }
}

/// Total quantity deducted per ingredient
pub fn summarize_usage<'a, I>(deductions: I) -> BTreeMap<Uuid, Decimal>
where
    I: IntoIterator<Item = &'a IngredientDeduction>,
{
    let mut usage: BTreeMap<Uuid, Decimal> = BTreeMap::new();
    for deduction in deductions {
        *usage.entry(deduction.ingredient_id).or_insert(Decimal::ZERO) +=
            deduction.quantity_deducted;
    }
    usage
}
