//! Property tests for the pure reconciliation calculators
//!
//! - Urgency tiers never improve as stock falls
//! - A stock draw never goes negative and never takes more than required
//! - Consumption is additive across sale lines
//! - Sale totals match their lines

use chrono::Utc;
use proptest::prelude::*;
use rust_decimal::Decimal;
use shared::{
    calculate_consumption, classify_urgency, sale_totals, urgency_for, Recipe, RecipeLine,
    SaleItem, SaleItemInput, StockDraw, UrgencyTier,
};
use uuid::Uuid;

/// Quantities with up to three decimal places
fn quantity_strategy() -> impl Strategy<Value = Decimal> {
    (0i64..100_000).prop_map(|n| Decimal::new(n, 3))
}

fn positive_quantity_strategy() -> impl Strategy<Value = Decimal> {
    (1i64..100_000).prop_map(|n| Decimal::new(n, 3))
}

fn sale_item(menu_item_id: &str, quantity: i64, unit_price: Decimal) -> SaleItem {
    SaleItem::new(SaleItemInput {
        menu_item_id: menu_item_id.to_string(),
        menu_item_name: menu_item_id.to_string(),
        quantity,
        unit_price,
        total_price: None,
        category: None,
    })
    .unwrap()
}

fn recipe(menu_item_id: &str, ingredient_id: Uuid, quantity_per_unit: Decimal) -> Recipe {
    Recipe {
        id: Uuid::new_v4(),
        restaurant_id: Uuid::new_v4(),
        menu_item_id: menu_item_id.to_string(),
        menu_item_name: menu_item_id.to_string(),
        lines: vec![RecipeLine {
            ingredient_id,
            quantity_per_unit,
            unit: "kg".to_string(),
        }],
        created_at: Utc::now(),
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(100))]

    /// Property: lower stock never yields a less urgent tier
    #[test]
    fn prop_urgency_is_monotonic(
        a in quantity_strategy(),
        b in quantity_strategy(),
        min in positive_quantity_strategy(),
    ) {
        let (low, high) = if a <= b { (a, b) } else { (b, a) };
        let rank = |tier: Option<UrgencyTier>| tier.map(|t| t as i32 + 1).unwrap_or(0);
        prop_assert!(rank(classify_urgency(low, min)) >= rank(classify_urgency(high, min)));
    }

    /// Property: a warning is raised exactly when stock is at or below the minimum
    #[test]
    fn prop_warning_iff_at_or_below_minimum(
        stock in quantity_strategy(),
        min in positive_quantity_strategy(),
    ) {
        prop_assert_eq!(classify_urgency(stock, min).is_some(), stock <= min);
    }

    /// Property: draws are clamped to stock on hand and shortfalls are critical
    #[test]
    fn prop_draw_is_clamped(
        required in quantity_strategy(),
        stock in quantity_strategy(),
        min in positive_quantity_strategy(),
    ) {
        let draw = StockDraw::compute(required, stock);
        prop_assert!(draw.new_stock >= Decimal::ZERO);
        prop_assert!(draw.deducted <= required);
        prop_assert_eq!(draw.deducted, required.min(stock));
        prop_assert_eq!(draw.previous_stock - draw.deducted, draw.new_stock);
        if draw.is_short() {
            prop_assert_eq!(
                urgency_for(draw.new_stock, min, true),
                Some(UrgencyTier::Critical)
            );
        }
    }

    /// Property: splitting a sale line in two requires the same total
    #[test]
    fn prop_consumption_is_additive(
        first in 1i64..50,
        second in 1i64..50,
        per_unit in positive_quantity_strategy(),
    ) {
        let ingredient_id = Uuid::new_v4();
        let recipe = recipe("stew", ingredient_id, per_unit);

        let split = [
            sale_item("stew", first, Decimal::ONE),
            sale_item("stew", second, Decimal::ONE),
        ];
        let merged = sale_item("stew", first + second, Decimal::ONE);

        let split_total =
            calculate_consumption(split.iter().map(|item| (item, Some(&recipe)))).unwrap();
        let merged_total = calculate_consumption([(&merged, Some(&recipe))]).unwrap();

        prop_assert_eq!(split_total, merged_total);
    }

    /// Property: sale totals are the sum of line totals and quantities
    #[test]
    fn prop_sale_totals_match_lines(
        lines in prop::collection::vec((1i64..20, 0i64..10_000), 1..10),
    ) {
        let items: Vec<SaleItem> = lines
            .iter()
            .enumerate()
            .map(|(i, (quantity, cents))| {
                sale_item(&format!("item-{}", i), *quantity, Decimal::new(*cents, 2))
            })
            .collect();

        let (amount, count) = sale_totals(&items).unwrap();
        let expected_amount: Decimal = lines
            .iter()
            .map(|(quantity, cents)| Decimal::new(*cents, 2) * Decimal::from(*quantity))
            .sum();
        let expected_count: i64 = lines.iter().map(|(quantity, _)| quantity).sum();

        prop_assert_eq!(amount, expected_amount);
        prop_assert_eq!(count, expected_count);
    }
}
