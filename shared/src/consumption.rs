//! Ingredient consumption for a sale
//!
//! Turns sold menu items and their recipes into the total quantity required
//! per ingredient. Contributions from different items that share an ingredient
//! are summed here, before any stock is read, so each ingredient is reconciled
//! exactly once per sale.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use uuid::Uuid;

use crate::models::{Recipe, SaleItem};
use crate::validation::{max_quantity, ValidationError};

/// Required quantity per ingredient for one sale.
///
/// Items without a recipe contribute nothing. Ingredients whose total comes to
/// zero are left out. A requirement larger than any stock level can hold is
/// rejected.
pub fn calculate_consumption<'a, I>(lines: I) -> Result<BTreeMap<Uuid, Decimal>, ValidationError>
where
    I: IntoIterator<Item = (&'a SaleItem, Option<&'a Recipe>)>,
{
    let mut required: BTreeMap<Uuid, Decimal> = BTreeMap::new();

    for (item, recipe) in lines {
        let Some(recipe) = recipe else {
            continue;
        };
        let sold = Decimal::from(item.quantity);
        for line in &recipe.lines {
            let so_far = required
                .get(&line.ingredient_id)
                .copied()
                .unwrap_or(Decimal::ZERO);
            let total = line
                .quantity_per_unit
                .checked_mul(sold)
                .and_then(|needed| so_far.checked_add(needed))
                .filter(|sum| *sum <= max_quantity())
                .ok_or_else(|| {
                    ValidationError::new(
                        "quantity",
                        format!("Too many {} sold for the stock ledger", item.menu_item_id),
                    )
                })?;
            required.insert(line.ingredient_id, total);
        }
    }

    required.retain(|_, quantity| *quantity > Decimal::ZERO);
    Ok(required)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::RecipeLine;
    use chrono::Utc;
    use std::str::FromStr;

    fn dec(s: &str) -> Decimal {
        Decimal::from_str(s).unwrap()
    }

    fn item(menu_item_id: &str, quantity: i64) -> SaleItem {
        SaleItem {
            menu_item_id: menu_item_id.to_string(),
            menu_item_name: menu_item_id.to_string(),
            quantity,
            unit_price: dec("4.50"),
            total_price: dec("4.50") * Decimal::from(quantity),
            category: None,
        }
    }

    fn recipe(menu_item_id: &str, lines: Vec<(Uuid, &str)>) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            restaurant_id: Uuid::nil(),
            menu_item_id: menu_item_id.to_string(),
            menu_item_name: menu_item_id.to_string(),
            lines: lines
                .into_iter()
                .map(|(ingredient_id, qty)| RecipeLine {
                    ingredient_id,
                    quantity_per_unit: dec(qty),
                    unit: "L".to_string(),
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_shared_ingredient_is_summed() {
        let milk = Uuid::new_v4();
        let latte = recipe("latte", vec![(milk, "0.3")]);
        let cappuccino = recipe("cappuccino", vec![(milk, "0.2")]);
        let latte_sale = item("latte", 10);
        let cappuccino_sale = item("cappuccino", 12);

        let required = calculate_consumption([
            (&latte_sale, Some(&latte)),
            (&cappuccino_sale, Some(&cappuccino)),
        ])
        .unwrap();

        assert_eq!(required.len(), 1);
        assert_eq!(required[&milk], dec("5.4"));
    }

    #[test]
    fn test_item_without_recipe_contributes_nothing() {
        let surcharge = item("service-charge", 1);
        let required = calculate_consumption([(&surcharge, None)]).unwrap();
        assert!(required.is_empty());
    }

    #[test]
    fn test_repeated_line_in_one_recipe() {
        let sugar = Uuid::new_v4();
        let dessert = recipe("dessert", vec![(sugar, "0.05"), (sugar, "0.02")]);
        let sale = item("dessert", 3);

        let required = calculate_consumption([(&sale, Some(&dessert))]).unwrap();
        assert_eq!(required[&sugar], dec("0.21"));
    }

    #[test]
    fn test_requirement_beyond_ledger_rejected() {
        let flour = Uuid::new_v4();
        let bread = recipe("bread", vec![(flour, "9999999999")]);
        let sale = item("bread", 1_000);

        let err = calculate_consumption([(&sale, Some(&bread))]).unwrap_err();
        assert_eq!(err.field, "quantity");
    }
}
