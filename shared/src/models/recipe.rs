//! Recipe models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Ingredients a menu item consumes per unit sold.
///
/// Stored recipes are never edited. Registering a recipe for a menu item that
/// already has one stores a new version; lookups resolve to the newest.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Recipe {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub lines: Vec<RecipeLine>,
    pub created_at: DateTime<Utc>,
}

/// One (ingredient, quantity-per-unit) pair of a recipe
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RecipeLine {
    pub ingredient_id: Uuid,
    pub quantity_per_unit: Decimal,
    pub unit: String,
}

/// Input for registering a recipe
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub menu_item_id: String,
    pub menu_item_name: String,
    pub lines: Vec<RecipeLine>,
}

impl NewRecipe {
    pub fn into_recipe(self, restaurant_id: Uuid, now: DateTime<Utc>) -> Recipe {
        Recipe {
            id: Uuid::new_v4(),
            restaurant_id,
            menu_item_id: self.menu_item_id,
            menu_item_name: self.menu_item_name,
            lines: self.lines,
            created_at: now,
        }
    }
}
