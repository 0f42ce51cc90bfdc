//! Ingredient models

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// An ingredient tracked in a restaurant's stock room
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Ingredient {
    pub id: Uuid,
    pub restaurant_id: Uuid,
    pub name: String,
    /// Unit stock is counted in (e.g., "kg", "L", "each")
    pub unit: String,
    pub current_stock: Decimal,
    /// Threshold at or below which the ingredient counts as low stock. Always positive.
    pub min_stock_level: Decimal,
    pub cost_per_unit: Decimal,
    /// Stock at registration; the origin every ledger replay starts from
    pub opening_stock: Decimal,
    /// Bumped by one on every committed stock change
    pub version: i64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Ingredient {
    /// Whether the current stock is at or below the minimum level
    pub fn is_low_stock(&self) -> bool {
        self.current_stock <= self.min_stock_level
    }

    /// Value of the stock on hand at the recorded unit cost
    pub fn stock_value(&self) -> Decimal {
        self.current_stock * self.cost_per_unit
    }
}

/// Input for registering a new ingredient
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewIngredient {
    pub name: String,
    pub unit: String,
    #[serde(default)]
    pub opening_stock: Decimal,
    pub min_stock_level: Decimal,
    #[serde(default)]
    pub cost_per_unit: Decimal,
}

impl NewIngredient {
    /// Build the stored ingredient at version 0
    pub fn into_ingredient(self, restaurant_id: Uuid, now: DateTime<Utc>) -> Ingredient {
        Ingredient {
            id: Uuid::new_v4(),
            restaurant_id,
            name: self.name.trim().to_string(),
            unit: self.unit.trim().to_string(),
            current_stock: self.opening_stock,
            min_stock_level: self.min_stock_level,
            cost_per_unit: self.cost_per_unit,
            opening_stock: self.opening_stock,
            version: 0,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
