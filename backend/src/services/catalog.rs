//! Ingredient and recipe registration

use std::sync::Arc;

use chrono::Utc;
use shared::{
    validate_new_ingredient, validate_new_recipe, Actor, Ingredient, NewIngredient, NewRecipe,
    Recipe, ValidationError,
};
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::InventoryStore;

#[derive(Clone)]
pub struct CatalogService {
    store: Arc<dyn InventoryStore>,
}

impl CatalogService {
    pub fn new(store: Arc<dyn InventoryStore>) -> Self {
        Self { store }
    }

    pub async fn list_ingredients(&self, restaurant_id: Uuid) -> AppResult<Vec<Ingredient>> {
        self.store.list_ingredients(restaurant_id).await
    }

    pub async fn register_ingredient(&self, actor: Actor, input: NewIngredient) -> AppResult<Ingredient> {
        validate_new_ingredient(&input)?;

        let ingredient = input.into_ingredient(actor.restaurant_id, Utc::now());
        self.store.insert_ingredient(&ingredient).await?;

        tracing::info!(
            ingredient_id = %ingredient.id,
            name = %ingredient.name,
            opening_stock = %ingredient.opening_stock,
            "Registered ingredient"
        );
        Ok(ingredient)
    }

    /// Stop restocks and corrections on an ingredient. Existing recipes keep deducting it.
    pub async fn deactivate_ingredient(&self, actor: Actor, ingredient_id: Uuid) -> AppResult<Ingredient> {
        let ingredient = self
            .store
            .get_ingredient(ingredient_id)
            .await?
            .filter(|i| i.restaurant_id == actor.restaurant_id)
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))?;

        if !ingredient.is_active {
            return Ok(ingredient);
        }

        if !self.store.set_ingredient_active(ingredient_id, false).await? {
            return Err(AppError::NotFound("Ingredient".to_string()));
        }

        tracing::info!(%ingredient_id, name = %ingredient.name, "Deactivated ingredient");

        self.store
            .get_ingredient(ingredient_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Ingredient".to_string()))
    }

    /// Store a recipe. A newer recipe for the same menu item supersedes older ones.
    pub async fn register_recipe(&self, actor: Actor, input: NewRecipe) -> AppResult<Recipe> {
        validate_new_recipe(&input)?;

        for line in &input.lines {
            let known = self
                .store
                .get_ingredient(line.ingredient_id)
                .await?
                .is_some_and(|i| i.restaurant_id == actor.restaurant_id);
            if !known {
                return Err(ValidationError::new(
                    "ingredient_id",
                    format!("Unknown ingredient {}", line.ingredient_id),
                )
                .into());
            }
        }

        let recipe = input.into_recipe(actor.restaurant_id, Utc::now());
        self.store.insert_recipe(&recipe).await?;

        tracing::info!(
            recipe_id = %recipe.id,
            menu_item_id = %recipe.menu_item_id,
            lines = recipe.lines.len(),
            "Registered recipe"
        );
        Ok(recipe)
    }
}
