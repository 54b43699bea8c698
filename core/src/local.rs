//! Local fallback catalog.
//!
//! Recipes, the user's own ratings and bookmarks live in one [`CatalogState`]
//! loaded from a [`CatalogStore`] at open time. Every mutation is written
//! through before it becomes visible. Ratings are folded in incrementally
//! because only this user's ratings are known locally.

use anyhow::{Context, Result};
use chrono::Local;
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    DraftRecipe, NewRecipe, Recipe, UserRating, validate_new_recipe, validate_rating,
};
use crate::rating::{RatingAggregate, RatingSummary};
use crate::service::RecipeCatalog;
use crate::store::{CatalogState, CatalogStore};

const SEED_RECIPES: &str = include_str!("../data/seed_recipes.json");

/// The starter recipes a fresh catalog is seeded with.
pub fn seed_recipes() -> Result<Vec<Recipe>> {
    serde_json::from_str(SEED_RECIPES).context("Bundled seed recipes are invalid")
}

pub struct LocalCatalog<S: CatalogStore> {
    store: S,
    state: CatalogState,
}

impl<S: CatalogStore> LocalCatalog<S> {
    /// Load the catalog, seeding and saving the starter recipes when the
    /// store is empty.
    pub fn open(store: S) -> Result<Self> {
        let state = if let Some(state) = store.load()? {
            state
        } else {
            let state = CatalogState {
                recipes: seed_recipes()?,
                ..CatalogState::default()
            };
            store.save(&state)?;
            info!(recipes = state.recipes.len(), "seeded local catalog");
            state
        };
        Ok(Self { store, state })
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn is_bookmarked(&self, recipe_id: &str) -> bool {
        self.state.bookmarks.iter().any(|id| id == recipe_id)
    }

    #[must_use]
    pub fn user_rating(&self, recipe_id: &str) -> Option<u8> {
        self.state
            .user_ratings
            .iter()
            .find(|r| r.recipe_id == recipe_id)
            .map(|r| r.rating)
    }

    #[must_use]
    pub fn recipes(&self) -> Vec<Recipe> {
        self.state
            .recipes
            .iter()
            .map(|r| Recipe {
                is_bookmarked: self.is_bookmarked(&r.id),
                ..r.clone()
            })
            .collect()
    }

    #[must_use]
    pub fn bookmarked_recipes(&self) -> Vec<Recipe> {
        self.recipes()
            .into_iter()
            .filter(|r| r.is_bookmarked)
            .collect()
    }

    /// Record the user's rating and fold it into the recipe's aggregate
    /// without rescanning other users' ratings.
    pub fn rate_recipe(&mut self, recipe_id: &str, value: u8) -> Result<RatingSummary> {
        let value = validate_rating(i64::from(value))?;
        let idx = self.position(recipe_id)?;
        let previous = self.user_rating(recipe_id);

        self.commit(|state| {
            match state
                .user_ratings
                .iter_mut()
                .find(|r| r.recipe_id == recipe_id)
            {
                Some(existing) => existing.rating = value,
                None => state.user_ratings.push(UserRating {
                    recipe_id: recipe_id.to_string(),
                    rating: value,
                }),
            }

            let recipe = &mut state.recipes[idx];
            let aggregate = state
                .rating_totals
                .get(recipe_id)
                .copied()
                .unwrap_or_else(|| RatingAggregate::from_mean(recipe.rating, recipe.rating_count))
                .upsert(previous, value);
            recipe.rating = aggregate.mean();
            recipe.rating_count = aggregate.count;
            state.rating_totals.insert(recipe_id.to_string(), aggregate);

            debug!(recipe_id, value, ?previous, mean = aggregate.mean(), "rated recipe");
            Ok(aggregate.summary())
        })
    }

    /// Flip the bookmark on a recipe; returns the new state.
    pub fn toggle_bookmark(&mut self, recipe_id: &str) -> Result<bool> {
        let idx = self.position(recipe_id)?;
        let bookmarked = !self.is_bookmarked(recipe_id);

        self.commit(|state| {
            if bookmarked {
                state.bookmarks.push(recipe_id.to_string());
            } else {
                state.bookmarks.retain(|id| id != recipe_id);
            }
            state.recipes[idx].is_bookmarked = bookmarked;
            Ok(bookmarked)
        })
    }

    pub fn add_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe> {
        let recipe = validate_new_recipe(recipe)?;
        let created = Recipe {
            id: Uuid::new_v4().to_string(),
            title: recipe.title,
            description: recipe.description,
            image: recipe.image.unwrap_or_default(),
            prep_time: recipe.prep_time,
            cook_time: recipe.cook_time,
            servings: recipe.servings,
            difficulty: recipe.difficulty,
            category: recipe.category,
            ingredients: recipe.ingredients,
            instructions: recipe.instructions,
            rating: 0.0,
            rating_count: 0,
            is_bookmarked: false,
            created_at: Local::now().date_naive().format("%Y-%m-%d").to_string(),
        };

        self.commit(|state| {
            state.recipes.push(created.clone());
            Ok(())
        })?;
        info!(id = %created.id, title = %created.title, "created recipe");
        Ok(created)
    }

    pub fn import_drafts(&mut self, drafts: &[DraftRecipe]) -> Result<usize> {
        self.commit(|state| {
            state
                .recipes
                .extend(drafts.iter().cloned().map(DraftRecipe::into_recipe));
            Ok(drafts.len())
        })
    }

    fn position(&self, recipe_id: &str) -> Result<usize> {
        self.state
            .recipes
            .iter()
            .position(|r| r.id == recipe_id)
            .with_context(|| format!("Recipe '{recipe_id}' not found"))
    }

    /// Apply `change` to a copy of the state, save it, then adopt it. A failed
    /// save leaves the in-memory catalog untouched.
    fn commit<T>(&mut self, change: impl FnOnce(&mut CatalogState) -> Result<T>) -> Result<T> {
        let mut next = self.state.clone();
        let out = change(&mut next)?;
        self.store.save(&next)?;
        self.state = next;
        Ok(out)
    }
}

impl<S: CatalogStore> RecipeCatalog for LocalCatalog<S> {
    fn recipes(&self) -> Result<Vec<Recipe>> {
        Ok(LocalCatalog::recipes(self))
    }

    fn user_rating(&self, recipe_id: &str) -> Result<Option<u8>> {
        Ok(LocalCatalog::user_rating(self, recipe_id))
    }

    fn rate_recipe(&mut self, recipe_id: &str, value: u8) -> Result<RatingSummary> {
        LocalCatalog::rate_recipe(self, recipe_id, value)
    }

    fn toggle_bookmark(&mut self, recipe_id: &str) -> Result<bool> {
        LocalCatalog::toggle_bookmark(self, recipe_id)
    }

    fn create_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe> {
        self.add_recipe(recipe)
    }

    fn import_drafts(&mut self, drafts: &[DraftRecipe]) -> Result<usize> {
        LocalCatalog::import_drafts(self, drafts)
    }
}
