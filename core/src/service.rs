use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::str::FromStr;

use anyhow::{Context, Result, bail};
use tracing::{debug, info};

use crate::db::Database;
use crate::markdown::{self, MARKDOWN_FILENAME, MARKDOWN_MIME};
use crate::models::{
    DraftRecipe, ImportSummary, NewRecipe, Recipe, RecipeFilter, validate_new_recipe,
    validate_rating,
};
use crate::rating::{self, RatingSummary};
use crate::recipe_csv::{self, CSV_FILENAME, CSV_MIME};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Markdown,
}

impl ExportFormat {
    #[must_use]
    pub fn filename(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_FILENAME,
            ExportFormat::Markdown => MARKDOWN_FILENAME,
        }
    }

    #[must_use]
    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Csv => CSV_MIME,
            ExportFormat::Markdown => MARKDOWN_MIME,
        }
    }

    #[must_use]
    pub fn render(self, recipes: &[Recipe]) -> String {
        match self {
            ExportFormat::Csv => recipe_csv::to_csv(recipes),
            ExportFormat::Markdown => markdown::to_markdown(recipes),
        }
    }
}

impl FromStr for ExportFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(ExportFormat::Csv),
            "markdown" | "md" => Ok(ExportFormat::Markdown),
            other => bail!("Invalid export format '{other}'. Must be one of: csv, markdown"),
        }
    }
}

/// A mutation was attempted without a signed-in user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignInRequired {
    action: &'static str,
}

impl fmt::Display for SignInRequired {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Please sign in to {}", self.action)
    }
}

impl std::error::Error for SignInRequired {}

/// The catalog as seen by one user: recipes decorated with aggregate ratings
/// and that user's bookmarks, plus the mutations a user can make.
///
/// Implemented by [`CookbookService`] over SQLite and by
/// [`crate::local::LocalCatalog`] over a load/save store.
pub trait RecipeCatalog: Send {
    fn recipes(&self) -> Result<Vec<Recipe>>;

    fn find_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        Ok(self.recipes()?.into_iter().find(|r| r.id == id))
    }

    fn recipe(&self, id: &str) -> Result<Recipe> {
        self.find_recipe(id)?
            .with_context(|| format!("Recipe '{id}' not found"))
    }

    fn filtered(&self, filter: &RecipeFilter) -> Result<Vec<Recipe>> {
        Ok(filter.apply(self.recipes()?))
    }

    fn bookmarked(&self) -> Result<Vec<Recipe>> {
        self.filtered(&RecipeFilter {
            bookmarked_only: true,
            ..RecipeFilter::default()
        })
    }

    fn user_rating(&self, recipe_id: &str) -> Result<Option<u8>>;

    fn rate_recipe(&mut self, recipe_id: &str, value: u8) -> Result<RatingSummary>;

    /// Flip the bookmark on a recipe; returns whether it is now bookmarked.
    fn toggle_bookmark(&mut self, recipe_id: &str) -> Result<bool>;

    fn create_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe>;

    fn import_drafts(&mut self, drafts: &[DraftRecipe]) -> Result<usize>;

    /// Parse `content` and add every row as a recipe. `Ok(None)` when the
    /// document holds no recipe rows.
    fn import_csv(&mut self, content: &str, dry_run: bool) -> Result<Option<ImportSummary>> {
        let drafts = recipe_csv::parse_recipes_csv(content);
        if drafts.is_empty() {
            return Ok(None);
        }
        let recipes_imported = if dry_run {
            0
        } else {
            self.import_drafts(&drafts)?
        };
        info!(rows = drafts.len(), recipes_imported, dry_run, "imported csv");
        Ok(Some(ImportSummary {
            rows_parsed: drafts.len(),
            recipes_imported,
            drafts,
        }))
    }

    /// Render the filtered recipes. `Ok(None)` when there is nothing to export.
    fn export(&self, format: ExportFormat, filter: &RecipeFilter) -> Result<Option<String>> {
        let recipes = self.filtered(filter)?;
        if recipes.is_empty() {
            return Ok(None);
        }
        debug!(?format, count = recipes.len(), "exporting recipes");
        Ok(Some(format.render(&recipes)))
    }
}

/// Catalog backed by the SQLite row store. Aggregates are recomputed from the
/// rating rows on every fetch.
pub struct CookbookService {
    db: Database,
    user_id: Option<String>,
}

impl CookbookService {
    pub fn new(db_path: &Path, user_id: Option<String>) -> Result<Self> {
        let db = Database::open(db_path)?;
        Ok(Self::with_database(db, user_id))
    }

    pub fn new_in_memory(user_id: Option<String>) -> Result<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::with_database(db, user_id))
    }

    fn with_database(db: Database, user_id: Option<String>) -> Self {
        let user_id = user_id
            .map(|u| u.trim().to_string())
            .filter(|u| !u.is_empty());
        Self { db, user_id }
    }

    #[must_use]
    pub fn user_id(&self) -> Option<&str> {
        self.user_id.as_deref()
    }

    fn require_user(&self, action: &'static str) -> Result<&str> {
        self.user_id
            .as_deref()
            .ok_or_else(|| SignInRequired { action }.into())
    }

    fn bookmark_set(&self) -> Result<HashSet<String>> {
        match &self.user_id {
            Some(user) => Ok(self.db.list_bookmarks(user)?.into_iter().collect()),
            None => Ok(HashSet::new()),
        }
    }
}

impl RecipeCatalog for CookbookService {
    fn recipes(&self) -> Result<Vec<Recipe>> {
        let by_recipe = rating::aggregate_by_recipe(&self.db.list_ratings()?);
        let bookmarks = self.bookmark_set()?;
        let recipes = self
            .db
            .list_recipes()?
            .into_iter()
            .map(|mut recipe| {
                if let Some(aggregate) = by_recipe.get(&recipe.id) {
                    recipe.rating = aggregate.mean();
                    recipe.rating_count = aggregate.count;
                }
                recipe.is_bookmarked = bookmarks.contains(&recipe.id);
                recipe
            })
            .collect();
        Ok(recipes)
    }

    fn find_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        let Some(mut recipe) = self.db.find_recipe(id)? else {
            return Ok(None);
        };
        let summary = rating::compute_aggregate(&self.db.list_ratings_for_recipe(id)?, id);
        recipe.rating = summary.mean;
        recipe.rating_count = summary.count;
        if let Some(user) = &self.user_id {
            recipe.is_bookmarked = self.db.is_bookmarked(user, id)?;
        }
        Ok(Some(recipe))
    }

    fn user_rating(&self, recipe_id: &str) -> Result<Option<u8>> {
        match &self.user_id {
            Some(user) => self.db.get_user_rating(user, recipe_id),
            None => Ok(None),
        }
    }

    fn rate_recipe(&mut self, recipe_id: &str, value: u8) -> Result<RatingSummary> {
        let user = self.require_user("rate recipes")?;
        let value = validate_rating(i64::from(value))?;
        self.db.get_recipe(recipe_id)?;
        self.db.upsert_rating(user, recipe_id, value)?;
        let ratings = self.db.list_ratings_for_recipe(recipe_id)?;
        Ok(rating::compute_aggregate(&ratings, recipe_id))
    }

    fn toggle_bookmark(&mut self, recipe_id: &str) -> Result<bool> {
        let user = self.require_user("bookmark recipes")?;
        self.db.get_recipe(recipe_id)?;
        if self.db.is_bookmarked(user, recipe_id)? {
            self.db.delete_bookmark(user, recipe_id)?;
            Ok(false)
        } else {
            self.db.insert_bookmark(user, recipe_id)?;
            Ok(true)
        }
    }

    fn create_recipe(&mut self, recipe: &NewRecipe) -> Result<Recipe> {
        let user = self.require_user("create recipes")?;
        let recipe = validate_new_recipe(recipe)?;
        let created = self.db.insert_recipe(user, &recipe)?;
        info!(id = %created.id, title = %created.title, "created recipe");
        Ok(created)
    }

    fn import_drafts(&mut self, drafts: &[DraftRecipe]) -> Result<usize> {
        self.db.insert_drafts(self.user_id.as_deref(), drafts)
    }
}
