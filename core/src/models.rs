use std::fmt;
use std::str::FromStr;

use anyhow::{Result, bail};
use chrono::Local;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub const CATEGORIES: &[&str] = &[
    "Main Course",
    "Soup",
    "Salad",
    "Dessert",
    "Appetizer",
    "Other",
];

pub const DEFAULT_CATEGORY: &str = "Main Course";
pub const DEFAULT_TITLE: &str = "Untitled Recipe";
pub const DEFAULT_SERVINGS: u32 = 4;
pub const PLACEHOLDER_IMAGE: &str = "/placeholder.svg";

pub const MAX_TITLE_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub const ALL: [Difficulty; 3] = [Difficulty::Easy, Difficulty::Medium, Difficulty::Hard];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Difficulty {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        let lower = s.trim().to_lowercase();
        Difficulty::ALL
            .into_iter()
            .find(|d| d.as_str() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!("Invalid difficulty '{s}'. Must be one of: easy, medium, hard")
            })
    }
}

/// A recipe as presented to the user, with its aggregate rating and the
/// current user's bookmark state folded in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub rating: f64,
    pub rating_count: u32,
    #[serde(default)]
    pub is_bookmarked: bool,
    pub created_at: String,
}

impl Recipe {
    #[must_use]
    pub fn total_time(&self) -> u32 {
        self.prep_time + self.cook_time
    }
}

/// A recipe submitted through the create form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewRecipe {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub prep_time: u32,
    #[serde(default)]
    pub cook_time: u32,
    #[serde(default = "default_servings")]
    pub servings: u32,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default = "default_category")]
    pub category: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
}

fn default_servings() -> u32 {
    DEFAULT_SERVINGS
}

fn default_category() -> String {
    DEFAULT_CATEGORY.to_string()
}

/// A recipe read from an import file. Every field the file did not supply
/// already holds its default, so callers never patch fields after the fact.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DraftRecipe {
    pub id: String,
    pub title: String,
    pub description: String,
    pub image: String,
    pub prep_time: u32,
    pub cook_time: u32,
    pub servings: u32,
    pub difficulty: Difficulty,
    pub category: String,
    pub ingredients: Vec<String>,
    pub instructions: Vec<String>,
    pub rating: f64,
    pub created_at: String,
}

impl Default for DraftRecipe {
    fn default() -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            title: DEFAULT_TITLE.to_string(),
            description: String::new(),
            image: PLACEHOLDER_IMAGE.to_string(),
            prep_time: 0,
            cook_time: 0,
            servings: DEFAULT_SERVINGS,
            difficulty: Difficulty::default(),
            category: DEFAULT_CATEGORY.to_string(),
            ingredients: Vec::new(),
            instructions: Vec::new(),
            rating: 0.0,
            created_at: Local::now().date_naive().format("%Y-%m-%d").to_string(),
        }
    }
}

impl DraftRecipe {
    #[must_use]
    pub fn into_recipe(self) -> Recipe {
        Recipe {
            id: self.id,
            title: self.title,
            description: self.description,
            image: self.image,
            prep_time: self.prep_time,
            cook_time: self.cook_time,
            servings: self.servings,
            difficulty: self.difficulty,
            category: self.category,
            ingredients: self.ingredients,
            instructions: self.instructions,
            rating: self.rating,
            rating_count: 0,
            is_bookmarked: false,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatingRecord {
    pub user_id: String,
    pub recipe_id: String,
    pub rating: u8,
}

/// The current user's own rating of a recipe, as kept by the local store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRating {
    pub recipe_id: String,
    pub rating: u8,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeFilter {
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub difficulty: Option<Difficulty>,
    #[serde(default)]
    pub bookmarked_only: bool,
}

impl RecipeFilter {
    /// Build a filter from user-supplied strings. `all` (or nothing) leaves a
    /// dimension unfiltered.
    pub fn parse(
        category: Option<&str>,
        difficulty: Option<&str>,
        bookmarked_only: bool,
    ) -> Result<Self> {
        let category = match category {
            Some(c) => parse_category_filter(c)?,
            None => None,
        };
        let difficulty = match difficulty.map(str::trim) {
            Some(d) if !d.eq_ignore_ascii_case("all") => Some(d.parse()?),
            _ => None,
        };
        Ok(Self {
            category,
            difficulty,
            bookmarked_only,
        })
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.category.is_some() || self.difficulty.is_some()
    }

    #[must_use]
    pub fn matches(&self, recipe: &Recipe) -> bool {
        if self.bookmarked_only && !recipe.is_bookmarked {
            return false;
        }
        if let Some(category) = &self.category {
            if recipe.category != *category {
                return false;
            }
        }
        self.difficulty.is_none_or(|d| recipe.difficulty == d)
    }

    #[must_use]
    pub fn apply(&self, recipes: Vec<Recipe>) -> Vec<Recipe> {
        recipes.into_iter().filter(|r| self.matches(r)).collect()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ImportSummary {
    pub rows_parsed: usize,
    pub recipes_imported: usize,
    /// The parsed rows, in document order.
    #[serde(skip)]
    pub drafts: Vec<DraftRecipe>,
}

/// Resolve a category to its canonical spelling. `all` (any case) means no
/// category filter and yields `None`.
pub fn parse_category_filter(category: &str) -> Result<Option<String>> {
    if category.trim().eq_ignore_ascii_case("all") {
        return Ok(None);
    }
    validate_category(category).map(Some)
}

pub fn validate_category(category: &str) -> Result<String> {
    let trimmed = category.trim();
    CATEGORIES
        .iter()
        .find(|c| c.eq_ignore_ascii_case(trimmed))
        .map(|c| (*c).to_string())
        .ok_or_else(|| {
            anyhow::anyhow!(
                "Invalid category '{category}'. Must be one of: {}",
                CATEGORIES.join(", ")
            )
        })
}

pub fn validate_rating(value: i64) -> Result<u8> {
    match u8::try_from(value) {
        Ok(v @ 1..=5) => Ok(v),
        _ => bail!("Rating must be between 1 and 5 (got {value})"),
    }
}

/// Validate and normalize a form submission: trims text, drops blank
/// ingredient and instruction lines, canonicalizes the category.
pub fn validate_new_recipe(recipe: &NewRecipe) -> Result<NewRecipe> {
    let title = recipe.title.trim().to_string();
    if title.is_empty() {
        bail!("Title is required");
    }
    if title.chars().count() > MAX_TITLE_LEN {
        bail!("Title too long (max {MAX_TITLE_LEN} characters)");
    }

    let description = recipe.description.trim().to_string();
    if description.is_empty() {
        bail!("Description is required");
    }
    if description.chars().count() > MAX_DESCRIPTION_LEN {
        bail!("Description too long (max {MAX_DESCRIPTION_LEN} characters)");
    }

    let image = recipe
        .image
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty());
    if let Some(url) = image {
        if !url.contains("://") {
            bail!("Image must be a valid URL");
        }
    }

    if recipe.servings < 1 {
        bail!("Servings must be at least 1");
    }

    let category = validate_category(&recipe.category)?;

    let ingredients = non_blank_lines(&recipe.ingredients);
    if ingredients.is_empty() {
        bail!("Add at least one ingredient");
    }
    let instructions = non_blank_lines(&recipe.instructions);
    if instructions.is_empty() {
        bail!("Add at least one instruction");
    }

    Ok(NewRecipe {
        title,
        description,
        image: image.map(String::from),
        prep_time: recipe.prep_time,
        cook_time: recipe.cook_time,
        servings: recipe.servings,
        difficulty: recipe.difficulty,
        category,
        ingredients,
        instructions,
    })
}

fn non_blank_lines(lines: &[String]) -> Vec<String> {
    lines
        .iter()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_new_recipe() -> NewRecipe {
        NewRecipe {
            title: "  Tomato Soup ".to_string(),
            description: "Warm and simple.".to_string(),
            image: Some(String::new()),
            prep_time: 10,
            cook_time: 30,
            servings: 2,
            difficulty: Difficulty::Easy,
            category: "soup".to_string(),
            ingredients: vec!["4 tomatoes".to_string(), "  ".to_string()],
            instructions: vec!["Simmer.".to_string()],
        }
    }

    fn sample_recipe(category: &str, difficulty: Difficulty, bookmarked: bool) -> Recipe {
        let mut recipe = DraftRecipe::default().into_recipe();
        recipe.category = category.to_string();
        recipe.difficulty = difficulty;
        recipe.is_bookmarked = bookmarked;
        recipe
    }

    #[test]
    fn test_difficulty_parse() {
        assert_eq!("easy".parse::<Difficulty>().unwrap(), Difficulty::Easy);
        assert_eq!(" HARD ".parse::<Difficulty>().unwrap(), Difficulty::Hard);
        assert!("extreme".parse::<Difficulty>().is_err());
    }

    #[test]
    fn test_difficulty_serde_lowercase() {
        let json = serde_json::to_string(&Difficulty::Medium).unwrap();
        assert_eq!(json, "\"medium\"");
    }

    #[test]
    fn test_validate_rating_bounds() {
        assert_eq!(validate_rating(1).unwrap(), 1);
        assert_eq!(validate_rating(5).unwrap(), 5);
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
    }

    #[test]
    fn test_validate_category_canonical() {
        assert_eq!(validate_category("main course").unwrap(), "Main Course");
        assert!(validate_category("Brunch").is_err());
    }

    #[test]
    fn test_parse_category_filter_all() {
        assert_eq!(parse_category_filter("All").unwrap(), None);
        assert_eq!(
            parse_category_filter("dessert").unwrap(),
            Some("Dessert".to_string())
        );
    }

    #[test]
    fn test_validate_new_recipe_normalizes() {
        let recipe = validate_new_recipe(&sample_new_recipe()).unwrap();
        assert_eq!(recipe.title, "Tomato Soup");
        assert_eq!(recipe.category, "Soup");
        assert_eq!(recipe.ingredients, vec!["4 tomatoes"]);
        assert!(recipe.image.is_none());
    }

    #[test]
    fn test_validate_new_recipe_rejects_missing_fields() {
        let mut recipe = sample_new_recipe();
        recipe.title = "   ".to_string();
        assert!(validate_new_recipe(&recipe).is_err());

        let mut recipe = sample_new_recipe();
        recipe.ingredients = vec![" ".to_string()];
        let err = validate_new_recipe(&recipe).unwrap_err();
        assert!(err.to_string().contains("ingredient"));

        let mut recipe = sample_new_recipe();
        recipe.servings = 0;
        assert!(validate_new_recipe(&recipe).is_err());

        let mut recipe = sample_new_recipe();
        recipe.image = Some("not a url".to_string());
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_validate_new_recipe_length_limits() {
        let mut recipe = sample_new_recipe();
        recipe.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(validate_new_recipe(&recipe).is_err());

        let mut recipe = sample_new_recipe();
        recipe.description = "y".repeat(MAX_DESCRIPTION_LEN + 1);
        assert!(validate_new_recipe(&recipe).is_err());
    }

    #[test]
    fn test_draft_defaults() {
        let draft = DraftRecipe::default();
        assert_eq!(draft.title, DEFAULT_TITLE);
        assert_eq!(draft.category, DEFAULT_CATEGORY);
        assert_eq!(draft.difficulty, Difficulty::Medium);
        assert_eq!(draft.servings, 4);
        assert_eq!(draft.image, PLACEHOLDER_IMAGE);
        assert_eq!(draft.created_at.len(), 10);
        assert_ne!(draft.id, DraftRecipe::default().id);

        let recipe = draft.into_recipe();
        assert_eq!(recipe.rating_count, 0);
        assert!(!recipe.is_bookmarked);
    }

    #[test]
    fn test_filter_parse() {
        let filter = RecipeFilter::parse(Some("soup"), Some("HARD"), true).unwrap();
        assert_eq!(filter.category.as_deref(), Some("Soup"));
        assert_eq!(filter.difficulty, Some(Difficulty::Hard));
        assert!(filter.bookmarked_only);

        let all = RecipeFilter::parse(Some("all"), Some("All"), false).unwrap();
        assert_eq!(all, RecipeFilter::default());
        assert!(!all.is_active());

        assert!(RecipeFilter::parse(Some("Brunch"), None, false).is_err());
        assert!(RecipeFilter::parse(None, Some("extreme"), false).is_err());
    }

    #[test]
    fn test_filter_matches() {
        let soup = sample_recipe("Soup", Difficulty::Easy, false);
        let cake = sample_recipe("Dessert", Difficulty::Hard, true);

        let filter = RecipeFilter {
            category: Some("Soup".to_string()),
            ..RecipeFilter::default()
        };
        assert!(filter.matches(&soup));
        assert!(!filter.matches(&cake));

        let filter = RecipeFilter {
            difficulty: Some(Difficulty::Hard),
            bookmarked_only: true,
            ..RecipeFilter::default()
        };
        let kept = filter.apply(vec![soup, cake]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].category, "Dessert");
    }
}
