mod bookmark;
mod export;
mod helpers;
mod import;
mod rate;
mod recipe;

use anyhow::Result;
use clap::Args;

use cookbook_core::models::{DEFAULT_CATEGORY, DEFAULT_SERVINGS, RecipeFilter};

pub(crate) use bookmark::{cmd_bookmark, cmd_bookmarks};
pub(crate) use export::cmd_export;
pub(crate) use import::cmd_import;
pub(crate) use rate::cmd_rate;
pub(crate) use recipe::{cmd_add, cmd_list, cmd_show};

#[derive(Args)]
pub(crate) struct FilterArgs {
    /// Only recipes in this category (or "all")
    #[arg(short, long)]
    category: Option<String>,
    /// Only recipes of this difficulty: easy, medium, hard (or "all")
    #[arg(short, long)]
    difficulty: Option<String>,
    /// Only bookmarked recipes
    #[arg(long)]
    bookmarked: bool,
}

impl FilterArgs {
    fn to_filter(&self) -> Result<RecipeFilter> {
        RecipeFilter::parse(
            self.category.as_deref(),
            self.difficulty.as_deref(),
            self.bookmarked,
        )
    }
}

#[derive(Args)]
pub(crate) struct AddArgs {
    /// Recipe title
    title: String,
    /// Short description
    #[arg(long)]
    description: String,
    /// Image URL
    #[arg(long)]
    image: Option<String>,
    /// Prep time in minutes
    #[arg(long, default_value = "0")]
    prep: u32,
    /// Cook time in minutes
    #[arg(long, default_value = "0")]
    cook: u32,
    /// Number of servings
    #[arg(long, default_value_t = DEFAULT_SERVINGS)]
    servings: u32,
    /// easy, medium or hard
    #[arg(long, default_value = "medium")]
    difficulty: String,
    /// Main Course, Soup, Salad, Dessert, Appetizer or Other
    #[arg(long, default_value = DEFAULT_CATEGORY)]
    category: String,
    /// Ingredient line (repeat for each ingredient)
    #[arg(long = "ingredient", required = true)]
    ingredients: Vec<String>,
    /// Instruction step (repeat for each step, in order)
    #[arg(long = "instruction", required = true)]
    instructions: Vec<String>,
}
