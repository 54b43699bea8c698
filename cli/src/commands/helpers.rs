use anyhow::{Result, bail};
use serde::Serialize;
use std::process;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use cookbook_core::models::Recipe;
use cookbook_core::service::RecipeCatalog;

/// Resolve a full id or a unique id prefix to the recipe's id.
pub(crate) fn resolve_recipe_id(catalog: &dyn RecipeCatalog, id: &str) -> Result<String> {
    let id = id.trim();
    if id.is_empty() {
        bail!("Recipe id is required");
    }
    let recipes = catalog.recipes()?;
    if let Some(exact) = recipes.iter().find(|r| r.id == id) {
        return Ok(exact.id.clone());
    }
    let matches: Vec<&Recipe> = recipes.iter().filter(|r| r.id.starts_with(id)).collect();
    match matches.as_slice() {
        [] => bail!("Recipe '{id}' not found"),
        [only] => Ok(only.id.clone()),
        many => bail!(
            "Recipe id '{id}' is ambiguous ({} matches); use more characters",
            many.len()
        ),
    }
}

/// Print a notice for an empty result and exit with status 2.
pub(crate) fn exit_with_notice(message: &str, json: bool) -> ! {
    if json {
        println!("{}", json_error(message));
    } else {
        eprintln!("{message}");
    }
    process::exit(2);
}

pub(crate) fn print_recipe_table(recipes: &[Recipe]) {
    #[derive(Tabled)]
    struct RecipeRow {
        #[tabled(rename = "ID")]
        id: String,
        #[tabled(rename = "Title")]
        title: String,
        #[tabled(rename = "Category")]
        category: String,
        #[tabled(rename = "Difficulty")]
        difficulty: String,
        #[tabled(rename = "Time")]
        time: String,
        #[tabled(rename = "Serves")]
        servings: u32,
        #[tabled(rename = "Rating")]
        rating: String,
        #[tabled(rename = "Saved")]
        bookmarked: &'static str,
    }

    let rows: Vec<RecipeRow> = recipes
        .iter()
        .map(|r| RecipeRow {
            id: short_id(&r.id),
            title: truncate(&r.title, 35),
            category: r.category.clone(),
            difficulty: r.difficulty.to_string(),
            time: format!("{} min", r.total_time()),
            servings: r.servings,
            rating: format_rating(r.rating, r.rating_count),
            bookmarked: if r.is_bookmarked { "*" } else { "" },
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(4..7)).with(Alignment::right()))
        .to_string();
    println!("{table}");
}

pub(crate) fn format_rating(rating: f64, count: u32) -> String {
    if count == 0 {
        "-".to_string()
    } else {
        format!("{rating:.1} ({count})")
    }
}

pub(crate) fn json_error(message: &str) -> String {
    #[derive(Serialize)]
    struct CliError<'a> {
        error: &'a str,
    }
    serde_json::to_string(&CliError { error: message })
        .unwrap_or_else(|_| format!("{{\"error\":\"{message}\"}}"))
}

/// First 8 characters of an id; enough to address it as a prefix.
pub(crate) fn short_id(id: &str) -> String {
    id.chars().take(8).collect()
}

pub(crate) fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let end = s.char_indices().nth(max - 3).map_or(s.len(), |(i, _)| i);
        format!("{}...", &s[..end])
    }
}
