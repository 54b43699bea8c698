use anyhow::Result;

use cookbook_core::models::{NewRecipe, Recipe};
use cookbook_core::service::RecipeCatalog;

use super::helpers::{exit_with_notice, format_rating, print_recipe_table, resolve_recipe_id};
use super::{AddArgs, FilterArgs};

pub(crate) fn cmd_list(catalog: &dyn RecipeCatalog, filter: &FilterArgs, json: bool) -> Result<()> {
    let filter = filter.to_filter()?;
    let recipes = catalog.filtered(&filter)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        let message = if filter.is_active() || filter.bookmarked_only {
            "No recipes match the current filters"
        } else {
            "No recipes found"
        };
        exit_with_notice(message, false);
    }

    print_recipe_table(&recipes);
    Ok(())
}

pub(crate) fn cmd_show(catalog: &dyn RecipeCatalog, id: &str, json: bool) -> Result<()> {
    let id = resolve_recipe_id(catalog, id)?;
    let recipe = catalog.recipe(&id)?;
    let user_rating = catalog.user_rating(&id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "recipe": recipe, "user_rating": user_rating })
        );
        return Ok(());
    }

    print_recipe(&recipe, user_rating);
    Ok(())
}

fn print_recipe(recipe: &Recipe, user_rating: Option<u8>) {
    let saved = if recipe.is_bookmarked { "  [bookmarked]" } else { "" };
    println!("=== {} ==={saved}", recipe.title);
    println!("  {}\n", recipe.description);
    println!(
        "  {}  |  {}  |  Prep {} min  |  Cook {} min  |  Serves {}",
        recipe.category, recipe.difficulty, recipe.prep_time, recipe.cook_time, recipe.servings
    );
    let rating = format_rating(recipe.rating, recipe.rating_count);
    match user_rating {
        Some(mine) => println!("  Rating: {rating}  |  Yours: {mine}/5"),
        None => println!("  Rating: {rating}"),
    }
    if !recipe.image.is_empty() {
        println!("  Image: {}", recipe.image);
    }

    println!("\n  INGREDIENTS:");
    for ingredient in &recipe.ingredients {
        println!("    - {ingredient}");
    }
    println!("\n  INSTRUCTIONS:");
    for (i, step) in recipe.instructions.iter().enumerate() {
        println!("    {}. {step}", i + 1);
    }
    println!("\n  id: {}  |  added {}", recipe.id, recipe.created_at);
}

pub(crate) fn cmd_add(catalog: &mut dyn RecipeCatalog, args: AddArgs, json: bool) -> Result<()> {
    let new = NewRecipe {
        title: args.title,
        description: args.description,
        image: args.image,
        prep_time: args.prep,
        cook_time: args.cook,
        servings: args.servings,
        difficulty: args.difficulty.parse()?,
        category: args.category,
        ingredients: args.ingredients,
        instructions: args.instructions,
    };
    let recipe = catalog.create_recipe(&new)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipe)?);
    } else {
        println!("Created recipe: {} (id: {})", recipe.title, recipe.id);
    }
    Ok(())
}
