use anyhow::Result;

use cookbook_core::service::RecipeCatalog;

use super::helpers::{exit_with_notice, print_recipe_table, resolve_recipe_id};

pub(crate) fn cmd_bookmark(catalog: &mut dyn RecipeCatalog, id: &str, json: bool) -> Result<()> {
    let id = resolve_recipe_id(catalog, id)?;
    let bookmarked = catalog.toggle_bookmark(&id)?;

    if json {
        println!(
            "{}",
            serde_json::json!({ "recipe_id": id, "bookmarked": bookmarked })
        );
    } else {
        let title = catalog.recipe(&id)?.title;
        if bookmarked {
            println!("Bookmarked {title}");
        } else {
            println!("Removed bookmark from {title}");
        }
    }
    Ok(())
}

pub(crate) fn cmd_bookmarks(catalog: &dyn RecipeCatalog, json: bool) -> Result<()> {
    let recipes = catalog.bookmarked()?;

    if json {
        println!("{}", serde_json::to_string_pretty(&recipes)?);
        return Ok(());
    }
    if recipes.is_empty() {
        exit_with_notice("No bookmarked recipes yet", false);
    }

    print_recipe_table(&recipes);
    Ok(())
}
