use std::path::Path;

use anyhow::{Context, Result, bail};

use cookbook_core::service::RecipeCatalog;

use super::helpers::{exit_with_notice, truncate};

const NO_RECIPES_FOUND: &str = "No recipes found in CSV file";

pub(crate) fn cmd_import(
    catalog: &mut dyn RecipeCatalog,
    path: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    if !has_csv_extension(path) {
        bail!("Please select a CSV file: {}", path.display());
    }
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read file: {}", path.display()))?;

    let Some(summary) = catalog.import_csv(&content, dry_run)? else {
        exit_with_notice(NO_RECIPES_FOUND, json);
    };

    if json {
        println!(
            "{}",
            serde_json::json!({
                "dry_run": dry_run,
                "rows_parsed": summary.rows_parsed,
                "recipes_imported": summary.recipes_imported,
            })
        );
    } else if dry_run {
        println!("Dry run, no changes made.\n");
        println!("  Recipes found: {}", summary.rows_parsed);
        for draft in &summary.drafts {
            println!(
                "    {} ({}, {})",
                truncate(&draft.title, 40),
                draft.category,
                draft.difficulty
            );
        }
    } else {
        println!(
            "Imported {} recipes from {}",
            summary.recipes_imported,
            path.display()
        );
    }

    Ok(())
}

fn has_csv_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("csv"))
}
