use std::path::PathBuf;

use anyhow::{Context, Result};

use cookbook_core::service::{ExportFormat, RecipeCatalog};

use super::FilterArgs;
use super::helpers::exit_with_notice;

const NO_RECIPES_TO_EXPORT: &str = "No recipes to export";

pub(crate) fn cmd_export(
    catalog: &dyn RecipeCatalog,
    format: &str,
    output: Option<PathBuf>,
    filter: &FilterArgs,
    json: bool,
) -> Result<()> {
    let format: ExportFormat = format.parse()?;
    let filter = filter.to_filter()?;

    let Some(content) = catalog.export(format, &filter)? else {
        exit_with_notice(NO_RECIPES_TO_EXPORT, json);
    };

    let path = output.unwrap_or_else(|| PathBuf::from(format.filename()));
    std::fs::write(&path, &content)
        .with_context(|| format!("Failed to write export: {}", path.display()))?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "path": path.display().to_string(),
                "mime": format.mime(),
                "bytes": content.len(),
            })
        );
    } else {
        println!("Exported recipes to {}", path.display());
    }
    Ok(())
}
