use anyhow::Result;

use cookbook_core::models::validate_rating;
use cookbook_core::service::RecipeCatalog;

use super::helpers::resolve_recipe_id;

pub(crate) fn cmd_rate(
    catalog: &mut dyn RecipeCatalog,
    id: &str,
    rating: i64,
    json: bool,
) -> Result<()> {
    let rating = validate_rating(rating)?;
    let id = resolve_recipe_id(catalog, id)?;
    let summary = catalog.rate_recipe(&id, rating)?;

    if json {
        println!(
            "{}",
            serde_json::json!({
                "recipe_id": id,
                "rating": rating,
                "mean": summary.mean,
                "count": summary.count,
            })
        );
    } else {
        let title = catalog.recipe(&id)?.title;
        println!(
            "Rated {title} {rating}/5. Now {:.1} from {} ratings.",
            summary.mean, summary.count
        );
    }
    Ok(())
}
