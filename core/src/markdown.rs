use std::fmt::Write;

use crate::models::Recipe;

pub const MARKDOWN_FILENAME: &str = "recipes.md";
pub const MARKDOWN_MIME: &str = "text/markdown";

/// Render recipes as Markdown, one section per recipe in input order.
#[must_use]
pub fn to_markdown(recipes: &[Recipe]) -> String {
    recipes
        .iter()
        .map(recipe_section)
        .collect::<Vec<_>>()
        .join("\n\n")
}

fn recipe_section(r: &Recipe) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}\n", r.title);
    let _ = writeln!(out, "{}\n", r.description);

    out.push_str("## Details\n");
    let _ = writeln!(out, "- **Category:** {}", r.category);
    let _ = writeln!(out, "- **Difficulty:** {}", r.difficulty);
    let _ = writeln!(out, "- **Prep Time:** {} minutes", r.prep_time);
    let _ = writeln!(out, "- **Cook Time:** {} minutes", r.cook_time);
    let _ = writeln!(out, "- **Servings:** {}", r.servings);
    let _ = writeln!(
        out,
        "- **Rating:** {}/5 ({} reviews)\n",
        r.rating, r.rating_count
    );

    out.push_str("## Ingredients\n");
    for ingredient in &r.ingredients {
        let _ = writeln!(out, "- {ingredient}");
    }

    out.push_str("\n## Instructions\n");
    for (i, step) in r.instructions.iter().enumerate() {
        let _ = writeln!(out, "{}. {step}", i + 1);
    }

    out.push_str("\n---\n");
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn recipe(title: &str) -> Recipe {
        Recipe {
            id: title.to_lowercase(),
            title: title.to_string(),
            description: "Rich and slow.".to_string(),
            image: String::new(),
            prep_time: 15,
            cook_time: 25,
            servings: 4,
            difficulty: Difficulty::Hard,
            category: "Main Course".to_string(),
            ingredients: vec!["2 onions".to_string(), "1 cup stock".to_string()],
            instructions: vec!["Chop.".to_string(), "Simmer.".to_string()],
            rating: 4.8,
            rating_count: 124,
            is_bookmarked: false,
            created_at: "2024-01-15".to_string(),
        }
    }

    #[test]
    fn test_single_recipe_layout() {
        let md = to_markdown(&[recipe("Stew")]);
        let expected = "# Stew

Rich and slow.

## Details
- **Category:** Main Course
- **Difficulty:** hard
- **Prep Time:** 15 minutes
- **Cook Time:** 25 minutes
- **Servings:** 4
- **Rating:** 4.8/5 (124 reviews)

## Ingredients
- 2 onions
- 1 cup stock

## Instructions
1. Chop.
2. Simmer.

---
";
        assert_eq!(md, expected);
    }

    #[test]
    fn test_sections_keep_input_order() {
        let md = to_markdown(&[recipe("Zucchini Bake"), recipe("Apple Tart")]);
        let first = md.find("# Zucchini Bake").unwrap();
        let second = md.find("# Apple Tart").unwrap();
        assert!(first < second);
        assert_eq!(md.matches("\n---\n").count(), 2);
        assert!(md.contains("---\n\n\n# Apple Tart"));
    }

    #[test]
    fn test_empty_input() {
        assert_eq!(to_markdown(&[]), "");
    }
}
