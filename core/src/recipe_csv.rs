//! CSV exchange format for recipes.
//!
//! Export quotes only the free-text columns. Import is line oriented: the
//! document is split on `\n` before fields are split, so a quoted value that
//! spans lines is not supported and an unterminated quote runs to the end of
//! its line.

use std::fmt::Write;

use tracing::warn;

use crate::models::{DEFAULT_SERVINGS, DraftRecipe, Recipe};

pub const CSV_FILENAME: &str = "recipes.csv";
pub const CSV_MIME: &str = "text/csv";

pub const CSV_HEADERS: [&str; 10] = [
    "Title",
    "Description",
    "Category",
    "Difficulty",
    "Prep Time (min)",
    "Cook Time (min)",
    "Servings",
    "Rating",
    "Ingredients",
    "Instructions",
];

pub const INGREDIENT_SEPARATOR: &str = "; ";
pub const INSTRUCTION_SEPARATOR: &str = " | ";

/// Serialize recipes under the fixed header. Rows are `\n`-joined with no
/// trailing newline.
#[must_use]
pub fn to_csv(recipes: &[Recipe]) -> String {
    let mut out = CSV_HEADERS.join(",");
    for r in recipes {
        out.push('\n');
        let _ = write!(
            out,
            "{},{},{},{},{},{},{},{},{},{}",
            quote(&r.title),
            quote(&r.description),
            r.category,
            r.difficulty,
            r.prep_time,
            r.cook_time,
            r.servings,
            r.rating,
            quote(&r.ingredients.join(INGREDIENT_SEPARATOR)),
            quote(&r.instructions.join(INSTRUCTION_SEPARATOR)),
        );
    }
    out
}

fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

/// Split one CSV line into trimmed fields.
///
/// `"` toggles quoted mode, `""` inside quotes is a literal quote, and a comma
/// separates fields only outside quotes.
#[must_use]
pub fn split_csv_line(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                fields.push(current.trim().to_string());
                current.clear();
            }
            _ => current.push(c),
        }
    }
    fields.push(current.trim().to_string());
    fields
}

/// Parse a CSV document into draft recipes.
///
/// Columns are located by header name (case-insensitive), so their order in
/// the file does not matter. Missing or empty values take the draft defaults.
/// Blank lines are skipped. A header-only document yields no drafts.
#[must_use]
pub fn parse_recipes_csv(content: &str) -> Vec<DraftRecipe> {
    let mut lines = content.split('\n');
    let Some(header_line) = lines.next() else {
        return Vec::new();
    };
    let headers: Vec<String> = split_csv_line(header_line)
        .into_iter()
        .map(|h| h.to_lowercase())
        .collect();
    let col = |name: &str| headers.iter().position(|h| h == name);

    let idx_title = col("title");
    let idx_description = col("description");
    let idx_category = col("category");
    let idx_difficulty = col("difficulty");
    let idx_prep = col("prep time (min)");
    let idx_cook = col("cook time (min)");
    let idx_servings = col("servings");
    let idx_rating = col("rating");
    let idx_ingredients = col("ingredients");
    let idx_instructions = col("instructions");

    let mut drafts = Vec::new();

    for (line_num, line) in lines.enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let values = split_csv_line(line);
        let field = |idx: Option<usize>| {
            idx.and_then(|i| values.get(i))
                .map(String::as_str)
                .filter(|v| !v.is_empty())
        };

        let mut draft = DraftRecipe::default();

        if let Some(title) = field(idx_title) {
            draft.title = title.to_string();
        }
        if let Some(description) = field(idx_description) {
            draft.description = description.to_string();
        }
        if let Some(category) = field(idx_category) {
            draft.category = category.to_string();
        }
        if let Some(difficulty) = field(idx_difficulty) {
            match difficulty.parse() {
                Ok(d) => draft.difficulty = d,
                Err(_) => warn!(
                    row = line_num + 2,
                    difficulty, "unknown difficulty, using default"
                ),
            }
        }
        draft.prep_time = field(idx_prep).and_then(leading_int).unwrap_or(0);
        draft.cook_time = field(idx_cook).and_then(leading_int).unwrap_or(0);
        draft.servings = field(idx_servings)
            .and_then(leading_int)
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_SERVINGS);
        draft.rating = field(idx_rating)
            .and_then(|v| v.parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0);
        if let Some(ingredients) = field(idx_ingredients) {
            draft.ingredients = split_list(ingredients, ';');
        }
        if let Some(instructions) = field(idx_instructions) {
            draft.instructions = split_list(instructions, '|');
        }

        drafts.push(draft);
    }

    drafts
}

fn split_list(value: &str, separator: char) -> Vec<String> {
    value
        .split(separator)
        .map(|piece| piece.trim().to_string())
        .collect()
}

/// Parse the leading run of ASCII digits, so `"15 min"` reads as 15.
fn leading_int(value: &str) -> Option<u32> {
    let end = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    value[..end].parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn sample_recipe() -> Recipe {
        Recipe {
            id: "1".to_string(),
            title: "Classic French Onion Soup".to_string(),
            description: "He said, \"wow\"".to_string(),
            image: "/images/onion-soup.jpg".to_string(),
            prep_time: 20,
            cook_time: 60,
            servings: 6,
            difficulty: Difficulty::Medium,
            category: "Soup".to_string(),
            ingredients: vec![
                "4 large onions, thinly sliced".to_string(),
                "4 tablespoons butter".to_string(),
            ],
            instructions: vec![
                "Melt butter.".to_string(),
                "Caramelize the onions, about 45 minutes.".to_string(),
            ],
            rating: 4.9,
            rating_count: 89,
            is_bookmarked: true,
            created_at: "2024-01-10".to_string(),
        }
    }

    #[test]
    fn test_to_csv_header_only() {
        assert_eq!(
            to_csv(&[]),
            "Title,Description,Category,Difficulty,Prep Time (min),Cook Time (min),Servings,Rating,Ingredients,Instructions"
        );
    }

    #[test]
    fn test_to_csv_quotes_text_columns() {
        let csv = to_csv(&[sample_recipe()]);
        let row = csv.lines().nth(1).unwrap();
        assert_eq!(
            row,
            "\"Classic French Onion Soup\",\"He said, \"\"wow\"\"\",Soup,medium,20,60,6,4.9,\
             \"4 large onions, thinly sliced; 4 tablespoons butter\",\
             \"Melt butter. | Caramelize the onions, about 45 minutes.\""
        );
        assert!(!csv.ends_with('\n'));
    }

    #[test]
    fn test_to_csv_whole_rating_has_no_decimal() {
        let mut recipe = sample_recipe();
        recipe.rating = 4.0;
        let csv = to_csv(&[recipe]);
        assert!(csv.contains(",6,4,\""));
    }

    #[test]
    fn test_split_csv_line_quotes() {
        let fields = split_csv_line(r#""He said, ""wow""",plain, spaced ,"""""#);
        assert_eq!(fields, vec!["He said, \"wow\"", "plain", "spaced", "\""]);
    }

    #[test]
    fn test_split_csv_line_unterminated_quote_runs_to_end() {
        let fields = split_csv_line(r#"a,"b,c"#);
        assert_eq!(fields, vec!["a", "b,c"]);
    }

    #[test]
    fn test_round_trip_preserves_content() {
        let original = sample_recipe();
        let drafts = parse_recipes_csv(&to_csv(std::slice::from_ref(&original)));
        assert_eq!(drafts.len(), 1);
        let d = &drafts[0];
        assert_eq!(d.title, original.title);
        assert_eq!(d.description, "He said, \"wow\"");
        assert_eq!(d.category, original.category);
        assert_eq!(d.difficulty, original.difficulty);
        assert_eq!(d.prep_time, original.prep_time);
        assert_eq!(d.cook_time, original.cook_time);
        assert_eq!(d.servings, original.servings);
        assert!((d.rating - original.rating).abs() < f64::EPSILON);
        assert_eq!(d.ingredients, original.ingredients);
        assert_eq!(d.instructions, original.instructions);
        // Identity and bookkeeping are not carried by the file.
        assert_ne!(d.id, original.id);
        assert_eq!(d.image, "/placeholder.svg");
    }

    #[test]
    fn test_parse_header_only_yields_nothing() {
        assert!(parse_recipes_csv(&to_csv(&[])).is_empty());
        assert!(parse_recipes_csv("").is_empty());
    }

    #[test]
    fn test_parse_skips_blank_lines_and_crlf() {
        let csv = "Title,Servings\r\nSoup,2\r\n   \r\n\r\nStew,3\r\n";
        let drafts = parse_recipes_csv(csv);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].title, "Soup");
        assert_eq!(drafts[1].servings, 3);
    }

    #[test]
    fn test_parse_header_order_and_case_do_not_matter() {
        let csv = " SERVINGS ,instructions,TITLE\n8,Mix | Bake,Bread";
        let drafts = parse_recipes_csv(csv);
        assert_eq!(drafts[0].title, "Bread");
        assert_eq!(drafts[0].servings, 8);
        assert_eq!(drafts[0].instructions, vec!["Mix", "Bake"]);
    }

    #[test]
    fn test_parse_missing_columns_take_defaults() {
        let drafts = parse_recipes_csv("Title,Rating\n,abc");
        let d = &drafts[0];
        assert_eq!(d.title, "Untitled Recipe");
        assert_eq!(d.description, "");
        assert_eq!(d.category, "Main Course");
        assert_eq!(d.difficulty, Difficulty::Medium);
        assert_eq!((d.prep_time, d.cook_time, d.servings), (0, 0, 4));
        assert!(d.rating.abs() < f64::EPSILON);
        assert!(d.ingredients.is_empty());
        assert!(d.instructions.is_empty());
    }

    #[test]
    fn test_parse_lenient_numbers() {
        let csv = "Prep Time (min),Cook Time (min),Servings,Difficulty\n15 min,-5,0,Impossible";
        let d = &parse_recipes_csv(csv)[0];
        assert_eq!(d.prep_time, 15);
        assert_eq!(d.cook_time, 0);
        assert_eq!(d.servings, 4);
        assert_eq!(d.difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_parse_assigns_unique_ids() {
        let drafts = parse_recipes_csv("Title\nA\nB");
        assert_eq!(drafts.len(), 2);
        assert_ne!(drafts[0].id, drafts[1].id);
    }

    #[test]
    fn test_multiline_quoted_field_is_not_joined() {
        // Known tolerance: the second physical line becomes its own row.
        let csv = "Title,Description\n\"Pie\",\"line one\nline two\"";
        let drafts = parse_recipes_csv(csv);
        assert_eq!(drafts.len(), 2);
        assert_eq!(drafts[0].description, "line one");
        assert_eq!(drafts[1].title, "line two");
    }

    #[test]
    fn test_export_is_readable_by_standard_csv_reader() {
        let mut second = sample_recipe();
        second.title = "Plain".to_string();
        second.ingredients.clear();
        let exported = to_csv(&[sample_recipe(), second]);

        let mut rdr = csv::ReaderBuilder::new().from_reader(exported.as_bytes());
        let headers = rdr.headers().unwrap().clone();
        assert_eq!(headers.len(), CSV_HEADERS.len());
        let records: Vec<csv::StringRecord> = rdr.records().map(Result::unwrap).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(&records[0][1], "He said, \"wow\"");
        assert_eq!(&records[1][0], "Plain");
        assert_eq!(&records[1][8], "");
    }
}
