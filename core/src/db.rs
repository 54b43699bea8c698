use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;
use rusqlite::{Connection, OptionalExtension, params};
use tracing::debug;
use uuid::Uuid;

use crate::models::{DraftRecipe, NewRecipe, RatingRecord, Recipe};

pub struct Database {
    conn: Connection,
}

const RECIPE_COLUMNS: &str = "id, title, description, image, prep_time, cook_time, servings, \
     difficulty, category, ingredients, instructions, created_at";

impl Database {
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)
            .with_context(|| format!("Failed to open database: {}", path.display()))?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.migrate()?;
        Ok(db)
    }

    fn migrate(&self) -> Result<()> {
        let version: i64 = self
            .conn
            .pragma_query_value(None, "user_version", |row| row.get(0))?;

        if version < 1 {
            self.conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS recipes (
                    id TEXT PRIMARY KEY,
                    user_id TEXT,
                    title TEXT NOT NULL,
                    description TEXT NOT NULL DEFAULT '',
                    image TEXT,
                    prep_time INTEGER NOT NULL DEFAULT 0 CHECK (prep_time >= 0),
                    cook_time INTEGER NOT NULL DEFAULT 0 CHECK (cook_time >= 0),
                    servings INTEGER NOT NULL DEFAULT 4 CHECK (servings >= 1),
                    difficulty TEXT NOT NULL DEFAULT 'medium'
                        CHECK (difficulty IN ('easy', 'medium', 'hard')),
                    category TEXT NOT NULL,
                    ingredients TEXT NOT NULL DEFAULT '[]',
                    instructions TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                );

                CREATE TABLE IF NOT EXISTS ratings (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    user_id TEXT NOT NULL,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    rating INTEGER NOT NULL CHECK (rating BETWEEN 1 AND 5),
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    UNIQUE (user_id, recipe_id)
                );

                CREATE TABLE IF NOT EXISTS bookmarks (
                    user_id TEXT NOT NULL,
                    recipe_id TEXT NOT NULL REFERENCES recipes(id) ON DELETE CASCADE,
                    created_at TEXT NOT NULL,
                    PRIMARY KEY (user_id, recipe_id)
                );

                CREATE INDEX IF NOT EXISTS idx_recipes_created_at ON recipes(created_at);
                CREATE INDEX IF NOT EXISTS idx_ratings_recipe ON ratings(recipe_id);

                PRAGMA user_version = 1;",
            )?;
        }

        Ok(())
    }

    // --- Row mapping helpers ---

    // Expects RECIPE_COLUMNS order.
    fn recipe_from_row(row: &rusqlite::Row) -> rusqlite::Result<Recipe> {
        let difficulty: String = row.get(7)?;
        let ingredients: String = row.get(9)?;
        let instructions: String = row.get(10)?;
        Ok(Recipe {
            id: row.get(0)?,
            title: row.get(1)?,
            description: row.get(2)?,
            image: row.get::<_, Option<String>>(3)?.unwrap_or_default(),
            prep_time: row.get(4)?,
            cook_time: row.get(5)?,
            servings: row.get(6)?,
            difficulty: difficulty.parse().unwrap_or_default(),
            category: row.get(8)?,
            ingredients: decode_lines(&ingredients, 9)?,
            instructions: decode_lines(&instructions, 10)?,
            rating: 0.0,
            rating_count: 0,
            is_bookmarked: false,
            created_at: row.get(11)?,
        })
    }

    // --- Recipes ---

    /// Insert an already validated recipe owned by `user_id`.
    pub fn insert_recipe(&self, user_id: &str, recipe: &NewRecipe) -> Result<Recipe> {
        let now = Local::now().to_rfc3339();
        let id = Uuid::new_v4().to_string();
        self.conn.execute(
            "INSERT INTO recipes (id, user_id, title, description, image, prep_time, cook_time, servings, difficulty, category, ingredients, instructions, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                user_id,
                recipe.title,
                recipe.description,
                recipe.image,
                recipe.prep_time,
                recipe.cook_time,
                recipe.servings,
                recipe.difficulty.as_str(),
                recipe.category,
                serde_json::to_string(&recipe.ingredients)?,
                serde_json::to_string(&recipe.instructions)?,
                now,
                now,
            ],
        )?;
        self.get_recipe(&id)
    }

    /// Insert imported drafts in one transaction; either all land or none.
    pub fn insert_drafts(&self, user_id: Option<&str>, drafts: &[DraftRecipe]) -> Result<usize> {
        let tx = self.conn.unchecked_transaction()?;
        let now = Local::now().to_rfc3339();
        {
            let mut stmt = tx.prepare(
                "INSERT INTO recipes (id, user_id, title, description, image, prep_time, cook_time, servings, difficulty, category, ingredients, instructions, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            )?;
            for draft in drafts {
                stmt.execute(params![
                    draft.id,
                    user_id,
                    draft.title,
                    draft.description,
                    draft.image,
                    draft.prep_time,
                    draft.cook_time,
                    draft.servings,
                    draft.difficulty.as_str(),
                    draft.category,
                    serde_json::to_string(&draft.ingredients)?,
                    serde_json::to_string(&draft.instructions)?,
                    now,
                    now,
                ])
                .with_context(|| format!("Failed to import recipe '{}'", draft.title))?;
            }
        }
        tx.commit()?;
        debug!(count = drafts.len(), "inserted imported recipes");
        Ok(drafts.len())
    }

    pub fn get_recipe(&self, id: &str) -> Result<Recipe> {
        self.find_recipe(id)?
            .with_context(|| format!("Recipe '{id}' not found"))
    }

    pub fn find_recipe(&self, id: &str) -> Result<Option<Recipe>> {
        Ok(self
            .conn
            .query_row(
                &format!("SELECT {RECIPE_COLUMNS} FROM recipes WHERE id = ?1"),
                params![id],
                Self::recipe_from_row,
            )
            .optional()?)
    }

    /// All recipes, newest first.
    pub fn list_recipes(&self) -> Result<Vec<Recipe>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {RECIPE_COLUMNS} FROM recipes ORDER BY created_at DESC, rowid DESC"
        ))?;
        let recipes = stmt
            .query_map([], Self::recipe_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(recipes)
    }

    // --- Ratings ---

    pub fn list_ratings(&self) -> Result<Vec<RatingRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, recipe_id, rating FROM ratings")?;
        let ratings = stmt
            .query_map([], |row| {
                Ok(RatingRecord {
                    user_id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    rating: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    pub fn list_ratings_for_recipe(&self, recipe_id: &str) -> Result<Vec<RatingRecord>> {
        let mut stmt = self
            .conn
            .prepare("SELECT user_id, recipe_id, rating FROM ratings WHERE recipe_id = ?1")?;
        let ratings = stmt
            .query_map(params![recipe_id], |row| {
                Ok(RatingRecord {
                    user_id: row.get(0)?,
                    recipe_id: row.get(1)?,
                    rating: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ratings)
    }

    pub fn get_user_rating(&self, user_id: &str, recipe_id: &str) -> Result<Option<u8>> {
        Ok(self
            .conn
            .query_row(
                "SELECT rating FROM ratings WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                |row| row.get(0),
            )
            .optional()?)
    }

    /// Insert or replace the (user, recipe) rating row.
    pub fn upsert_rating(&self, user_id: &str, recipe_id: &str, rating: u8) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO ratings (user_id, recipe_id, rating, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(user_id, recipe_id) DO UPDATE SET rating = excluded.rating, updated_at = excluded.updated_at",
            params![user_id, recipe_id, rating, now, now],
        )?;
        debug!(user_id, recipe_id, rating, "upserted rating");
        Ok(())
    }

    // --- Bookmarks ---

    pub fn list_bookmarks(&self, user_id: &str) -> Result<Vec<String>> {
        let mut stmt = self
            .conn
            .prepare("SELECT recipe_id FROM bookmarks WHERE user_id = ?1 ORDER BY created_at")?;
        let ids = stmt
            .query_map(params![user_id], |row| row.get(0))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(ids)
    }

    pub fn is_bookmarked(&self, user_id: &str, recipe_id: &str) -> Result<bool> {
        let found: Option<i64> = self
            .conn
            .query_row(
                "SELECT 1 FROM bookmarks WHERE user_id = ?1 AND recipe_id = ?2",
                params![user_id, recipe_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    pub fn insert_bookmark(&self, user_id: &str, recipe_id: &str) -> Result<()> {
        let now = Local::now().to_rfc3339();
        self.conn.execute(
            "INSERT OR IGNORE INTO bookmarks (user_id, recipe_id, created_at) VALUES (?1, ?2, ?3)",
            params![user_id, recipe_id, now],
        )?;
        Ok(())
    }

    pub fn delete_bookmark(&self, user_id: &str, recipe_id: &str) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM bookmarks WHERE user_id = ?1 AND recipe_id = ?2",
            params![user_id, recipe_id],
        )?;
        Ok(deleted > 0)
    }
}

fn decode_lines(json: &str, column: usize) -> rusqlite::Result<Vec<String>> {
    serde_json::from_str(json).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(column, rusqlite::types::Type::Text, Box::new(e))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Difficulty;

    fn sample_recipe(title: &str) -> NewRecipe {
        NewRecipe {
            title: title.to_string(),
            description: "A weeknight staple.".to_string(),
            image: Some("https://example.com/a.jpg".to_string()),
            prep_time: 10,
            cook_time: 20,
            servings: 2,
            difficulty: Difficulty::Hard,
            category: "Soup".to_string(),
            ingredients: vec!["1 leek".to_string(), "2 potatoes".to_string()],
            instructions: vec!["Chop.".to_string(), "Simmer.".to_string()],
        }
    }

    #[test]
    fn test_insert_and_get_recipe() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe("alice", &sample_recipe("Leek Soup")).unwrap();

        assert_eq!(recipe.title, "Leek Soup");
        assert_eq!(recipe.difficulty, Difficulty::Hard);
        assert_eq!(recipe.image, "https://example.com/a.jpg");
        assert_eq!(recipe.ingredients, vec!["1 leek", "2 potatoes"]);
        assert_eq!(recipe.rating_count, 0);

        let fetched = db.get_recipe(&recipe.id).unwrap();
        assert_eq!(fetched, recipe);
    }

    #[test]
    fn test_get_missing_recipe() {
        let db = Database::open_in_memory().unwrap();
        let err = db.get_recipe("nope").unwrap_err();
        assert_eq!(err.to_string(), "Recipe 'nope' not found");
        assert!(db.find_recipe("nope").unwrap().is_none());
    }

    #[test]
    fn test_missing_image_reads_blank() {
        let db = Database::open_in_memory().unwrap();
        let mut new = sample_recipe("Plain");
        new.image = None;
        let recipe = db.insert_recipe("alice", &new).unwrap();
        assert_eq!(recipe.image, "");
    }

    #[test]
    fn test_list_recipes_newest_first() {
        let db = Database::open_in_memory().unwrap();
        db.insert_recipe("alice", &sample_recipe("First")).unwrap();
        db.insert_recipe("alice", &sample_recipe("Second")).unwrap();
        db.insert_recipe("alice", &sample_recipe("Third")).unwrap();

        let titles: Vec<String> = db
            .list_recipes()
            .unwrap()
            .into_iter()
            .map(|r| r.title)
            .collect();
        assert_eq!(titles, vec!["Third", "Second", "First"]);
    }

    #[test]
    fn test_insert_drafts() {
        let db = Database::open_in_memory().unwrap();
        let drafts = vec![
            DraftRecipe {
                title: "Pancakes".to_string(),
                ..DraftRecipe::default()
            },
            DraftRecipe::default(),
        ];
        assert_eq!(db.insert_drafts(Some("alice"), &drafts).unwrap(), 2);
        let pancakes = db.get_recipe(&drafts[0].id).unwrap();
        assert_eq!(pancakes.title, "Pancakes");
        assert_eq!(pancakes.image, "/placeholder.svg");
        assert_eq!(pancakes.servings, 4);
    }

    #[test]
    fn test_insert_drafts_is_all_or_nothing() {
        let db = Database::open_in_memory().unwrap();
        let first = DraftRecipe::default();
        let duplicate = first.clone();
        assert!(db.insert_drafts(None, &[first, duplicate]).is_err());
        assert!(db.list_recipes().unwrap().is_empty());
    }

    #[test]
    fn test_upsert_rating_replaces() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe("alice", &sample_recipe("Stew")).unwrap();

        db.upsert_rating("bob", &recipe.id, 2).unwrap();
        db.upsert_rating("bob", &recipe.id, 5).unwrap();
        db.upsert_rating("carol", &recipe.id, 3).unwrap();

        let ratings = db.list_ratings_for_recipe(&recipe.id).unwrap();
        assert_eq!(ratings.len(), 2);
        assert_eq!(db.get_user_rating("bob", &recipe.id).unwrap(), Some(5));
        assert_eq!(db.get_user_rating("dave", &recipe.id).unwrap(), None);
        assert_eq!(db.list_ratings().unwrap().len(), 2);
    }

    #[test]
    fn test_rating_out_of_range_rejected() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe("alice", &sample_recipe("Stew")).unwrap();
        assert!(db.upsert_rating("bob", &recipe.id, 6).is_err());
    }

    #[test]
    fn test_bookmarks() {
        let db = Database::open_in_memory().unwrap();
        let recipe = db.insert_recipe("alice", &sample_recipe("Stew")).unwrap();

        assert!(!db.is_bookmarked("bob", &recipe.id).unwrap());
        db.insert_bookmark("bob", &recipe.id).unwrap();
        db.insert_bookmark("bob", &recipe.id).unwrap();
        assert!(db.is_bookmarked("bob", &recipe.id).unwrap());
        assert_eq!(db.list_bookmarks("bob").unwrap(), vec![recipe.id.clone()]);
        assert!(db.list_bookmarks("alice").unwrap().is_empty());

        assert!(db.delete_bookmark("bob", &recipe.id).unwrap());
        assert!(!db.delete_bookmark("bob", &recipe.id).unwrap());
        assert!(db.list_bookmarks("bob").unwrap().is_empty());
    }

    #[test]
    fn test_open_file_database_twice() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cookbook.db");
        {
            let db = Database::open(&path).unwrap();
            db.insert_recipe("alice", &sample_recipe("Stew")).unwrap();
        }
        let db = Database::open(&path).unwrap();
        assert_eq!(db.list_recipes().unwrap().len(), 1);
    }
}
