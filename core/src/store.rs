use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::models::{Recipe, UserRating};
use crate::rating::RatingAggregate;

/// Everything the local catalog persists between runs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CatalogState {
    pub recipes: Vec<Recipe>,
    #[serde(default)]
    pub user_ratings: Vec<UserRating>,
    #[serde(default)]
    pub bookmarks: Vec<String>,
    /// Exact rating totals per recipe id. Recipes missing here derive their
    /// total from the displayed rating and count.
    #[serde(default)]
    pub rating_totals: BTreeMap<String, RatingAggregate>,
}

/// Load/save contract for the local catalog.
///
/// `load` returns `Ok(None)` when nothing has been saved yet.
pub trait CatalogStore: Send {
    fn load(&self) -> Result<Option<CatalogState>>;
    fn save(&self, state: &CatalogState) -> Result<()>;
}

/// Catalog state kept as a single JSON document on disk.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl CatalogStore for JsonFileStore {
    fn load(&self) -> Result<Option<CatalogState>> {
        if !self.path.exists() {
            return Ok(None);
        }
        let data = std::fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read catalog: {}", self.path.display()))?;
        let state: CatalogState = serde_json::from_str(&data)
            .with_context(|| format!("Corrupt catalog file: {}", self.path.display()))?;
        debug!(
            path = %self.path.display(),
            recipes = state.recipes.len(),
            "loaded catalog"
        );
        Ok(Some(state))
    }

    fn save(&self, state: &CatalogState) -> Result<()> {
        let data = serde_json::to_string_pretty(state)?;
        // Replace atomically.
        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, data)
            .with_context(|| format!("Failed to write catalog: {}", tmp.display()))?;
        std::fs::rename(&tmp, &self.path)
            .with_context(|| format!("Failed to replace catalog: {}", self.path.display()))?;
        debug!(path = %self.path.display(), "saved catalog");
        Ok(())
    }
}

/// Store that keeps the catalog in process memory only.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<Option<CatalogState>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_state(state: CatalogState) -> Self {
        Self {
            state: Mutex::new(Some(state)),
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> Option<CatalogState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

impl CatalogStore for MemoryStore {
    fn load(&self) -> Result<Option<CatalogState>> {
        Ok(self.snapshot())
    }

    fn save(&self, state: &CatalogState) -> Result<()> {
        *self
            .state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state.clone());
        Ok(())
    }
}
