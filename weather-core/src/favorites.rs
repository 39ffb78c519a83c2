use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
};

use crate::config::Config;

/// Where the favorites list lives. Rewritten wholesale on every change.
pub trait FavoritesStore: Send + Debug {
    fn load(&self) -> Result<Vec<String>>;
    fn save(&self, favorites: &[String]) -> Result<()>;
}

/// JSON array of strings in a single file.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store at the per-user data path.
    pub fn default_location() -> Result<Self> {
        Ok(Self::new(Config::favorites_file_path()?))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FavoritesStore for JsonFileStore {
    fn load(&self) -> Result<Vec<String>> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "favorites file does not exist yet");
            return Ok(Vec::new());
        }

        let contents = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read favorites file: {}", self.path.display()))?;

        let values: Vec<serde_json::Value> = serde_json::from_str(&contents)
            .with_context(|| format!("Invalid JSON in favorites file: {}", self.path.display()))?;

        // non-string entries are dropped, not fatal
        Ok(values
            .into_iter()
            .filter_map(|v| v.as_str().map(str::to_string))
            .collect())
    }

    fn save(&self, favorites: &[String]) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create data directory: {}", parent.display())
            })?;
        }

        let json =
            serde_json::to_string_pretty(favorites).context("Failed to serialize favorites")?;

        fs::write(&self.path, json)
            .with_context(|| format!("Failed to write favorites file: {}", self.path.display()))?;

        Ok(())
    }
}

/// What a successful mutation did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum FavoriteChange {
    Added(String),
    Removed(String),
    Reordered,
}

/// Ordered, case-insensitively unique list of location display strings.
#[derive(Debug)]
pub struct Favorites {
    items: Vec<String>,
    store: Box<dyn FavoritesStore>,
}

impl Favorites {
    /// Load from `store`. An unreadable store starts an empty list.
    pub fn load(store: Box<dyn FavoritesStore>) -> Self {
        let items = match store.load() {
            Ok(items) => {
                tracing::info!(count = items.len(), "favorites loaded");
                items
            }
            Err(e) => {
                tracing::warn!(error = %e, "could not load favorites, starting empty");
                Vec::new()
            }
        };

        Self { items, store }
    }

    pub fn list(&self) -> &[String] {
        &self.items
    }

    pub fn first(&self) -> Option<&str> {
        self.items.first().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn is_favorite(&self, name: &str) -> bool {
        self.position(name.trim()).is_some()
    }

    fn position(&self, name: &str) -> Option<usize> {
        let needle = name.to_lowercase();
        self.items.iter().position(|item| item.to_lowercase() == needle)
    }

    /// Add `name` (trimmed). Empty names and case-insensitive duplicates are
    /// logged no-ops and return `None`.
    pub fn add(&mut self, name: &str) -> Option<FavoriteChange> {
        let name = name.trim();

        if name.is_empty() {
            tracing::warn!("cannot add empty city name to favorites");
            return None;
        }

        if self.position(name).is_some() {
            tracing::warn!(city = name, "city already in favorites");
            return None;
        }

        self.items.push(name.to_string());
        self.persist();
        Some(FavoriteChange::Added(name.to_string()))
    }

    /// Remove the first case-insensitive match of `name` (trimmed).
    pub fn remove(&mut self, name: &str) -> Option<FavoriteChange> {
        let name = name.trim();

        let Some(index) = self.position(name) else {
            tracing::warn!(city = name, "city not found in favorites");
            return None;
        };

        self.items.remove(index);
        self.persist();
        Some(FavoriteChange::Removed(name.to_string()))
    }

    /// Replace the whole order. The caller is trusted: no permutation check.
    pub fn reorder(&mut self, new_order: Vec<String>) -> FavoriteChange {
        self.items = new_order;
        self.persist();
        FavoriteChange::Reordered
    }

    fn persist(&self) {
        match self.store.save(&self.items) {
            Ok(()) => tracing::info!(count = self.items.len(), "favorites saved"),
            Err(e) => tracing::warn!(error = %e, "failed to save favorites"),
        }
    }
}


#[cfg(test)]
mod tests {
    use super::testing::MemoryStore;
    use super::*;

    fn favorites(initial: &[&str]) -> (Favorites, MemoryStore) {
        let store = MemoryStore::with(initial);
        (Favorites::load(Box::new(store.clone())), store)
    }

    #[test]
    fn add_is_case_insensitively_unique() {
        let (mut favs, store) = favorites(&[]);

        assert_eq!(favs.add("Paris, FR"), Some(FavoriteChange::Added("Paris, FR".into())));
        assert_eq!(favs.add("paris, fr"), None);

        assert_eq!(favs.list(), ["Paris, FR"]);
        assert_eq!(store.saves.lock().len(), 1);
    }

    #[test]
    fn remove_matches_case_insensitively() {
        let (mut favs, store) = favorites(&["Paris, FR", "Berlin, DE"]);

        assert_eq!(favs.remove("PARIS, FR"), Some(FavoriteChange::Removed("PARIS, FR".into())));
        assert_eq!(favs.list(), ["Berlin, DE"]);
        assert_eq!(store.last_saved(), Some(vec!["Berlin, DE".to_string()]));
    }

    #[test]
    fn add_trims_and_rejects_empty() {
        let (mut favs, store) = favorites(&[]);

        assert_eq!(favs.add("   "), None);
        assert_eq!(favs.add("  Lisbon, PT "), Some(FavoriteChange::Added("Lisbon, PT".into())));
        assert!(favs.is_favorite(" lisbon, pt"));
        assert_eq!(store.saves.lock().len(), 1);
    }

    #[test]
    fn removing_unknown_is_noop() {
        let (mut favs, store) = favorites(&["Rome, IT"]);
        assert_eq!(favs.remove("Milan, IT"), None);
        assert_eq!(favs.len(), 1);
        assert!(store.saves.lock().is_empty());
    }

    #[test]
    fn reorder_replaces_wholesale() {
        let (mut favs, store) = favorites(&["A", "B"]);
        let order = vec!["B".to_string(), "C".to_string(), "A".to_string()];

        assert_eq!(favs.reorder(order.clone()), FavoriteChange::Reordered);
        assert_eq!(favs.list(), order.as_slice());
        assert_eq!(favs.first(), Some("B"));
        assert_eq!(store.last_saved(), Some(order));
    }

    #[test]
    fn json_store_roundtrips_through_disk() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(dir.path().join("data").join("favorites.json"));

        assert!(store.load().unwrap().is_empty());
        store.save(&["Berlin, DE".to_string(), "Oslo, NO".to_string()]).unwrap();

        let reloaded = Favorites::load(Box::new(store.clone()));
        assert_eq!(reloaded.list(), ["Berlin, DE", "Oslo, NO"]);
    }

    #[test]
    fn json_store_skips_non_strings() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        fs::write(&path, r#"["Berlin, DE", 3, null, "Oslo, NO"]"#).unwrap();

        assert_eq!(JsonFileStore::new(&path).load().unwrap(), vec!["Berlin, DE", "Oslo, NO"]);
    }

    #[test]
    fn corrupt_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("favorites.json");
        fs::write(&path, "{ not json").unwrap();

        assert!(JsonFileStore::new(&path).load().is_err());
        assert!(Favorites::load(Box::new(JsonFileStore::new(&path))).is_empty());
    }
}
