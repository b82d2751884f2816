//! The recipe store and its persistence port.
//!
//! [`RecipeStore`] is the in-memory collection: it owns every [`Recipe`],
//! enforces that `image_front` is unique, and assigns ids. Reading and
//! writing the backing document goes through a [`StorePort`] so the
//! pipeline can run against the JSON file ([`JsonFileStore`]) or an
//! in-memory double ([`MemoryStore`]).
//!
//! The file format is a single object with a `recipes` array, pretty
//! printed with two-space indentation and rewritten in full on every save.

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::models::{ExtractedRecipe, Recipe};

/// Width of the zero-padded numeric id (`"001"`).
const ID_WIDTH: usize = 3;

/// All extracted recipes, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeStore {
    #[serde(default)]
    pub recipes: Vec<Recipe>,
}

impl RecipeStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.recipes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recipes.is_empty()
    }

    /// The dedup set: every `image_front` already recorded.
    pub fn processed_fronts(&self) -> HashSet<String> {
        self.recipes
            .iter()
            .map(|r| r.image_front.clone())
            .collect()
    }

    pub fn contains_front(&self, image_front: &str) -> bool {
        self.recipes.iter().any(|r| r.image_front == image_front)
    }

    pub fn get(&self, id: &str) -> Option<&Recipe> {
        self.recipes.iter().find(|r| r.id == id)
    }

    /// Id for the next appended record.
    ///
    /// One past the larger of the record count and the highest numeric id,
    /// so ids stay unique after records are removed or reordered by hand.
    pub fn next_id(&self) -> String {
        let highest = self
            .recipes
            .iter()
            .filter_map(|r| r.id.parse::<usize>().ok())
            .max()
            .unwrap_or(0);
        let next = highest.max(self.recipes.len()) + 1;
        format!("{:0width$}", next, width = ID_WIDTH)
    }

    /// Stamps `id`, `image_front` and `image_back` onto an extracted record
    /// and appends it.
    ///
    /// Fails without modifying the store if `image_front` is already present.
    pub fn append(
        &mut self,
        extracted: ExtractedRecipe,
        image_front: &str,
        image_back: &str,
    ) -> Result<&Recipe> {
        if self.contains_front(image_front) {
            bail!("recipe for {} already exists", image_front);
        }
        let id = self.next_id();
        self.recipes.push(extracted.into_recipe(
            id,
            image_front.to_string(),
            image_back.to_string(),
        ));
        Ok(&self.recipes[self.recipes.len() - 1])
    }

    /// Serialized form written to disk.
    pub fn to_pretty_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Where a [`RecipeStore`] is loaded from and saved to.
pub trait StorePort: Send + Sync {
    /// Human-readable location, used in log lines.
    fn describe(&self) -> String;

    /// Reads the whole store. Missing or malformed data is an error.
    fn load(&self) -> Result<RecipeStore>;

    /// Replaces the persisted store with `store`.
    fn save(&self, store: &RecipeStore) -> Result<()>;

    /// Directory that recorded image paths are relative to, if the store
    /// lives on disk.
    fn key_root(&self) -> Option<PathBuf> {
        None
    }
}

/// The JSON document on disk.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Writes an empty store unless the file already exists.
    ///
    /// Returns `true` when a new file was created.
    pub fn init(&self) -> Result<bool> {
        if self.path.exists() {
            // Refuse to treat a corrupt file as initialized.
            self.load()?;
            return Ok(false);
        }
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create directory: {}", parent.display())
                })?;
            }
        }
        self.save(&RecipeStore::new())?;
        Ok(true)
    }
}

impl StorePort for JsonFileStore {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&self) -> Result<RecipeStore> {
        let bytes = std::fs::read(&self.path)
            .with_context(|| format!("Failed to read store file: {}", self.path.display()))?;
        serde_json::from_slice(&bytes)
            .with_context(|| format!("Failed to parse store file: {}", self.path.display()))
    }

    fn save(&self, store: &RecipeStore) -> Result<()> {
        let json = store.to_pretty_json()?;
        std::fs::write(&self.path, json)
            .with_context(|| format!("Failed to write store file: {}", self.path.display()))
    }

    fn key_root(&self) -> Option<PathBuf> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => Some(parent.to_path_buf()),
            _ => Some(PathBuf::from(".")),
        }
    }
}

/// In-process store for tests.
///
/// Keeps the last saved snapshot and counts saves.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Debug, Default)]
struct MemoryState {
    snapshot: RecipeStore,
    saves: usize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_store(store: RecipeStore) -> Self {
        Self {
            state: Mutex::new(MemoryState {
                snapshot: store,
                saves: 0,
            }),
        }
    }

    pub fn snapshot(&self) -> RecipeStore {
        self.lock().snapshot.clone()
    }

    pub fn save_count(&self) -> usize {
        self.lock().saves
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A poisoned lock only means a test panicked mid-save; the data is
        // still a complete snapshot.
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl StorePort for MemoryStore {
    fn describe(&self) -> String {
        "memory".to_string()
    }

    fn load(&self) -> Result<RecipeStore> {
        Ok(self.lock().snapshot.clone())
    }

    fn save(&self, store: &RecipeStore) -> Result<()> {
        let mut state = self.lock();
        state.snapshot = store.clone();
        state.saves += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Nutrition;
    use tempfile::TempDir;

    fn extracted(title: &str) -> ExtractedRecipe {
        ExtractedRecipe {
            title: title.to_string(),
            ingredients: vec!["1 Onion".to_string()],
            nutrition: Nutrition::default(),
            tags: vec!["quick".to_string()],
        }
    }

    #[test]
    fn test_first_id_is_001() {
        assert_eq!(RecipeStore::new().next_id(), "001");
    }

    #[test]
    fn test_append_assigns_sequential_ids() {
        let mut store = RecipeStore::new();
        store
            .append(extracted("A"), "./images/a_front.webp", "./images/a_back.webp")
            .unwrap();
        let second = store
            .append(extracted("B"), "./images/b_front.webp", "./images/b_back.webp")
            .unwrap();
        assert_eq!(second.id, "002");
        assert_eq!(second.image_back, "./images/b_back.webp");
    }

    #[test]
    fn test_append_rejects_duplicate_front() {
        let mut store = RecipeStore::new();
        store
            .append(extracted("A"), "./images/a_front.webp", "./images/a_back.webp")
            .unwrap();
        let err = store
            .append(extracted("A again"), "./images/a_front.webp", "./images/a_back.webp")
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_next_id_skips_past_gaps() {
        let store = RecipeStore {
            recipes: vec![
                Recipe {
                    id: "001".to_string(),
                    image_front: "a".to_string(),
                    ..Default::default()
                },
                Recipe {
                    id: "007".to_string(),
                    image_front: "b".to_string(),
                    ..Default::default()
                },
            ],
        };
        assert_eq!(store.next_id(), "008");
    }

    #[test]
    fn test_next_id_ignores_non_numeric_ids() {
        let store = RecipeStore {
            recipes: vec![
                Recipe {
                    id: "abc".to_string(),
                    ..Default::default()
                },
                Recipe {
                    id: String::new(),
                    ..Default::default()
                },
            ],
        };
        assert_eq!(store.next_id(), "003");
    }

    #[test]
    fn test_json_file_roundtrip_is_pretty() {
        let tmp = TempDir::new().unwrap();
        let port = JsonFileStore::new(tmp.path().join("data.json"));
        let mut store = RecipeStore::new();
        store
            .append(extracted("Soup"), "./images/s_front.webp", "./images/s_back.webp")
            .unwrap();
        port.save(&store).unwrap();

        let text = std::fs::read_to_string(port.path()).unwrap();
        assert!(text.starts_with("{\n  \"recipes\": ["));
        assert_eq!(port.load().unwrap(), store);
    }

    #[test]
    fn test_load_missing_file_fails() {
        let tmp = TempDir::new().unwrap();
        let port = JsonFileStore::new(tmp.path().join("absent.json"));
        let err = port.load().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to read store file"));
    }

    #[test]
    fn test_load_corrupt_file_fails() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(&path, "{ not json").unwrap();
        let err = JsonFileStore::new(&path).load().unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to parse store file"));
    }

    #[test]
    fn test_load_tolerates_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("data.json");
        std::fs::write(&path, r#"{"recipes":[{"id":"001","title":"Old"}]}"#).unwrap();
        let store = JsonFileStore::new(&path).load().unwrap();
        assert_eq!(store.recipes[0].title, "Old");
        assert!(store.recipes[0].tags.is_empty());
        assert!(store.recipes[0].nutrition.is_empty());
    }

    #[test]
    fn test_init_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        let port = JsonFileStore::new(tmp.path().join("nested").join("data.json"));
        assert!(port.init().unwrap());
        assert!(!port.init().unwrap());
        assert!(port.load().unwrap().is_empty());
    }

    #[test]
    fn test_key_root_is_store_directory() {
        assert_eq!(
            JsonFileStore::new("/srv/cards/data.json").key_root(),
            Some(PathBuf::from("/srv/cards"))
        );
        assert_eq!(
            JsonFileStore::new("data.json").key_root(),
            Some(PathBuf::from("."))
        );
        assert_eq!(MemoryStore::new().key_root(), None);
    }

    #[test]
    fn test_memory_store_counts_saves() {
        let port = MemoryStore::new();
        let mut store = port.load().unwrap();
        store
            .append(extracted("A"), "a_front.webp", "a_back.webp")
            .unwrap();
        port.save(&store).unwrap();
        assert_eq!(port.save_count(), 1);
        assert_eq!(port.snapshot().len(), 1);
    }
}
