use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use super::KeyValueStore;
use crate::error::{Error, Result};

/// Key-value store persisted as one JSON object on disk.
///
/// Every write rewrites the file through a sibling temp file and a rename, so
/// a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
    guard: Arc<Mutex<()>>,
}

impl JsonFileStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self {
            path,
            guard: Arc::new(Mutex::new(())),
        };
        // Surface a corrupt file at open time rather than on first use.
        store.read_entries()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_entries(&self) -> Result<BTreeMap<String, String>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let raw = std::fs::read_to_string(&self.path)?;
        if raw.trim().is_empty() {
            return Ok(BTreeMap::new());
        }
        serde_json::from_str(&raw).map_err(|error| {
            Error::Storage(format!(
                "Failed to parse store at {}: {error}",
                self.path.display()
            ))
        })
    }

    fn write_entries(&self, entries: &BTreeMap<String, String>) -> Result<()> {
        let serialized = serde_json::to_string_pretty(entries)?;
        let temp_path = self.path.with_extension("json.tmp");
        std::fs::write(&temp_path, serialized)?;
        std::fs::rename(&temp_path, &self.path)?;
        Ok(())
    }

    fn update<R>(&self, apply: impl FnOnce(&mut BTreeMap<String, String>) -> R) -> Result<R> {
        let _guard = self
            .guard
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        let mut entries = self.read_entries()?;
        let result = apply(&mut entries);
        self.write_entries(&entries)?;
        Ok(result)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(self.read_entries()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.update(|entries| {
            entries.insert(key.to_string(), value.to_string());
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|entries| {
            entries.remove(key);
        })
    }

    fn keys(&self) -> Result<Vec<String>> {
        let _guard = self
            .guard
            .lock()
            .map_err(|error| Error::Storage(error.to_string()))?;
        Ok(self.read_entries()?.into_keys().collect())
    }
}
