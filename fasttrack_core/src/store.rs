//! Key-value persistence with file locking.
//!
//! All tracker state lives behind string keys. The file-backed store keeps
//! the whole map in one JSON document and rewrites it atomically on every
//! mutation, with proper file locking to prevent concurrent access issues.

use crate::{Error, Result};
use fs2::FileExt;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Well-known store keys
pub mod keys {
    pub const FASTING_START_TIME: &str = "fastingStartTime";
    pub const IS_FASTING: &str = "isFasting";
    pub const FASTING_HISTORY: &str = "fastingHistory";
    pub const WEIGHT_HISTORY: &str = "weightHistory";
    pub const CALORIE_HISTORY: &str = "calorieHistory";
    pub const CALORIE_TARGET: &str = "calorieTarget";
    pub const FITBIT_TOKEN: &str = "fitbitToken";
    pub const FITBIT_REFRESH_TOKEN: &str = "fitbitRefreshToken";
    pub const FITBIT_TOKEN_EXPIRES: &str = "fitbitTokenExpires";
}

/// Synchronous string key-value storage
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
    fn remove(&mut self, key: &str) -> Result<()>;
}

/// Read a JSON value stored under `key`
///
/// Missing keys and unparseable values both yield `T::default()`; the
/// latter is logged as a warning.
pub fn load_json<T, S>(store: &S, key: &str) -> T
where
    T: DeserializeOwned + Default,
    S: KeyValueStore + ?Sized,
{
    let Some(raw) = store.get(key) else {
        return T::default();
    };

    match serde_json::from_str(&raw) {
        Ok(value) => value,
        Err(e) => {
            tracing::warn!("Failed to parse stored {:?}: {}. Treating as empty.", key, e);
            T::default()
        }
    }
}

/// Serialize `value` as JSON under `key`
pub fn save_json<T, S>(store: &mut S, key: &str, value: &T) -> Result<()>
where
    T: Serialize + ?Sized,
    S: KeyValueStore + ?Sized,
{
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// In-process store, lost when dropped
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// JSON-document store backed by a single file
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`, loading whatever is already there
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = read_entries(&path);
        Self { path, entries }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Discard the cached map and re-read the file
    ///
    /// Picks up changes made by other processes since `open`.
    pub fn reload(&mut self) {
        self.entries = read_entries(&self.path);
    }

    /// Write the whole map to disk
    ///
    /// Atomically writes the document by:
    /// 1. Writing to a temp file
    /// 2. Syncing to disk
    /// 3. Renaming over the original
    fn flush(&self) -> Result<()> {
        // Ensure parent directory exists
        let parent = self
            .path
            .parent()
            .ok_or_else(|| Error::Store(format!("store path {:?} has no parent", self.path)))?;
        std::fs::create_dir_all(parent)?;

        // Create unique temp file in the same directory for atomic rename
        let temp = NamedTempFile::new_in(parent)?;

        // Acquire exclusive lock on the temp file to serialize concurrent writers
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            let contents = serde_json::to_string(&self.entries)?;
            writer.write_all(contents.as_bytes())?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;

        // Atomically replace old store file
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} store entries to {:?}", self.entries.len(), self.path);
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

/// Load the map with a shared lock
///
/// Returns an empty map if the file doesn't exist.
/// If the file is corrupted, logs a warning and returns an empty map.
fn read_entries(path: &Path) -> BTreeMap<String, String> {
    if !path.exists() {
        tracing::info!("No store file found at {:?}, starting empty", path);
        return BTreeMap::new();
    }

    let file = match File::open(path) {
        Ok(f) => f,
        Err(e) => {
            tracing::warn!("Unable to open store file {:?}: {}. Starting empty.", path, e);
            return BTreeMap::new();
        }
    };

    // Acquire shared lock for reading
    if let Err(e) = file.lock_shared() {
        tracing::warn!("Unable to lock store file {:?}: {}. Starting empty.", path, e);
        return BTreeMap::new();
    }

    let mut contents = String::new();
    let mut reader = std::io::BufReader::new(&file);
    let read = reader.read_to_string(&mut contents);
    let _ = file.unlock();

    if let Err(e) = read {
        tracing::warn!("Failed to read store file {:?}: {}. Starting empty.", path, e);
        return BTreeMap::new();
    }

    match serde_json::from_str::<BTreeMap<String, String>>(&contents) {
        Ok(entries) => {
            tracing::debug!("Loaded {} store entries from {:?}", entries.len(), path);
            entries
        }
        Err(e) => {
            tracing::warn!("Failed to parse store file {:?}: {}. Starting empty.", path, e);
            BTreeMap::new()
        }
    }
}
