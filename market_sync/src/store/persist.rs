//! Key-addressed persistence backends for the snapshot store.
//!
//! The store writes one JSON document under a fixed key after every merge and
//! reads it back once at start-up. Backends only move strings; the store owns
//! (de)serialization and swallows every error they return.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;
use market_common::{MarketConfig, Result};

/// Key under which the merged snapshot is persisted.
pub const CACHE_KEY: &str = "stock_cache_v1";

/// Minimal string key-value storage.
pub trait SnapshotPersistence: Send + Sync {
    /// Value stored under `key`, if any.
    fn load(&self, key: &str) -> Result<Option<String>>;
    /// Store `value` under `key`, replacing any previous value.
    fn save(&self, key: &str, value: &str) -> Result<()>;
    /// Delete `key`; deleting a missing key is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

impl<T: SnapshotPersistence + ?Sized> SnapshotPersistence for Arc<T> {
    fn load(&self, key: &str) -> Result<Option<String>> {
        (**self).load(key)
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        (**self).save(key, value)
    }

    fn remove(&self, key: &str) -> Result<()> {
        (**self).remove(key)
    }
}

/// One `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FilePersistence {
    dir: PathBuf,
}

impl FilePersistence {
    /// Use `dir`, created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the files.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl SnapshotPersistence for FilePersistence {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Persisted {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage; lost on exit.
#[derive(Debug, Default)]
pub struct MemoryPersistence {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryPersistence {
    /// Empty storage.
    pub fn new() -> Self {
        Self::default()
    }
}

impl SnapshotPersistence for MemoryPersistence {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.lock()?.get(key).cloned())
    }

    fn save(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .lock()?
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.entries.lock()?.remove(key);
        Ok(())
    }
}

/// File storage when `config.cache_dir` is set, memory otherwise.
pub fn persistence_for(config: &MarketConfig) -> Box<dyn SnapshotPersistence> {
    match &config.cache_dir {
        Some(dir) => Box::new(FilePersistence::new(dir.clone())),
        None => Box::new(MemoryPersistence::new()),
    }
}
