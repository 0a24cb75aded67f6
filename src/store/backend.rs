//! Persisted-store backend trait and implementations.
//!
//! This module provides the storage backends for Spyglass state:
//! - `FileBackend` - one JSON file per key under the data directory (default)
//! - `MemoryBackend` - in-process map, used by tests

use crate::Result;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

/// Trait for backends that persist string-serialized values by key.
///
/// Values are opaque strings to the backend; the typed layer above
/// serializes to and from JSON.
pub trait StoreBackend {
    /// Read the value for a key, if present.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write the value for a key, replacing any existing value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Remove a key. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;

    /// Get the storage location description (for display purposes).
    fn location(&self) -> String;
}

/// File-backed store: one file per key under a root directory.
pub struct FileBackend {
    root: PathBuf,
}

impl FileBackend {
    /// Create a backend rooted at the given directory, creating it if
    /// needed.
    pub fn new(root: PathBuf) -> Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    fn key_path(&self, key: &str) -> PathBuf {
        // Keys are short kebab-case identifiers; anything else is
        // flattened so a key can never escape the root.
        let safe: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' {
                    c
                } else {
                    '-'
                }
            })
            .collect();
        self.root.join(format!("{}.json", safe))
    }
}

impl StoreBackend for FileBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.key_path(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        fs::write(self.key_path(key), value)?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.key_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn location(&self) -> String {
        self.root.display().to_string()
    }
}

/// In-memory store for tests.
#[derive(Default)]
pub struct MemoryBackend {
    map: HashMap<String, String>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreBackend for MemoryBackend {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.map.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.map.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.map.remove(key);
        Ok(())
    }

    fn location(&self) -> String {
        "memory".to_string()
    }
}
