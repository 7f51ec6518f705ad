//! Session store - the explicit persistence port for handoff keys
//!
//! Components never read or write persisted state ad hoc; they receive a
//! `&mut dyn SessionStore` at session boundaries (load, start, submit).

use crate::error::StoreError;
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Serialized question payload written by setup
pub const QUESTIONS_KEY: &str = "mocktest_questions";
/// Reserved answer map slot, only ever cleared
pub const ANSWERS_KEY: &str = "mocktest_answers";
/// End instant of the running attempt (RFC 3339)
pub const END_TIME_KEY: &str = "mocktest_endTime";
/// `"true"` once an attempt has been entered
pub const STARTED_KEY: &str = "mocktest_started";
/// Submission record consumed by the results flow
pub const SUBMISSION_KEY: &str = "postmocktest";

/// Keys scoped to a single attempt
pub const SESSION_KEYS: [&str; 4] = [QUESTIONS_KEY, ANSWERS_KEY, END_TIME_KEY, STARTED_KEY];

/// String-keyed persisted storage
pub trait SessionStore {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

/// Remove every attempt-scoped key
pub fn clear_session(store: &mut dyn SessionStore) -> Result<(), StoreError> {
    for key in SESSION_KEYS {
        store.remove(key)?;
    }
    Ok(())
}

// ============================================================================
// File store
// ============================================================================

/// JSON object on disk, cached in memory and rewritten on every mutation
pub struct FileStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl FileStore {
    /// Open the store at `path`; a missing file is an empty store
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw)?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened session store");
        Ok(Self { path, entries })
    }

    fn flush(&self) -> Result<(), StoreError> {
        let json = serde_json::to_string_pretty(&self.entries)?;
        let tmp = self.path.with_extension("tmp");
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(&tmp, json)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        self.flush()
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }
}

// ============================================================================
// Memory store
// ============================================================================

/// Non-persistent store, used by tests and dry runs
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.get(key).cloned()
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}
