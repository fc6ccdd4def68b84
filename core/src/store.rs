//! Local key-value persistence.
//!
//! Values are JSON documents. [`MemoryStore`] backs tests and throwaway
//! sessions; [`JsonFileStore`] keeps the whole map in one file on disk.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::{PuzzleError, PuzzleResult};

pub const PUZZLES_KEY: &str = "puzzles";
pub const LEADERBOARD_KEY_PREFIX: &str = "leaderboard:";
pub const LAST_PLAYER_NAME_KEY: &str = "last_player_name";
pub const LAST_PUZZLE_ID_KEY: &str = "last_puzzle_id";

pub trait KeyValueStore {
    fn get(&self, key: &str) -> PuzzleResult<Option<Value>>;
    fn set(&mut self, key: &str, value: Value) -> PuzzleResult<()>;
    fn remove(&mut self, key: &str) -> PuzzleResult<()>;
    fn keys(&self) -> PuzzleResult<Vec<String>>;
}

pub fn leaderboard_key(puzzle_id: &str) -> String {
    format!("{LEADERBOARD_KEY_PREFIX}{puzzle_id}")
}

/// Reads and decodes `key`. A value that no longer matches `T` is treated as
/// absent so one corrupt entry cannot lock the player out.
pub fn read_json<T, S>(store: &S, key: &str) -> PuzzleResult<Option<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let Some(value) = store.get(key)? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(err) => {
            warn!(key, error = %err, "ignoring malformed stored value");
            Ok(None)
        }
    }
}

/// Reads a JSON list at `key` one element at a time. Elements that no longer
/// decode are skipped with a warning and the rest are kept. A value that is
/// not a list at all is a storage error, so callers never write an empty list
/// over data they could not read.
pub fn read_json_list<T, S>(store: &S, key: &str) -> PuzzleResult<Vec<T>>
where
    T: DeserializeOwned,
    S: KeyValueStore + ?Sized,
{
    let items = match store.get(key)? {
        None => return Ok(Vec::new()),
        Some(Value::Array(items)) => items,
        Some(other) => {
            return Err(PuzzleError::Storage(format!(
                "{key}: expected a list, found {}",
                json_kind(&other)
            )))
        }
    };
    let mut decoded = Vec::with_capacity(items.len());
    for (position, item) in items.into_iter().enumerate() {
        match serde_json::from_value(item) {
            Ok(value) => decoded.push(value),
            Err(err) => warn!(key, position, error = %err, "skipping malformed list entry"),
        }
    }
    Ok(decoded)
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

pub fn write_json<T, S>(store: &mut S, key: &str, value: &T) -> PuzzleResult<()>
where
    T: Serialize,
    S: KeyValueStore + ?Sized,
{
    let encoded = serde_json::to_value(value)?;
    store.set(key, encoded)
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: BTreeMap<String, Value>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> PuzzleResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> PuzzleResult<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> PuzzleResult<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn keys(&self) -> PuzzleResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Whole-map JSON file. Every write rewrites the file through a sibling
/// temp file and a rename.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: BTreeMap<String, Value>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> PuzzleResult<Self> {
        let path = path.into();
        let entries = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            if raw.trim().is_empty() {
                BTreeMap::new()
            } else {
                serde_json::from_str(&raw).map_err(|err| {
                    PuzzleError::Storage(format!("{}: {err}", path.display()))
                })?
            }
        } else {
            BTreeMap::new()
        };
        debug!(path = %path.display(), keys = entries.len(), "opened store");
        Ok(Self { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self) -> PuzzleResult<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let raw = serde_json::to_string_pretty(&self.entries)?;
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, raw)?;
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> PuzzleResult<Option<Value>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Value) -> PuzzleResult<()> {
        self.entries.insert(key.to_string(), value);
        self.flush()
    }

    fn remove(&mut self, key: &str) -> PuzzleResult<()> {
        if self.entries.remove(key).is_some() {
            self.flush()?;
        }
        Ok(())
    }

    fn keys(&self) -> PuzzleResult<Vec<String>> {
        Ok(self.entries.keys().cloned().collect())
    }
}
