//! Local persistence: session state, per-device vote locks and fallback view
//! counters, all sharing one key-value medium.
//!
//! Every write is best-effort. A failing medium is logged and otherwise
//! ignored; in-memory session state stays authoritative for the run.

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use thiserror::Error;
use tracing::{debug, warn};

use crate::constants::constants;
use crate::video::VoteDirection;

#[derive(Debug, Error)]
pub enum StoreError {
  #[error("persistence write failed: {0}")]
  Io(#[from] std::io::Error),
  #[error("persistence encode failed: {0}")]
  Encode(#[from] serde_json::Error),
  #[error("persistence unavailable")]
  Unavailable,
}

/// String key-value medium. Reads never fail; writes may.
pub trait KeyValueStore {
  fn get(&self, key: &str) -> Option<String>;
  fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// In-memory medium. `fail_writes` simulates a full or unavailable store.
#[derive(Debug, Default)]
pub struct MemoryStore {
  entries: BTreeMap<String, String>,
  fail_writes: bool,
}

impl MemoryStore {
  /// A medium whose every write fails.
  #[cfg(test)]
  pub(crate) fn failing() -> Self {
    Self { fail_writes: true, ..Self::default() }
  }
}

impl KeyValueStore for MemoryStore {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.get(key).cloned()
  }

  fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
    if self.fail_writes {
      return Err(StoreError::Unavailable);
    }
    self.entries.insert(key.to_string(), value.to_string());
    Ok(())
  }
}

/// JSON file medium. The whole map is loaded once and rewritten on every set.
#[derive(Debug)]
pub struct FileStore {
  path: PathBuf,
  entries: BTreeMap<String, String>,
}

impl FileStore {
  pub fn open(path: PathBuf) -> Self {
    let entries = std::fs::read_to_string(&path)
      .ok()
      .and_then(|content| match serde_json::from_str(&content) {
        Ok(map) => Some(map),
        Err(e) => {
          warn!(path = %path.display(), err = %e, "storage: unreadable state file, starting empty");
          None
        }
      })
      .unwrap_or_default();
    Self { path, entries }
  }

  /// State file in the platform data directory, if one can be determined.
  pub fn default_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "rstube").map(|dirs| dirs.data_dir().join(&constants().state_file_name))
  }
}

impl KeyValueStore for FileStore {
  fn get(&self, key: &str) -> Option<String> {
    self.entries.get(key).cloned()
  }

  fn set(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
    let mut next = self.entries.clone();
    next.insert(key.to_string(), value.to_string());
    if let Some(dir) = self.path.parent() {
      std::fs::create_dir_all(dir)?;
    }
    std::fs::write(&self.path, serde_json::to_string_pretty(&next)?)?;
    self.entries = next;
    Ok(())
  }
}

/// Persisted session: last active video and last snapshotted position.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
  #[serde(rename = "lastId", default, skip_serializing_if = "Option::is_none")]
  pub last_id: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub t: Option<u64>,
}

pub struct LocalStore {
  medium: Box<dyn KeyValueStore>,
}

impl LocalStore {
  pub fn new(medium: Box<dyn KeyValueStore>) -> Self {
    Self { medium }
  }

  pub fn in_memory() -> Self {
    Self::new(Box::new(MemoryStore::default()))
  }

  // --- Session ---

  fn session_object(&self) -> serde_json::Map<String, serde_json::Value> {
    self
      .medium
      .get(&constants().session_key)
      .and_then(|raw| serde_json::from_str::<serde_json::Value>(&raw).ok())
      .and_then(|value| match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
      })
      .unwrap_or_default()
  }

  /// Stored session, or the default when missing or corrupt.
  pub fn load_session(&self) -> SessionState {
    serde_json::from_value(serde_json::Value::Object(self.session_object())).unwrap_or_default()
  }

  /// Merge `patch` over the stored session object. Fields the patch leaves
  /// unset, and keys this version does not know, are preserved.
  pub fn save_session(&mut self, patch: &SessionState) {
    let mut current = self.session_object();
    if let Ok(serde_json::Value::Object(fields)) = serde_json::to_value(patch) {
      current.extend(fields);
    }
    let encoded = serde_json::Value::Object(current).to_string();
    self.write(&constants().session_key, &encoded);
  }

  pub fn remember_last_id(&mut self, id: &str) {
    self.save_session(&SessionState { last_id: Some(id.to_string()), t: None });
  }

  pub fn remember_position(&mut self, secs: u64) {
    self.save_session(&SessionState { last_id: None, t: Some(secs) });
  }

  // --- Vote locks ---

  pub fn vote_lock(&self, id: &str) -> Option<VoteDirection> {
    self.medium.get(&vote_key(id)).and_then(|raw| VoteDirection::parse(&raw))
  }

  /// Write the lock for `id` unless one exists. Returns whether it was written.
  pub fn lock_vote(&mut self, id: &str, direction: VoteDirection) -> bool {
    if self.vote_lock(id).is_some() {
      return false;
    }
    self.write(&vote_key(id), direction.as_str())
  }

  // --- Fallback view counters ---

  pub fn fallback_views(&self, id: &str) -> Option<u64> {
    self.medium.get(&views_key(id)).and_then(|raw| raw.trim().parse().ok())
  }

  /// Increment and return the local count for `id`.
  pub fn increment_fallback_views(&mut self, id: &str) -> u64 {
    let next = self.fallback_views(id).unwrap_or(0) + 1;
    self.write(&views_key(id), &next.to_string());
    next
  }

  fn write(&mut self, key: &str, value: &str) -> bool {
    match self.medium.set(key, value) {
      Ok(()) => {
        debug!(key, "storage: wrote");
        true
      }
      Err(e) => {
        warn!(key, err = %e, "storage: write failed, skipping persistence");
        false
      }
    }
  }
}

fn vote_key(id: &str) -> String {
  format!("{}{}", constants().vote_key_prefix, id)
}

fn views_key(id: &str) -> String {
  format!("{}{}", constants().views_key_prefix, id)
}
