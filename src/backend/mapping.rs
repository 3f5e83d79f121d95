//! Persisted mappings from placeholder names to the backends that resolve
//! them.
//!
//! Wire format: `{ NAME: { backendId: backendPath | true } }`. A `true`
//! entry means "resolvable from that backend with no extra path" (the local
//! store case). Insertion order inside each name's object is the set-order;
//! the most recently set backend is preferred at resolution time.

use anyhow::{Context, Result};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use super::BackendKind;
use crate::fsutil;
use crate::placeholder;
use crate::store::StoreError;

pub const MAPPINGS_FILE: &str = "mappings.json";

/// One persisted association between a name and a backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendMapping {
    pub name: String,
    pub backend: BackendKind,
    /// Opaque identifier meaningful only to that backend.
    pub backend_path: Option<String>,
}

#[derive(Debug)]
pub struct MappingStore {
    path: PathBuf,
    entries: Map<String, Value>,
}

impl MappingStore {
    /// Load from `<dir>/mappings.json`; missing means empty, corrupt is an
    /// error, exactly like the secret store.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(MAPPINGS_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(MappingStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record that `name` resolves from `backend`. Re-setting an existing
    /// pair moves it to the end, making it the most recent. Returns the
    /// (possibly normalized) name actually used.
    pub fn set_mapping(
        &mut self,
        name: &str,
        backend: BackendKind,
        backend_path: Option<String>,
    ) -> Result<String, StoreError> {
        let name = placeholder::normalize_name(name)
            .ok_or_else(|| StoreError::InvalidName(name.to_string()))?;

        let slot = self
            .entries
            .entry(name.clone())
            .or_insert_with(|| Value::Object(Map::new()));
        if let Value::Object(map) = slot {
            // Remove-then-insert keeps the object ordered by recency.
            map.remove(backend.id());
            let value = match backend_path {
                Some(p) => Value::String(p),
                None => Value::Bool(true),
            };
            map.insert(backend.id().to_string(), value);
        }

        Ok(name)
    }

    /// Remove one `(name, backend)` pair. Returns whether it existed.
    pub fn remove_mapping(&mut self, name: &str, backend: BackendKind) -> bool {
        let Some(Value::Object(map)) = self.entries.get_mut(name) else {
            return false;
        };
        let removed = map.remove(backend.id()).is_some();
        if map.is_empty() {
            self.entries.remove(name);
        }
        removed
    }

    /// Candidate backends for a name, most-recently-set first.
    pub fn candidates_for(&self, name: &str) -> Vec<BackendMapping> {
        let Some(Value::Object(map)) = self.entries.get(name) else {
            return Vec::new();
        };

        map.iter()
            .rev()
            .filter_map(|(backend_id, value)| {
                let backend = BackendKind::from_str(backend_id).ok()?;
                let backend_path = match value {
                    Value::String(p) => Some(p.clone()),
                    _ => None,
                };
                Some(BackendMapping {
                    name: name.to_string(),
                    backend,
                    backend_path,
                })
            })
            .collect()
    }

    /// Every mapping, grouped by name in file order.
    pub fn list_mappings(&self) -> Vec<BackendMapping> {
        self.entries
            .keys()
            .flat_map(|name| {
                let mut per_name = self.candidates_for(name);
                per_name.reverse(); // set-order for display
                per_name
            })
            .collect()
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize mapping store")?;
        fsutil::atomic_write(&self.path, json.as_bytes())
    }
}
