//! The local secret store: a single persisted name-to-value map under the
//! tool's working directory, with owner-only file permissions.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::fsutil;
use crate::placeholder;

pub const STORE_FILE: &str = "secrets.json";

/// Errors a store file can produce. A corrupt file is distinct from a
/// missing one: missing means "empty store", corrupt must never be silently
/// treated as empty data loss.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read {path}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("{path} exists but is not valid JSON; refusing to treat it as empty")]
    Corrupt {
        path: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cannot derive a valid placeholder name from {0:?}")]
    InvalidName(String),
}

/// One stored secret. The value never leaves the store except through
/// `get`; listings return metadata only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredSecret {
    pub value: String,
    pub added_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_hint: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Metadata about a stored secret, safe to display.
#[derive(Debug, Clone)]
pub struct SecretInfo {
    pub name: String,
    pub added_at: DateTime<Utc>,
    pub source_hint: Option<String>,
    pub description: Option<String>,
}

/// Outcome of a `set`: the name actually used, and whether it had to be
/// coerced into the placeholder alphabet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetOutcome {
    pub name: String,
    pub normalized: bool,
}

#[derive(Debug)]
pub struct SecretStore {
    path: PathBuf,
    entries: BTreeMap<String, StoredSecret>,
}

impl SecretStore {
    /// Load the store from `<dir>/secrets.json`. A missing file is an empty
    /// store; an unparsable file is `StoreError::Corrupt`.
    pub fn load(dir: &Path) -> Result<Self, StoreError> {
        let path = dir.join(STORE_FILE);
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => serde_json::from_str(&raw).map_err(|source| StoreError::Corrupt {
                path: path.display().to_string(),
                source,
            })?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(source) => {
                return Err(StoreError::Io {
                    path: path.display().to_string(),
                    source,
                })
            }
        };
        Ok(SecretStore { path, entries })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Names and metadata only; values are never returned by listings.
    pub fn list(&self) -> Vec<SecretInfo> {
        self.entries
            .iter()
            .map(|(name, s)| SecretInfo {
                name: name.clone(),
                added_at: s.added_at,
                source_hint: s.source_hint.clone(),
                description: s.description.clone(),
            })
            .collect()
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(|s| s.value.as_str())
    }

    /// Store a value. Names outside the placeholder alphabet are coerced
    /// into it and the outcome reports the coercion; input with nothing
    /// usable in it is rejected.
    pub fn set(
        &mut self,
        name: &str,
        value: String,
        source_hint: Option<String>,
        description: Option<String>,
    ) -> Result<SetOutcome, StoreError> {
        let normalized = placeholder::normalize_name(name)
            .ok_or_else(|| StoreError::InvalidName(name.to_string()))?;
        let changed = normalized != name;

        self.entries.insert(
            normalized.clone(),
            StoredSecret {
                value,
                added_at: Utc::now(),
                source_hint,
                description,
            },
        );

        Ok(SetOutcome {
            name: normalized,
            normalized: changed,
        })
    }

    /// Remove a secret. Returns whether it existed.
    pub fn unset(&mut self, name: &str) -> bool {
        self.entries.remove(name).is_some()
    }

    /// Persist the store atomically with owner-only permissions.
    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }

        let json = serde_json::to_string_pretty(&self.entries)
            .context("Failed to serialize secret store")?;
        fsutil::atomic_write(&self.path, json.as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.path, fs::Permissions::from_mode(0o600))
                .with_context(|| format!("Failed to restrict {}", self.path.display()))?;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = SecretStore::load(dir.path()).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_corrupt_file_is_not_empty_store() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(STORE_FILE), "{not json").unwrap();

        match SecretStore::load(dir.path()) {
            Err(StoreError::Corrupt { .. }) => {}
            other => panic!("expected Corrupt, got {:?}", other),
        }
    }

    #[test]
    fn test_set_get_roundtrip_through_disk() {
        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        let outcome = store
            .set("STRIPE_KEY", "sk_live_abcdef1234567890".into(), None, None)
            .unwrap();
        assert!(!outcome.normalized);
        store.save().unwrap();

        let reloaded = SecretStore::load(dir.path()).unwrap();
        assert_eq!(reloaded.get("STRIPE_KEY"), Some("sk_live_abcdef1234567890"));
    }

    #[test]
    fn test_set_normalizes_and_reports() {
        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        let outcome = store.set("stripe key", "v".into(), None, None).unwrap();
        assert_eq!(outcome.name, "STRIPE_KEY");
        assert!(outcome.normalized);
        assert_eq!(store.get("STRIPE_KEY"), Some("v"));
    }

    #[test]
    fn test_set_rejects_unusable_name() {
        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        match store.set("---", "v".into(), None, None) {
            Err(StoreError::InvalidName(_)) => {}
            other => panic!("expected InvalidName, got {:?}", other),
        }
    }

    #[test]
    fn test_list_exposes_metadata_not_values() {
        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        store
            .set("KEY", "supersecret".into(), Some("scan".into()), None)
            .unwrap();

        let infos = store.list();
        assert_eq!(infos.len(), 1);
        assert_eq!(infos[0].name, "KEY");
        assert_eq!(infos[0].source_hint.as_deref(), Some("scan"));
    }

    #[test]
    fn test_unset() {
        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        store.set("KEY", "v".into(), None, None).unwrap();
        assert!(store.unset("KEY"));
        assert!(!store.unset("KEY"));
        assert_eq!(store.get("KEY"), None);
    }

    #[cfg(unix)]
    #[test]
    fn test_save_restricts_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let mut store = SecretStore::load(dir.path()).unwrap();
        store.set("KEY", "v".into(), None, None).unwrap();
        store.save().unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
