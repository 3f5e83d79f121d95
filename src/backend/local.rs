//! The local secret store exposed through the backend contract.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;

use super::{BackendKind, SecretBackend};
use crate::store::SecretStore;

pub struct LocalBackend {
    dir: PathBuf,
}

impl LocalBackend {
    pub fn new(dir: PathBuf) -> Self {
        LocalBackend { dir }
    }
}

#[async_trait]
impl SecretBackend for LocalBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    fn display_name(&self) -> &'static str {
        "Local store"
    }

    async fn is_available(&self) -> bool {
        true
    }

    async fn is_authenticated(&self) -> bool {
        // A corrupt store file reports unusable here; loading it directly
        // surfaces the corruption loudly instead.
        SecretStore::load(&self.dir).is_ok()
    }

    async fn resolve(&self, name: &str, _backend_path: Option<&str>) -> Result<Option<String>> {
        // The local store is keyed by placeholder name; a mapping path adds
        // nothing.
        let store = SecretStore::load(&self.dir)?;
        Ok(store.get(name).map(|v| v.to_string()))
    }

    async fn list(&self) -> Result<Option<Vec<String>>> {
        let store = SecretStore::load(&self.dir)?;
        Ok(Some(store.list().into_iter().map(|i| i.name).collect()))
    }

    fn setup_instructions(&self) -> &'static str {
        "Add secrets with: dotveil secret set <NAME>"
    }
}
