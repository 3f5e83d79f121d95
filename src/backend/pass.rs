//! Adapter for `pass`, the standard unix password store.

use anyhow::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use walkdir::WalkDir;

use super::{run_tool, BackendKind, SecretBackend};

pub struct PassBackend {
    timeout_secs: u64,
}

impl PassBackend {
    pub fn new(timeout_secs: u64) -> Self {
        PassBackend { timeout_secs }
    }

    fn store_dir() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("PASSWORD_STORE_DIR") {
            return Some(PathBuf::from(dir));
        }
        dirs::home_dir().map(|h| h.join(".password-store"))
    }
}

#[async_trait]
impl SecretBackend for PassBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Pass
    }

    fn display_name(&self) -> &'static str {
        "pass"
    }

    async fn is_available(&self) -> bool {
        which::which("pass").is_ok()
    }

    async fn is_authenticated(&self) -> bool {
        // pass has no session; an initialized store directory is as
        // authenticated as it gets (gpg prompts are its own business).
        Self::store_dir().is_some_and(|d| d.is_dir())
    }

    async fn resolve(&self, name: &str, backend_path: Option<&str>) -> Result<Option<String>> {
        let target = backend_path.unwrap_or(name);
        let output = run_tool("pass", &["show", target], self.timeout_secs).await;

        // First line only; further lines hold pass metadata.
        Ok(output
            .and_then(|o| o.lines().next().map(|l| l.to_string()))
            .filter(|v| !v.is_empty()))
    }

    async fn list(&self) -> Result<Option<Vec<String>>> {
        let Some(dir) = Self::store_dir().filter(|d| d.is_dir()) else {
            return Ok(Some(Vec::new()));
        };

        let mut names = Vec::new();
        for entry in WalkDir::new(&dir)
            .follow_links(false)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("gpg") {
                continue;
            }
            if let Ok(rel) = path.strip_prefix(&dir) {
                names.push(rel.with_extension("").display().to_string());
            }
        }
        names.sort();
        Ok(Some(names))
    }

    fn setup_instructions(&self) -> &'static str {
        "Install pass (https://www.passwordstore.org/) and initialize it with: pass init <gpg-id>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    #[tokio::test]
    #[serial]
    async fn test_store_dir_honors_env_override() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("PASSWORD_STORE_DIR", dir.path());

        let backend = PassBackend::new(2);
        assert!(backend.is_authenticated().await);

        std::fs::create_dir_all(dir.path().join("dotfiles")).unwrap();
        std::fs::write(dir.path().join("dotfiles").join("api-key.gpg"), b"x").unwrap();
        assert_eq!(
            backend.list().await.unwrap(),
            Some(vec!["dotfiles/api-key".to_string()])
        );

        std::env::remove_var("PASSWORD_STORE_DIR");
    }

    #[tokio::test]
    #[serial]
    async fn test_missing_store_dir_is_unauthenticated() {
        let dir = TempDir::new().unwrap();
        std::env::set_var("PASSWORD_STORE_DIR", dir.path().join("absent"));

        let backend = PassBackend::new(2);
        assert!(!backend.is_authenticated().await);

        std::env::remove_var("PASSWORD_STORE_DIR");
    }
}
