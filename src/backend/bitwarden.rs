//! Adapter for the Bitwarden CLI (`bw`).

use anyhow::Result;
use async_trait::async_trait;

use super::{run_tool, BackendKind, SecretBackend};

pub struct BitwardenBackend {
    timeout_secs: u64,
}

impl BitwardenBackend {
    pub fn new(timeout_secs: u64) -> Self {
        BitwardenBackend { timeout_secs }
    }
}

#[async_trait]
impl SecretBackend for BitwardenBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Bitwarden
    }

    fn display_name(&self) -> &'static str {
        "Bitwarden"
    }

    async fn is_available(&self) -> bool {
        which::which("bw").is_ok()
    }

    async fn is_authenticated(&self) -> bool {
        // The vault must be unlocked, not merely logged in.
        let Some(output) = run_tool("bw", &["status"], self.timeout_secs).await else {
            return false;
        };
        serde_json::from_str::<serde_json::Value>(&output)
            .ok()
            .and_then(|v| v.get("status").and_then(|s| s.as_str()).map(String::from))
            .is_some_and(|status| status == "unlocked")
    }

    async fn resolve(&self, name: &str, backend_path: Option<&str>) -> Result<Option<String>> {
        let target = backend_path.unwrap_or(name);
        let output = run_tool("bw", &["get", "password", target], self.timeout_secs).await;

        Ok(output
            .map(|o| o.trim_end_matches('\n').to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn list(&self) -> Result<Option<Vec<String>>> {
        let Some(output) = run_tool("bw", &["list", "items"], self.timeout_secs).await else {
            return Ok(Some(Vec::new()));
        };

        let items: Vec<serde_json::Value> = match serde_json::from_str(&output) {
            Ok(items) => items,
            Err(_) => return Ok(Some(Vec::new())),
        };

        Ok(Some(
            items
                .iter()
                .filter_map(|item| item.get("name").and_then(|n| n.as_str()))
                .map(|s| s.to_string())
                .collect(),
        ))
    }

    fn setup_instructions(&self) -> &'static str {
        "Install the Bitwarden CLI (npm install -g @bitwarden/cli), then: bw login && bw unlock"
    }
}
