//! Adapter for the 1Password CLI (`op`).

use anyhow::Result;
use async_trait::async_trait;

use super::{run_tool, BackendKind, SecretBackend};

pub struct OnePasswordBackend {
    timeout_secs: u64,
}

impl OnePasswordBackend {
    pub fn new(timeout_secs: u64) -> Self {
        OnePasswordBackend { timeout_secs }
    }
}

#[async_trait]
impl SecretBackend for OnePasswordBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::OnePassword
    }

    fn display_name(&self) -> &'static str {
        "1Password"
    }

    async fn is_available(&self) -> bool {
        which::which("op").is_ok()
    }

    async fn is_authenticated(&self) -> bool {
        run_tool("op", &["whoami"], self.timeout_secs).await.is_some()
    }

    async fn resolve(&self, name: &str, backend_path: Option<&str>) -> Result<Option<String>> {
        let target = backend_path.unwrap_or(name);

        // An op:// secret reference addresses a field directly; anything
        // else is treated as an item whose password field we want.
        let output = if target.starts_with("op://") {
            run_tool("op", &["read", target], self.timeout_secs).await
        } else {
            run_tool(
                "op",
                &[
                    "item",
                    "get",
                    target,
                    "--fields",
                    "label=password",
                    "--reveal",
                ],
                self.timeout_secs,
            )
            .await
        };

        Ok(output
            .map(|o| o.trim_end_matches('\n').to_string())
            .filter(|v| !v.is_empty()))
    }

    async fn list(&self) -> Result<Option<Vec<String>>> {
        let Some(output) = run_tool(
            "op",
            &["item", "list", "--format", "json"],
            self.timeout_secs,
        )
        .await
        else {
            return Ok(Some(Vec::new()));
        };

        // Unexpected output shapes degrade to an empty listing rather than
        // an error.
        let items: Vec<serde_json::Value> = match serde_json::from_str(&output) {
            Ok(items) => items,
            Err(_) => return Ok(Some(Vec::new())),
        };

        Ok(Some(
            items
                .iter()
                .filter_map(|item| item.get("title").and_then(|t| t.as_str()))
                .map(|s| s.to_string())
                .collect(),
        ))
    }

    fn setup_instructions(&self) -> &'static str {
        "Install the 1Password CLI (https://developer.1password.com/docs/cli/) and sign in with: op signin"
    }
}
