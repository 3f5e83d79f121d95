//! Pluggable secret backends.
//!
//! A backend is a source of truth for resolving a placeholder name to its
//! real value: the local store, or an adapter around a third-party secret
//! manager's command-line tool (`op`, `bw`, `pass`). Adapters never throw
//! for "tool not installed" or "not signed in" - they report it through
//! `is_available`/`is_authenticated` and the resolver moves on.

mod bitwarden;
mod local;
pub mod mapping;
mod onepassword;
mod pass;
pub mod resolver;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::process::Stdio;
use std::str::FromStr;
use std::time::Duration;

use crate::cfg::Config;

pub use resolver::{ResolveOpts, Resolution, Resolver};

/// Identifier for a registered backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Local,
    OnePassword,
    Bitwarden,
    Pass,
}

impl BackendKind {
    pub const ALL: [BackendKind; 4] = [
        BackendKind::Local,
        BackendKind::OnePassword,
        BackendKind::Bitwarden,
        BackendKind::Pass,
    ];

    /// Stable identifier used in the mappings file and config.
    pub fn id(&self) -> &'static str {
        match self {
            BackendKind::Local => "local",
            BackendKind::OnePassword => "onepassword",
            BackendKind::Bitwarden => "bitwarden",
            BackendKind::Pass => "pass",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.id())
    }
}

impl FromStr for BackendKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" => Ok(BackendKind::Local),
            "onepassword" | "1password" | "op" => Ok(BackendKind::OnePassword),
            "bitwarden" | "bw" => Ok(BackendKind::Bitwarden),
            "pass" => Ok(BackendKind::Pass),
            _ => anyhow::bail!(
                "Unknown backend: {} (expected local, onepassword, bitwarden, or pass)",
                s
            ),
        }
    }
}

/// Contract every backend implements.
#[async_trait]
pub trait SecretBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    fn display_name(&self) -> &'static str;

    /// Is the backend's tooling present at all?
    async fn is_available(&self) -> bool;

    /// Is the backend currently usable (signed in, unlocked)?
    async fn is_authenticated(&self) -> bool;

    /// Resolve one placeholder name. `backend_path` is the mapping's opaque
    /// identifier for this backend; `Ok(None)` means "no value here", and is
    /// also what adapter-level failures (timeout, bad output) degrade to.
    async fn resolve(&self, name: &str, backend_path: Option<&str>) -> Result<Option<String>>;

    /// Names this backend can enumerate, or `None` when unsupported.
    async fn list(&self) -> Result<Option<Vec<String>>> {
        Ok(None)
    }

    /// Shown by `doctor` when the backend is not usable.
    fn setup_instructions(&self) -> &'static str;
}

/// One boxed instance per kind, constructed from explicit state (working
/// directory and config) rather than ambient globals.
pub struct BackendRegistry {
    backends: Vec<Box<dyn SecretBackend>>,
}

impl BackendRegistry {
    pub fn new(dir: &Path, config: &Config) -> Self {
        let timeout = config.secrets.subprocess_timeout_secs;
        BackendRegistry {
            backends: vec![
                Box::new(local::LocalBackend::new(dir.to_path_buf())),
                Box::new(onepassword::OnePasswordBackend::new(timeout)),
                Box::new(bitwarden::BitwardenBackend::new(timeout)),
                Box::new(pass::PassBackend::new(timeout)),
            ],
        }
    }

    /// Registry over an arbitrary backend set (tests).
    pub fn with_backends(backends: Vec<Box<dyn SecretBackend>>) -> Self {
        BackendRegistry { backends }
    }

    pub fn get(&self, kind: BackendKind) -> Option<&dyn SecretBackend> {
        self.backends
            .iter()
            .find(|b| b.kind() == kind)
            .map(|b| b.as_ref())
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn SecretBackend> {
        self.backends.iter().map(|b| b.as_ref())
    }
}

/// Run a backend CLI with a bounded timeout, capturing stdout.
///
/// Any failure mode - missing binary, timeout, non-zero exit - comes back as
/// `None`; callers decide whether that means unavailable, locked, or just
/// "no value for this name".
pub(crate) async fn run_tool(program: &str, args: &[&str], timeout_secs: u64) -> Option<String> {
    let fut = tokio::process::Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output();

    match tokio::time::timeout(Duration::from_secs(timeout_secs), fut).await {
        Ok(Ok(out)) if out.status.success() => {
            Some(String::from_utf8_lossy(&out.stdout).into_owned())
        }
        _ => None,
    }
}

/// Availability and authentication of one backend, for diagnostic display.
#[derive(Debug, Clone)]
pub struct BackendStatus {
    pub kind: BackendKind,
    pub display_name: &'static str,
    pub available: bool,
    pub authenticated: bool,
    pub is_default: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_parse() {
        assert_eq!("local".parse::<BackendKind>().unwrap(), BackendKind::Local);
        assert_eq!("op".parse::<BackendKind>().unwrap(), BackendKind::OnePassword);
        assert_eq!(
            "1Password".parse::<BackendKind>().unwrap(),
            BackendKind::OnePassword
        );
        assert_eq!("bw".parse::<BackendKind>().unwrap(), BackendKind::Bitwarden);
        assert_eq!("pass".parse::<BackendKind>().unwrap(), BackendKind::Pass);
        assert!("vault".parse::<BackendKind>().is_err());
    }

    #[test]
    fn test_backend_kind_id_roundtrip() {
        for kind in BackendKind::ALL {
            assert_eq!(kind.id().parse::<BackendKind>().unwrap(), kind);
        }
    }

    #[test]
    fn test_backend_kind_serde_wire_form() {
        assert_eq!(
            serde_json::to_string(&BackendKind::OnePassword).unwrap(),
            "\"onepassword\""
        );
        let kind: BackendKind = serde_json::from_str("\"pass\"").unwrap();
        assert_eq!(kind, BackendKind::Pass);
    }

    #[tokio::test]
    async fn test_run_tool_missing_binary_is_none() {
        assert_eq!(run_tool("dotveil-no-such-tool", &["--version"], 2).await, None);
    }
}
