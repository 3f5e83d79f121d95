use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::backend::BackendKind;

pub const CONFIG_FILE: &str = "config.toml";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub secrets: SecretsConfig,

    #[serde(default)]
    pub scan: ScanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecretsConfig {
    /// Backend consulted for names with no explicit mapping.
    #[serde(default = "default_backend")]
    pub default_backend: BackendKind,

    /// Timeout for each backend CLI invocation.
    #[serde(default = "default_subprocess_timeout")]
    pub subprocess_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Gitignore-style patterns skipped when a directory is scanned.
    #[serde(default = "default_exclude_patterns")]
    pub exclude_patterns: Vec<String>,
}

impl Default for SecretsConfig {
    fn default() -> Self {
        SecretsConfig {
            default_backend: default_backend(),
            subprocess_timeout_secs: default_subprocess_timeout(),
        }
    }
}

impl Default for ScanConfig {
    fn default() -> Self {
        ScanConfig {
            exclude_patterns: default_exclude_patterns(),
        }
    }
}

fn default_backend() -> BackendKind {
    BackendKind::Local
}

fn default_subprocess_timeout() -> u64 {
    10
}

fn default_exclude_patterns() -> Vec<String> {
    vec![
        "**/.git/**".to_string(),
        "**/node_modules/**".to_string(),
        "**/target/**".to_string(),
        "**/dist/**".to_string(),
        "**/build/**".to_string(),
        "**/cache/**".to_string(),
        "**/Cache/**".to_string(),
        "**/.DS_Store".to_string(),
        "**/Thumbs.db".to_string(),
        "**/*.png".to_string(),
        "**/*.jpg".to_string(),
        "**/*.gif".to_string(),
        "**/*.zip".to_string(),
        "**/*.tar.*".to_string(),
    ]
}

fn config_path(dir: &Path) -> PathBuf {
    dir.join(CONFIG_FILE)
}

pub fn init(dir: &Path, force: bool) -> Result<()> {
    let path = config_path(dir);
    if path.exists() && !force {
        anyhow::bail!(
            "Config already exists at {}. Use --force to overwrite.",
            path.display()
        );
    }

    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create {}", dir.display()))?;

    let config = Config::default();
    save(dir, &config)?;

    Ok(())
}

pub fn load(dir: &Path) -> Result<Config> {
    let path = config_path(dir);
    if !path.exists() {
        anyhow::bail!(
            "Config not found at {}. Run 'dotveil init' first.",
            path.display()
        );
    }

    let contents = fs::read_to_string(&path).context("Failed to read config file")?;
    let config: Config = toml::from_str(&contents).context("Failed to parse config file")?;
    Ok(config)
}

/// Load the config, or fall back to defaults when the tool has not been
/// initialized. Read-only commands (scan, backends) stay usable either way.
pub fn load_or_default(dir: &Path) -> Result<Config> {
    if config_path(dir).exists() {
        load(dir)
    } else {
        Ok(Config::default())
    }
}

pub fn save(dir: &Path, config: &Config) -> Result<()> {
    let toml_string = toml::to_string_pretty(config).context("Failed to serialize config")?;
    fs::write(config_path(dir), toml_string).context("Failed to write config file")?;
    Ok(())
}

pub fn edit(dir: &Path) -> Result<()> {
    let editor = std::env::var("EDITOR").unwrap_or_else(|_| "vi".to_string());

    Command::new(editor)
        .arg(config_path(dir))
        .status()
        .context("Failed to open editor")?;

    Ok(())
}

pub fn check_exists(dir: &Path) -> Result<()> {
    if config_path(dir).exists() {
        Ok(())
    } else {
        anyhow::bail!("Config file not found")
    }
}
