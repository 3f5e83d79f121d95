use anyhow::{Context, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Default working directory for dotveil state (config, stores).
pub fn default_dir() -> PathBuf {
    dirs::home_dir()
        .expect("Could not find home directory")
        .join(".dotveil")
}

/// Atomically replace the contents of `path`.
///
/// Writes to a sibling temporary file in the same directory, then renames it
/// over the target. The target is never observed partially written; on any
/// failure the temporary file is removed and the target is left untouched.
/// Existing file permissions are preserved.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

    tmp.write_all(contents)
        .and_then(|_| tmp.flush())
        .with_context(|| format!("Failed to write temporary file for {}", path.display()))?;

    if let Ok(meta) = fs::metadata(path) {
        fs::set_permissions(tmp.path(), meta.permissions())
            .with_context(|| format!("Failed to copy permissions onto {}", path.display()))?;
    }

    tmp.persist(path)
        .with_context(|| format!("Failed to replace {}", path.display()))?;

    Ok(())
}

/// Collapse the home directory prefix to `~` for display.
pub fn display_path(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(rest) = path.strip_prefix(&home) {
            if rest.as_os_str().is_empty() {
                return "~".to_string();
            }
            return format!("~/{}", rest.display());
        }
    }
    path.display().to_string()
}

/// Expand a user-supplied path (`~/...`) to an absolute path.
pub fn expand_user_path(raw: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(raw).to_string())
}
