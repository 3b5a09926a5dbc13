//! Config file location and `~` expansion.

use std::path::{Path, PathBuf};

use tracing::{debug, trace};

use crate::error::{CameraError, Result};

const APP_DIR: &str = "grctl";
const CONFIG_FILE: &str = "config.toml";

/// Expand a leading `~` to the user's home directory.
pub fn expand_home(path: &Path) -> Result<PathBuf> {
    trace!(path = %path.display(), "Resolving config path");

    let path_str = path.to_string_lossy();
    if path_str == "~" || path_str.starts_with("~/") {
        let home = home_dir()?;
        let rest = path_str.strip_prefix("~/").unwrap_or("");
        let resolved = if rest.is_empty() {
            home
        } else {
            home.join(rest)
        };
        debug!(
            original = %path.display(),
            resolved = %resolved.display(),
            "Expanded home directory path"
        );
        return Ok(resolved);
    }

    Ok(path.to_path_buf())
}

/// Resolve the user's home directory (cross-platform).
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or_else(|| {
        CameraError::ConfigInvalid("Could not determine home directory".to_string())
    })
}

/// Default config file, e.g. `~/.config/grctl/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
}
