//! Loading camera settings from TOML and the environment.

use std::path::Path;

use tracing::{debug, info, instrument, trace};

use super::path::{default_config_path, expand_home};
use super::schema::CameraConfig;
use crate::error::{CameraError, Result};

/// Environment variable overriding the camera address.
pub const HOST_ENV: &str = "GR_HOST";

/// Load settings.
///
/// With an explicit `path` the file must exist. Without one, the default
/// location is read if present and defaults are used otherwise. `GR_HOST`
/// overrides the host in either case.
#[instrument(skip_all, fields(path = ?path.map(Path::display)))]
pub fn load_config(path: Option<&Path>) -> Result<CameraConfig> {
    let mut config = match path {
        Some(path) => load_config_file(&expand_home(path)?)?,
        None => match default_config_path() {
            Some(default) if default.is_file() => load_config_file(&default)?,
            _ => {
                debug!("No config file; using defaults");
                CameraConfig::default()
            }
        },
    };

    if let Ok(host) = std::env::var(HOST_ENV) {
        if !host.trim().is_empty() {
            debug!(%host, "Camera host overridden from environment");
            config.host = host;
        }
    }

    config.validate()?;
    Ok(config)
}

/// Read and parse one config file.
pub fn load_config_file(path: &Path) -> Result<CameraConfig> {
    info!(path = %path.display(), "Loading configuration file");

    let content = std::fs::read_to_string(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            CameraError::ConfigNotFound {
                path: path.display().to_string(),
            }
        } else {
            CameraError::Io(e)
        }
    })?;
    debug!(bytes = content.len(), "Read config file");

    load_config_from_str(&content)
}

/// Parse and validate TOML settings.
pub fn load_config_from_str(content: &str) -> Result<CameraConfig> {
    trace!("Parsing config content");
    let config: CameraConfig =
        toml::from_str(content).map_err(|e| CameraError::ConfigParse(format!("TOML: {e}")))?;
    config.validate()?;
    Ok(config)
}
