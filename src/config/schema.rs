//! Camera connection settings.
//!
//! ```toml
//! host = "192.168.0.1"
//! request_timeout_ms = 1000
//! poll_interval_ms = 500
//! detect_interval_ms = 1000
//! auto_reconnect = true
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

use crate::error::{CameraError, Result};

/// Address the GR family listens on when its Wi-Fi is enabled.
pub const DEFAULT_HOST: &str = "192.168.0.1";

/// Connection and polling settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CameraConfig {
    /// Camera address (host or base URL).
    pub host: String,
    /// Per-request timeout.
    pub request_timeout_ms: u64,
    /// Adapter poll interval once a camera is detected.
    pub poll_interval_ms: u64,
    /// Probe interval while looking for a camera.
    pub detect_interval_ms: u64,
    /// Look for the camera again after it disconnects.
    pub auto_reconnect: bool,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            request_timeout_ms: 1000,
            poll_interval_ms: 500,
            detect_interval_ms: 1000,
            auto_reconnect: true,
        }
    }
}

impl CameraConfig {
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub const fn detect_interval(&self) -> Duration {
        Duration::from_millis(self.detect_interval_ms)
    }

    /// Check that the host is set and every duration is non-zero.
    pub fn validate(&self) -> Result<()> {
        trace!(host = %self.host, "Validating camera config");

        if self.host.trim().is_empty() {
            return Err(CameraError::ConfigInvalid("host must not be empty".to_string()));
        }

        for (name, value) in [
            ("request_timeout_ms", self.request_timeout_ms),
            ("poll_interval_ms", self.poll_interval_ms),
            ("detect_interval_ms", self.detect_interval_ms),
        ] {
            if value == 0 {
                return Err(CameraError::ConfigInvalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        debug!("Camera config validated");
        Ok(())
    }
}
