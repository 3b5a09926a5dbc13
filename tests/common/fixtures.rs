//! Camera payloads and temporary config files.

use std::path::{Path, PathBuf};

use gr::Snapshot;
use serde_json::{Value, json};
use tempfile::TempDir;

/// `/v1/props` as reported by a GR III at rest.
#[must_use]
pub fn gr3_props() -> Value {
    json!({
        "errCode": 200,
        "errMsg": "OK",
        "model": "RICOH GR III",
        "serialNo": "00012345",
        "firmwareVersion": "1.90",
        "datetime": "2024-05-01T10:00:00",
        "av": "2.8",
        "tv": "1/250",
        "sv": "200",
        "xv": "0.0",
        "exposureMode": "P",
        "shootMode": "single",
        "focusSetting": "af",
        "focusSettingList": ["af", "mf", "snap", "infinity"],
        "focused": false,
        "orientation": 0,
        "storages": [{"name": "SD1", "remain": 1200}]
    })
}

/// `/v1/props` as reported by a GR II.
#[must_use]
pub fn gr2_props() -> Value {
    json!({
        "errCode": 200,
        "errMsg": "OK",
        "model": "GR II",
        "serialNo": "00067890",
        "datetime": "2024-05-01T10:00:00",
        "av": "2.8",
        "tv": "1/250",
        "focusMode": "multiauto",
        "storages": [{"name": "SD1", "remain": 900}]
    })
}

/// Copy of `base` with `key` replaced.
#[must_use]
pub fn with(mut base: Value, key: &str, value: Value) -> Value {
    base[key] = value;
    base
}

/// Flat settings map for write operations.
#[must_use]
pub fn settings(pairs: &[(&str, Value)]) -> Snapshot {
    pairs
        .iter()
        .map(|(k, v)| ((*k).to_string(), v.clone()))
        .collect()
}

/// Config file in a temporary directory, removed on drop.
pub struct TestConfig {
    pub dir: TempDir,
    pub path: PathBuf,
}

impl TestConfig {
    /// # Panics
    ///
    /// Panics if the file cannot be written.
    #[must_use]
    pub fn with_content(content: &str) -> Self {
        let dir = TempDir::new().expect("Failed to create temp directory");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, content).expect("Failed to write config");
        Self { dir, path }
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
