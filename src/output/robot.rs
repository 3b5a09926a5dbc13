//! Robot mode JSON output.

use chrono::Utc;
use serde::Serialize;
use serde_json::{Value, json};
use tracing::{debug, instrument, trace, warn};

use super::{Output, VersionInfo};
use crate::adapter::PhotoDir;
use crate::error::CameraError;
use crate::events::CameraEvent;

/// JSON output for scripts. Documents are pretty-printed, events are one
/// line each.
#[derive(Debug, Default)]
pub struct RobotOutput;

impl RobotOutput {
    pub const fn new() -> Self {
        Self
    }

    fn print<T: Serialize + ?Sized>(data: &T) {
        match serde_json::to_string_pretty(data) {
            Ok(json) => println!("{json}"),
            Err(e) => warn!(error = %e, "Failed to serialize output"),
        }
    }

    fn print_line<T: Serialize + ?Sized>(data: &T) {
        match serde_json::to_string(data) {
            Ok(json) => {
                trace!(json_len = json.len(), "JSON line serialized");
                println!("{json}");
            }
            Err(e) => warn!(error = %e, "Failed to serialize event"),
        }
    }
}

/// Error envelope written to stderr.
pub fn error_json(error: &CameraError) -> Value {
    json!({
        "error": true,
        "message": error.to_string(),
        "suggestion": error.suggestion(),
        "recoverable": error.is_user_recoverable(),
    })
}

/// Event line with a receive timestamp.
pub fn event_json(event: &CameraEvent) -> Value {
    let mut value = serde_json::to_value(event).unwrap_or(Value::Null);
    if let Value::Object(map) = &mut value {
        map.insert("at".to_string(), Value::String(Utc::now().to_rfc3339()));
    }
    value
}

impl Output for RobotOutput {
    fn success(&self, message: &str) {
        debug!(message, "Robot: success");
        Self::print(&json!({ "success": true, "message": message }));
    }

    #[instrument(skip(self))]
    fn error(&self, error: &CameraError) {
        match serde_json::to_string_pretty(&error_json(error)) {
            Ok(json) => eprintln!("{json}"),
            Err(_) => eprintln!("{error}"),
        }
    }

    fn document(&self, _title: &str, value: &Value) {
        Self::print(value);
    }

    fn list(&self, _title: &str, items: &[String]) {
        Self::print(items);
    }

    fn url(&self, url: &str) {
        Self::print(&json!({ "url": url }));
    }

    fn event(&self, event: &CameraEvent) {
        Self::print_line(&event_json(event));
    }

    fn photos(&self, dirs: &[PhotoDir]) {
        Self::print(dirs);
    }

    fn version_info(&self, info: &VersionInfo) {
        Self::print(info);
    }
}
