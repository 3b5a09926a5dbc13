//! Protocol adapters, one per camera firmware generation.
//!
//! Every adapter implements [`CameraAdapter`], so the controller can hold
//! whichever one matches the detected camera without knowing which it is.
//!
//! | | GR II | GR III / GR IIIx |
//! |---|---|---|
//! | Poll fetch | capture settings, overlaid | all properties |
//! | Events | capture settings, focus | + orientation, storage |
//! | Drive mode / self-timer | not supported | via `shootMode` |
//! | Display refresh | required after writes | not supported |
//! | Photo listing | not supported | supported |

mod gr2;
mod gr3;
mod session;

pub use gr2::Gr2Adapter;
pub use gr3::Gr3Adapter;
pub use session::Session;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Snapshot;
use crate::error::Result;
use crate::events::EventBus;
use crate::shoot_mode::{DriveMode, SelfTimer};
use crate::transport::Transport;

/// Recognized camera families.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum DeviceFamily {
    /// GR II (older firmware generation).
    Gr2,
    /// GR III.
    Gr3,
    /// GR IIIx: GR III protocol with its own dial.
    Gr3x,
}

impl DeviceFamily {
    /// Identify the family from the `model` property.
    pub fn from_model(model: &str) -> Option<Self> {
        let model = model.trim();
        let model = model.strip_prefix("RICOH ").unwrap_or(model);
        match model {
            "GR II" => Some(Self::Gr2),
            "GR III" => Some(Self::Gr3),
            "GR IIIx" => Some(Self::Gr3x),
            _ => None,
        }
    }

    pub const fn display_name(self) -> &'static str {
        match self {
            Self::Gr2 => "GR II",
            Self::Gr3 => "GR III",
            Self::Gr3x => "GR IIIx",
        }
    }

    /// Build the adapter for this family. The adapter starts disconnected
    /// and idle; call [`CameraAdapter::start_listening`] to begin polling.
    pub fn adapter(
        self,
        transport: Arc<dyn Transport>,
        poll_interval: Duration,
    ) -> Arc<dyn CameraAdapter> {
        match self {
            Self::Gr2 => Arc::new(Gr2Adapter::new(transport, poll_interval)),
            Self::Gr3 => Arc::new(Gr3Adapter::new(transport, poll_interval)),
            Self::Gr3x => Arc::new(Gr3Adapter::gr3x(transport, poll_interval)),
        }
    }
}

impl fmt::Display for DeviceFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

/// Capture-setting subset of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct CaptureSettings(Snapshot);

impl CaptureSettings {
    pub(crate) fn from_snapshot(snapshot: &Snapshot, keys: &[&str]) -> Self {
        Self(
            keys.iter()
                .filter_map(|&k| snapshot.get(k).map(|v| (k.to_string(), v.clone())))
                .collect(),
        )
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// String value of a setting, e.g. `av` -> `"2.8"`.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    pub fn as_map(&self) -> &Snapshot {
        &self.0
    }

    pub fn into_inner(self) -> Snapshot {
        self.0
    }
}

/// Requested photo size.
///
/// The GR II serves the same image for `Small` and `Large`; its firmware has
/// no separate large rendition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhotoSize {
    Thumbnail,
    Small,
    Large,
}

/// One directory of the camera's media listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhotoDir {
    pub name: String,
    #[serde(default)]
    pub files: Vec<String>,
}

pub(crate) fn photo_url(base: &str, dir: &str, file: &str, size: &str) -> String {
    format!("{base}/v1/photos/{dir}/{file}?size={size}")
}

/// Operations every adapter exposes, whatever the firmware generation.
///
/// Uniform operations are provided through the shared [`Session`];
/// generation-specific ones are implemented per adapter and fail with
/// `NotSupported` where the camera lacks the capability.
#[async_trait]
pub trait CameraAdapter: Send + Sync {
    fn family(&self) -> DeviceFamily;

    fn session(&self) -> &Session;

    // === Connection and cache ===

    fn events(&self) -> &EventBus {
        self.session().events()
    }

    fn is_connected(&self) -> bool {
        self.session().is_connected()
    }

    /// Last cached snapshot; `None` before the first successful poll.
    fn device_info(&self) -> Option<Arc<Snapshot>> {
        self.session().snapshot()
    }

    fn capture_settings(&self) -> Option<CaptureSettings> {
        self.session().capture_settings()
    }

    fn live_view_url(&self) -> String {
        self.session().live_view_url()
    }

    async fn get_status(&self) -> Result<Value> {
        self.session().get_status().await
    }

    // === Capture ===

    /// Lock focus at frame coordinates given in percent.
    async fn lock_focus(&self, x: f64, y: f64) -> Result<()> {
        self.session().lock_focus(x, y).await
    }

    /// Shoot, focusing at `at` first when given.
    async fn take_photo(&self, at: Option<(f64, f64)>) -> Result<()> {
        self.session().take_photo(at).await
    }

    async fn get_capture_settings(&self) -> Result<CaptureSettings> {
        self.session().get_capture_settings().await
    }

    async fn set_capture_settings(&self, settings: &Snapshot) -> Result<()>;

    // === Modes ===

    fn list_dial_modes(&self) -> &'static [&'static str];

    async fn set_dial_mode(&self, mode: &str) -> Result<()>;

    fn list_drive_modes(&self) -> Result<Vec<DriveMode>>;

    fn get_drive_mode(&self) -> Result<DriveMode>;

    fn list_self_timer_options(&self) -> Result<Vec<SelfTimer>>;

    fn get_self_timer_option(&self) -> Result<SelfTimer>;

    async fn set_shoot_mode(&self, drive: DriveMode, timer: SelfTimer) -> Result<()>;

    fn list_focus_modes(&self) -> Vec<String>;

    async fn set_focus_mode(&self, mode: &str) -> Result<()>;

    fn get_focus_setting(&self) -> Result<String>;

    async fn set_operation_mode(&self, mode: &str) -> Result<()>;

    // === Device ===

    async fn send_command(&self, command: &str) -> Result<Value> {
        self.session().send_command(command).await
    }

    async fn refresh_display(&self) -> Result<()>;

    async fn power_off(&self) -> Result<()> {
        self.session().power_off().await
    }

    // === Media ===

    async fn list_photos(&self) -> Result<Vec<PhotoDir>>;

    fn photo_url(&self, dir: &str, file: &str, size: PhotoSize) -> String;

    // === Polling ===

    fn start_listening(&self) {
        self.session().start_listening();
    }

    fn stop_listening(&self) {
        self.session().stop_listening();
    }

    fn is_listening(&self) -> bool {
        self.session().is_listening()
    }

    fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        self.session().set_poll_interval(interval)
    }

    fn set_poll_interval_temporarily(&self, interval: Duration, cycles: u32) -> Result<()> {
        self.session().set_poll_interval_temporarily(interval, cycles)
    }
}
