//! GR III and GR IIIx adapter.
//!
//! The GR III reports everything on `/v1/props`, redraws its own display,
//! encodes drive mode and self-timer into a single `shootMode` string, and
//! treats focus mode as read-only.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};

use super::session::{PROPS_PATH, PollFetch, Profile, Session};
use super::{CameraAdapter, DeviceFamily, PhotoDir, PhotoSize, photo_url};
use crate::Snapshot;
use crate::error::{CameraError, Result};
use crate::events::EventKind;
use crate::shoot_mode::{self, DriveMode, SelfTimer};
use crate::transport::{Body, Transport};

const CAPTURE_KEYS: &[&str] = &[
    "av",
    "tv",
    "sv",
    "xv",
    "flashxv",
    "shootMode",
    "WBMode",
    "exposureMode",
    "meteringMode",
    "effect",
    "stillSize",
    "movieSize",
    "focusSetting",
    "ssid",
    "key",
    "channel",
];

static PROFILE: Profile = Profile {
    family: "GR III",
    status_path: "/v1/ping",
    capture_settings_path: PROPS_PATH,
    live_view_path: "/v1/liveview",
    poll_fetch: PollFetch::Full,
    excluded: &["datetime"],
    event_keys: &[
        (EventKind::CaptureSettingsChanged, CAPTURE_KEYS),
        (
            EventKind::FocusChanged,
            &["focusSetting", "focusMode", "focused", "focusPoint"],
        ),
        (EventKind::OrientationChanged, &["orientation"]),
        (EventKind::StorageChanged, &["storages"]),
    ],
    capture_keys: CAPTURE_KEYS,
};

const GR3_DIAL_MODES: &[&str] = &["P", "Av", "Tv", "M", "TAv", "U1", "U2", "U3", "Movie"];
const GR3X_DIAL_MODES: &[&str] = &["P", "Av", "Tv", "M", "TAv", "U1", "U2", "U3", "Movie", "Snap"];

const PHOTOS_PATH: &str = "/v1/photos";
const DEVICE_PARAMS_PATH: &str = "/v1/params/device";

#[derive(Deserialize)]
struct PhotoListing {
    #[serde(default)]
    dirs: Vec<PhotoDir>,
}

/// Adapter for the GR III and GR IIIx.
#[derive(Debug)]
pub struct Gr3Adapter {
    session: Arc<Session>,
    family: DeviceFamily,
    dial_modes: &'static [&'static str],
}

impl Gr3Adapter {
    pub fn new(transport: Arc<dyn Transport>, poll_interval: Duration) -> Self {
        Self {
            session: Session::new(transport, &PROFILE, poll_interval),
            family: DeviceFamily::Gr3,
            dial_modes: GR3_DIAL_MODES,
        }
    }

    /// GR IIIx variant; identical protocol, different dial.
    pub fn gr3x(transport: Arc<dyn Transport>, poll_interval: Duration) -> Self {
        Self {
            family: DeviceFamily::Gr3x,
            dial_modes: GR3X_DIAL_MODES,
            ..Self::new(transport, poll_interval)
        }
    }

    fn cached_shoot_mode(&self) -> Result<shoot_mode::ShootModeEntry> {
        let mode = self
            .session
            .cached_str("shootMode")
            .ok_or_else(|| CameraError::NotFound("no cached shootMode".to_string()))?;
        shoot_mode::decode(&mode)
            .ok_or_else(|| CameraError::NotFound(format!("unknown shoot mode: {mode}")))
    }
}

#[async_trait]
impl CameraAdapter for Gr3Adapter {
    fn family(&self) -> DeviceFamily {
        self.family
    }

    fn session(&self) -> &Session {
        &self.session
    }

    async fn set_capture_settings(&self, settings: &Snapshot) -> Result<()> {
        self.session.write_capture_settings(settings).await
    }

    fn list_dial_modes(&self) -> &'static [&'static str] {
        self.dial_modes
    }

    async fn set_dial_mode(&self, mode: &str) -> Result<()> {
        if !self.dial_modes.contains(&mode) {
            return Err(CameraError::invalid(format!("unknown dial mode: {mode}")));
        }
        let mut settings = Snapshot::new();
        settings.insert("exposureMode".to_string(), json!(mode));
        self.session.write_capture_settings(&settings).await
    }

    fn list_drive_modes(&self) -> Result<Vec<DriveMode>> {
        Ok(shoot_mode::drive_modes())
    }

    fn get_drive_mode(&self) -> Result<DriveMode> {
        self.cached_shoot_mode().map(|entry| entry.drive)
    }

    fn list_self_timer_options(&self) -> Result<Vec<SelfTimer>> {
        Ok(SelfTimer::ALL.to_vec())
    }

    fn get_self_timer_option(&self) -> Result<SelfTimer> {
        self.cached_shoot_mode().map(|entry| entry.timer)
    }

    async fn set_shoot_mode(&self, drive: DriveMode, timer: SelfTimer) -> Result<()> {
        let mut settings = Snapshot::new();
        settings.insert(
            "shootMode".to_string(),
            json!(shoot_mode::encode(drive, timer)),
        );
        self.session.write_capture_settings(&settings).await
    }

    /// The focus settings the camera itself advertises.
    fn list_focus_modes(&self) -> Vec<String> {
        self.session
            .snapshot()
            .and_then(|s| s.get("focusSettingList").cloned())
            .and_then(|v| match v {
                Value::Array(items) => Some(
                    items
                        .iter()
                        .filter_map(Value::as_str)
                        .map(str::to_string)
                        .collect(),
                ),
                _ => None,
            })
            .unwrap_or_default()
    }

    async fn set_focus_mode(&self, _mode: &str) -> Result<()> {
        Err(self.session.not_supported("set_focus_mode"))
    }

    fn get_focus_setting(&self) -> Result<String> {
        self.session
            .cached_str("focusSetting")
            .ok_or_else(|| CameraError::NotFound("no cached focusSetting".to_string()))
    }

    async fn set_operation_mode(&self, mode: &str) -> Result<()> {
        self.session
            .transport()
            .put(DEVICE_PARAMS_PATH, Body::form([("operationMode", mode)]))
            .await
            .map(drop)
    }

    /// The GR III redraws on its own and rejects explicit refreshes.
    async fn refresh_display(&self) -> Result<()> {
        Err(self.session.not_supported("refresh_display"))
    }

    async fn list_photos(&self) -> Result<Vec<PhotoDir>> {
        let value = self.session.transport().get(PHOTOS_PATH).await?;
        let listing: PhotoListing =
            serde_json::from_value(value).map_err(|e| CameraError::InvalidResponse {
                endpoint: PHOTOS_PATH.to_string(),
                reason: e.to_string(),
            })?;
        Ok(listing.dirs)
    }

    fn photo_url(&self, dir: &str, file: &str, size: PhotoSize) -> String {
        let size = match size {
            PhotoSize::Thumbnail => "thumb",
            PhotoSize::Small => "view",
            PhotoSize::Large => "full",
        };
        photo_url(self.session.transport().base_url(), dir, file, size)
    }
}
