//! GR II adapter.
//!
//! The GR II firmware reports capture settings on their own endpoint, drives
//! most mode changes through raw `/_gr` commands, and does not redraw its
//! display after a remote settings write unless told to.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::debug;

use super::session::{PollFetch, Profile, Session};
use super::{CameraAdapter, DeviceFamily, PhotoDir, PhotoSize, photo_url};
use crate::Snapshot;
use crate::error::{CameraError, Result};
use crate::events::EventKind;
use crate::shoot_mode::{DriveMode, SelfTimer};
use crate::transport::Transport;

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
    "focusMode",
    "ssid",
    "key",
    "channel",
];

const FOCUS_KEYS: &[&str] = &["focusMode", "focused", "focusPoint"];

static PROFILE: Profile = Profile {
    family: "GR II",
    status_path: "/v1/constants/device",
    capture_settings_path: "/v1/params/camera",
    live_view_path: "/v1/display",
    poll_fetch: PollFetch::Overlay("/v1/params/camera"),
    // The storage list carries a free-space counter the firmware rewrites on
    // every read.
    excluded: &["datetime", "storages"],
    event_keys: &[
        (EventKind::CaptureSettingsChanged, CAPTURE_KEYS),
        (EventKind::FocusChanged, FOCUS_KEYS),
    ],
    capture_keys: CAPTURE_KEYS,
};

const DIAL_MODES: &[&str] = &["P", "Av", "Tv", "M", "TAv", "U1", "U2", "Movie"];

/// Focus mode name -> command switching to it.
const FOCUS_MODES: &[(&str, &str)] = &[
    ("multiAuto", "cmd=mpset=FOCUS_MODE MULTI"),
    ("spot", "cmd=mpset=FOCUS_MODE SPOT"),
    ("pinpoint", "cmd=mpset=FOCUS_MODE PINPOINT"),
    ("tracking", "cmd=mpset=FOCUS_MODE TRACKING"),
    ("continuous", "cmd=mpset=FOCUS_MODE CONTINUOUS"),
    ("manual", "cmd=mpset=FOCUS_MODE MF"),
    ("snap", "cmd=mpset=FOCUS_MODE SNAP"),
    ("infinity", "cmd=mpset=FOCUS_MODE INFINITY"),
];

const REFRESH_COMMAND: &str = "cmd=mode refresh";

/// Adapter for the GR II.
#[derive(Debug)]
pub struct Gr2Adapter {
    session: Arc<Session>,
}

impl Gr2Adapter {
    pub fn new(transport: Arc<dyn Transport>, poll_interval: Duration) -> Self {
        Self {
            session: Session::new(transport, &PROFILE, poll_interval),
        }
    }
}

#[async_trait]
impl CameraAdapter for Gr2Adapter {
    fn family(&self) -> DeviceFamily {
        DeviceFamily::Gr2
    }

    fn session(&self) -> &Session {
        &self.session
    }

    async fn set_capture_settings(&self, settings: &Snapshot) -> Result<()> {
        self.session.write_capture_settings(settings).await?;
        self.refresh_display().await
    }

    fn list_dial_modes(&self) -> &'static [&'static str] {
        DIAL_MODES
    }

    async fn set_dial_mode(&self, mode: &str) -> Result<()> {
        if !DIAL_MODES.contains(&mode) {
            return Err(CameraError::invalid(format!("unknown dial mode: {mode}")));
        }
        self.session
            .send_command(&format!("cmd=bdial {mode}"))
            .await
            .map(drop)
    }

    fn list_drive_modes(&self) -> Result<Vec<DriveMode>> {
        Err(self.session.not_supported("list_drive_modes"))
    }

    fn get_drive_mode(&self) -> Result<DriveMode> {
        Err(self.session.not_supported("get_drive_mode"))
    }

    fn list_self_timer_options(&self) -> Result<Vec<SelfTimer>> {
        Err(self.session.not_supported("list_self_timer_options"))
    }

    fn get_self_timer_option(&self) -> Result<SelfTimer> {
        Err(self.session.not_supported("get_self_timer_option"))
    }

    async fn set_shoot_mode(&self, _drive: DriveMode, _timer: SelfTimer) -> Result<()> {
        Err(self.session.not_supported("set_shoot_mode"))
    }

    fn list_focus_modes(&self) -> Vec<String> {
        FOCUS_MODES.iter().map(|(name, _)| (*name).to_string()).collect()
    }

    async fn set_focus_mode(&self, mode: &str) -> Result<()> {
        let command = FOCUS_MODES
            .iter()
            .find(|(name, _)| *name == mode)
            .map(|(_, command)| *command)
            .ok_or_else(|| CameraError::invalid(format!("unknown focus mode: {mode}")))?;
        debug!(mode, "Switching focus mode");
        self.session.send_command(command).await.map(drop)
    }

    fn get_focus_setting(&self) -> Result<String> {
        Err(self.session.not_supported("get_focus_setting"))
    }

    async fn set_operation_mode(&self, _mode: &str) -> Result<()> {
        Err(self.session.not_supported("set_operation_mode"))
    }

    async fn refresh_display(&self) -> Result<()> {
        self.session.send_command(REFRESH_COMMAND).await.map(drop)
    }

    async fn list_photos(&self) -> Result<Vec<PhotoDir>> {
        Err(self.session.not_supported("list_photos"))
    }

    fn photo_url(&self, dir: &str, file: &str, size: PhotoSize) -> String {
        let size = match size {
            PhotoSize::Thumbnail => "thumb",
            PhotoSize::Small | PhotoSize::Large => "view",
        };
        photo_url(self.session.transport().base_url(), dir, file, size)
    }
}
