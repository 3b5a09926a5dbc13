//! Stable, adapter-independent entry point.
//!
//! The [`Controller`] probes the camera's fixed address until it recognizes
//! a model, builds the matching adapter, and re-emits every adapter event on
//! its own [`EventBus`]. Callers never touch the adapter directly.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;

use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, trace, warn};

use crate::Snapshot;
use crate::adapter::{CameraAdapter, CaptureSettings, DeviceFamily, PhotoDir, PhotoSize};
use crate::config::CameraConfig;
use crate::error::{CameraError, Result};
use crate::events::{EventBus, EventKind, ListenerId};
use crate::poller::Poller;
use crate::shoot_mode::{DriveMode, SelfTimer};
use crate::transport::{HttpTransport, Transport};

const PROBE_PATH: &str = "/v1/props";

/// Controller lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ControllerState {
    Unpaired,
    Detecting,
    Connected,
    Disconnected,
}

/// Timing options for the controller.
#[derive(Debug, Clone, Copy)]
pub struct ControllerOptions {
    pub poll_interval: Duration,
    pub detect_interval: Duration,
    /// Restart detection after the active adapter disconnects.
    pub auto_reconnect: bool,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(500),
            detect_interval: Duration::from_millis(1000),
            auto_reconnect: true,
        }
    }
}

impl From<&CameraConfig> for ControllerOptions {
    fn from(config: &CameraConfig) -> Self {
        Self {
            poll_interval: config.poll_interval(),
            detect_interval: config.detect_interval(),
            auto_reconnect: config.auto_reconnect,
        }
    }
}

struct Active {
    adapter: Arc<dyn CameraAdapter>,
    /// Forwarding listeners registered on the adapter's bus.
    forwards: Vec<(EventKind, ListenerId)>,
}

struct Inner {
    transport: Arc<dyn Transport>,
    options: ControllerOptions,
    events: EventBus,
    active: RwLock<Option<Active>>,
    state: Mutex<ControllerState>,
    detector: Poller,
    /// Bumped when detection is cancelled or an adapter is installed; probes
    /// that started under an older epoch discard their result.
    detect_epoch: AtomicU64,
}

/// Single object external callers use to control the camera.
pub struct Controller {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for Controller {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Controller")
            .field("state", &self.state())
            .field("family", &self.family())
            .finish_non_exhaustive()
    }
}

impl Controller {
    pub fn new(transport: Arc<dyn Transport>, options: ControllerOptions) -> Self {
        let inner = Arc::new_cyclic(|weak: &Weak<Inner>| {
            let weak = weak.clone();
            Inner {
                transport,
                options,
                events: EventBus::new(),
                active: RwLock::new(None),
                state: Mutex::new(ControllerState::Unpaired),
                detector: Poller::new(options.detect_interval, move || {
                    let inner = weak.upgrade();
                    async move {
                        if let Some(inner) = inner {
                            if let Err(e) = inner.detect().await {
                                trace!(error = %e, "No camera detected");
                            }
                        }
                    }
                }),
                detect_epoch: AtomicU64::new(0),
            }
        });
        Self { inner }
    }

    /// Controller talking HTTP to the configured camera address.
    pub fn from_config(config: &CameraConfig) -> Result<Self> {
        let transport = HttpTransport::new(&config.host, config.request_timeout())?;
        Ok(Self::new(Arc::new(transport), ControllerOptions::from(config)))
    }

    /// Events re-emitted from whichever adapter is active.
    pub fn events(&self) -> &EventBus {
        &self.inner.events
    }

    pub fn state(&self) -> ControllerState {
        *self.inner.lock_state()
    }

    /// Family of the active adapter.
    pub fn family(&self) -> Option<DeviceFamily> {
        self.inner.current().map(|a| a.family())
    }

    pub fn has_adapter(&self) -> bool {
        self.inner.current().is_some()
    }

    // === Detection ===

    /// Probe the camera periodically until an adapter is installed.
    /// No-op while an adapter is active.
    pub fn start_detection(&self) {
        self.inner.start_detection();
    }

    pub fn stop_detection(&self) {
        self.inner.cancel_detection();
        let mut state = self.inner.lock_state();
        if *state == ControllerState::Detecting {
            *state = ControllerState::Unpaired;
        }
    }

    /// Probe once, installing an adapter on success.
    pub async fn detect(&self) -> Result<DeviceFamily> {
        self.inner.detect().await
    }

    /// Stop detection and drop the active adapter, if any.
    pub fn shutdown(&self) {
        self.inner.cancel_detection();
        self.inner.teardown();
        *self.inner.lock_state() = ControllerState::Unpaired;
    }

    fn adapter(&self) -> Result<Arc<dyn CameraAdapter>> {
        self.inner.current().ok_or(CameraError::NotConnected)
    }

    // === Delegated operations ===

    pub fn is_connected(&self) -> bool {
        self.inner.current().is_some_and(|a| a.is_connected())
    }

    pub fn device_info(&self) -> Result<Option<Arc<Snapshot>>> {
        Ok(self.adapter()?.device_info())
    }

    pub fn capture_settings(&self) -> Result<Option<CaptureSettings>> {
        Ok(self.adapter()?.capture_settings())
    }

    pub fn live_view_url(&self) -> Result<String> {
        Ok(self.adapter()?.live_view_url())
    }

    pub async fn get_status(&self) -> Result<Value> {
        self.adapter()?.get_status().await
    }

    pub async fn lock_focus(&self, x: f64, y: f64) -> Result<()> {
        self.adapter()?.lock_focus(x, y).await
    }

    pub async fn take_photo(&self, at: Option<(f64, f64)>) -> Result<()> {
        self.adapter()?.take_photo(at).await
    }

    pub async fn get_capture_settings(&self) -> Result<CaptureSettings> {
        self.adapter()?.get_capture_settings().await
    }

    pub async fn set_capture_settings(&self, settings: &Snapshot) -> Result<()> {
        self.adapter()?.set_capture_settings(settings).await
    }

    pub fn list_dial_modes(&self) -> Result<&'static [&'static str]> {
        Ok(self.adapter()?.list_dial_modes())
    }

    pub async fn set_dial_mode(&self, mode: &str) -> Result<()> {
        self.adapter()?.set_dial_mode(mode).await
    }

    pub fn list_drive_modes(&self) -> Result<Vec<DriveMode>> {
        self.adapter()?.list_drive_modes()
    }

    pub fn get_drive_mode(&self) -> Result<DriveMode> {
        self.adapter()?.get_drive_mode()
    }

    pub fn list_self_timer_options(&self) -> Result<Vec<SelfTimer>> {
        self.adapter()?.list_self_timer_options()
    }

    pub fn get_self_timer_option(&self) -> Result<SelfTimer> {
        self.adapter()?.get_self_timer_option()
    }

    pub async fn set_shoot_mode(&self, drive: DriveMode, timer: SelfTimer) -> Result<()> {
        self.adapter()?.set_shoot_mode(drive, timer).await
    }

    pub fn list_focus_modes(&self) -> Result<Vec<String>> {
        Ok(self.adapter()?.list_focus_modes())
    }

    pub async fn set_focus_mode(&self, mode: &str) -> Result<()> {
        self.adapter()?.set_focus_mode(mode).await
    }

    pub fn get_focus_setting(&self) -> Result<String> {
        self.adapter()?.get_focus_setting()
    }

    pub async fn set_operation_mode(&self, mode: &str) -> Result<()> {
        self.adapter()?.set_operation_mode(mode).await
    }

    pub async fn send_command(&self, command: &str) -> Result<Value> {
        self.adapter()?.send_command(command).await
    }

    pub async fn refresh_display(&self) -> Result<()> {
        self.adapter()?.refresh_display().await
    }

    pub async fn power_off(&self) -> Result<()> {
        self.adapter()?.power_off().await
    }

    pub async fn list_photos(&self) -> Result<Vec<PhotoDir>> {
        self.adapter()?.list_photos().await
    }

    pub fn photo_url(&self, dir: &str, file: &str, size: PhotoSize) -> Result<String> {
        Ok(self.adapter()?.photo_url(dir, file, size))
    }

    pub fn start_listening(&self) -> Result<()> {
        self.adapter()?.start_listening();
        Ok(())
    }

    pub fn stop_listening(&self) -> Result<()> {
        self.adapter()?.stop_listening();
        Ok(())
    }

    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        self.adapter()?.set_poll_interval(interval)
    }

    pub fn set_poll_interval_temporarily(&self, interval: Duration, cycles: u32) -> Result<()> {
        self.adapter()?.set_poll_interval_temporarily(interval, cycles)
    }
}

impl Drop for Controller {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl Inner {
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn current(&self) -> Option<Arc<dyn CameraAdapter>> {
        self.active
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .as_ref()
            .map(|a| Arc::clone(&a.adapter))
    }

    fn start_detection(&self) {
        if self.current().is_some() {
            trace!("Adapter already active; not detecting");
            return;
        }
        info!("Looking for camera");
        *self.lock_state() = ControllerState::Detecting;
        self.detector.start();
    }

    fn cancel_detection(&self) {
        self.detector.stop();
        self.detect_epoch.fetch_add(1, Ordering::SeqCst);
    }

    async fn detect(self: &Arc<Self>) -> Result<DeviceFamily> {
        if let Some(adapter) = self.current() {
            return Ok(adapter.family());
        }

        let epoch = self.detect_epoch.load(Ordering::SeqCst);

        let props = self.transport.get(PROBE_PATH).await?;
        let model = props
            .get("model")
            .and_then(Value::as_str)
            .ok_or_else(|| CameraError::NotFound("model in device properties".to_string()))?;
        let family = DeviceFamily::from_model(model).ok_or_else(|| {
            warn!(model, "Unrecognized camera model");
            CameraError::NotFound(format!("adapter for model {model}"))
        })?;

        let mut slot = self
            .active
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        if let Some(active) = slot.as_ref() {
            // Another probe won the race.
            return Ok(active.adapter.family());
        }
        if self.detect_epoch.load(Ordering::SeqCst) != epoch {
            debug!(%family, "Detection cancelled while probing; discarding result");
            return Err(CameraError::NotConnected);
        }

        self.cancel_detection();
        let adapter = family.adapter(Arc::clone(&self.transport), self.options.poll_interval);
        let forwards = self.attach(&adapter);
        adapter.start_listening();
        *slot = Some(Active {
            adapter,
            forwards,
        });
        *self.lock_state() = ControllerState::Connected;
        drop(slot);

        info!(%family, "Camera detected");
        Ok(family)
    }

    /// Subscribe to the adapter's events: first the disconnect handler, then
    /// one forwarding listener per event kind.
    fn attach(self: &Arc<Self>, adapter: &Arc<dyn CameraAdapter>) -> Vec<(EventKind, ListenerId)> {
        let bus = adapter.events();

        let weak = Arc::downgrade(self);
        let disconnect = bus.once(EventKind::Disconnected, move |_| {
            if let Some(inner) = weak.upgrade() {
                inner.on_adapter_disconnected();
            }
        });

        let mut forwards = vec![(EventKind::Disconnected, disconnect)];
        for kind in EventKind::ALL {
            let weak = Arc::downgrade(self);
            let id = bus.subscribe(kind, move |event| {
                if let Some(inner) = weak.upgrade() {
                    inner.events.emit(event);
                }
            });
            forwards.push((kind, id));
        }
        debug!(listeners = forwards.len(), "Forwarding adapter events");
        forwards
    }

    fn teardown(&self) -> bool {
        let active = self
            .active
            .write()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .take();
        let Some(active) = active else {
            return false;
        };

        let bus = active.adapter.events();
        for (kind, id) in &active.forwards {
            if !bus.unsubscribe(*id) {
                trace!(event = %kind, "Listener already detached");
            }
        }
        active.adapter.stop_listening();
        true
    }

    fn on_adapter_disconnected(&self) {
        if !self.teardown() {
            return;
        }
        info!("Camera adapter released");
        *self.lock_state() = ControllerState::Disconnected;

        if self.options.auto_reconnect {
            self.start_detection();
        }
    }
}
