//! Connection state and the poll-and-diff cycle shared by every adapter.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde_json::Value;
use tracing::{debug, info, trace, warn};

use super::CaptureSettings;
use crate::Snapshot;
use crate::diff::{self, Differences};
use crate::error::{CameraError, Result};
use crate::events::{CameraEvent, EventBus, EventKeyMap, EventKind};
use crate::poller::Poller;
use crate::transport::{Body, Transport};

pub(crate) const PROPS_PATH: &str = "/v1/props";
pub(crate) const CAPTURE_SETTINGS_WRITE_PATH: &str = "/v1/params/camera";
pub(crate) const COMMAND_PATH: &str = "/_gr";
const FOCUS_LOCK_PATH: &str = "/v1/lens/focus/lock";
const SHOOT_PATH: &str = "/v1/camera/shoot";
const POWER_OFF_PATH: &str = "/v1/device/finish";

/// How a connected adapter refreshes its snapshot each tick.
#[derive(Debug, Clone, Copy)]
pub(crate) enum PollFetch {
    /// Fetch all properties.
    Full,
    /// Fetch capture settings from this path and overlay them on the cache.
    Overlay(&'static str),
}

/// Generation-specific wire details.
#[derive(Debug)]
pub(crate) struct Profile {
    pub family: &'static str,
    pub status_path: &'static str,
    pub capture_settings_path: &'static str,
    pub live_view_path: &'static str,
    pub poll_fetch: PollFetch,
    /// Keys that never produce change events.
    pub excluded: &'static [&'static str],
    pub event_keys: EventKeyMap,
    pub capture_keys: &'static [&'static str],
}

#[derive(Debug, Default)]
struct State {
    snapshot: Option<Arc<Snapshot>>,
    // Bumped on stop and on disconnect; ticks that started under an older
    // epoch discard their result.
    epoch: u64,
}

/// Live connection to one camera.
pub struct Session {
    transport: Arc<dyn Transport>,
    profile: &'static Profile,
    events: EventBus,
    state: Mutex<State>,
    poller: Poller,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("family", &self.profile.family)
            .field("connected", &self.is_connected())
            .field("poller", &self.poller)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub(crate) fn new(
        transport: Arc<dyn Transport>,
        profile: &'static Profile,
        poll_interval: Duration,
    ) -> Arc<Self> {
        Arc::new_cyclic(|weak: &Weak<Self>| {
            let weak = weak.clone();
            Self {
                transport,
                profile,
                events: EventBus::new(),
                state: Mutex::new(State::default()),
                poller: Poller::new(poll_interval, move || {
                    let session = weak.upgrade();
                    async move {
                        if let Some(session) = session {
                            session.tick().await;
                        }
                    }
                }),
            }
        })
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    pub(crate) const fn family(&self) -> &'static str {
        self.profile.family
    }

    pub(crate) fn transport(&self) -> &dyn Transport {
        self.transport.as_ref()
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn is_connected(&self) -> bool {
        self.lock().snapshot.is_some()
    }

    pub fn snapshot(&self) -> Option<Arc<Snapshot>> {
        self.lock().snapshot.clone()
    }

    pub fn capture_settings(&self) -> Option<CaptureSettings> {
        self.snapshot()
            .map(|s| CaptureSettings::from_snapshot(&s, self.profile.capture_keys))
    }

    /// Read a string field from the cached snapshot.
    pub(crate) fn cached_str(&self, key: &str) -> Option<String> {
        self.snapshot()?
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    }

    pub(crate) fn not_supported(&self, operation: &'static str) -> CameraError {
        CameraError::NotSupported {
            operation,
            family: self.profile.family,
        }
    }

    // === Polling ===

    pub fn start_listening(&self) {
        debug!(family = self.profile.family, "Start listening for camera events");
        self.poller.start();
    }

    pub fn stop_listening(&self) {
        debug!(family = self.profile.family, "Stop listening for camera events");
        self.poller.stop();
        self.lock().epoch += 1;
    }

    pub fn is_listening(&self) -> bool {
        self.poller.is_running()
    }

    pub fn set_poll_interval(&self, interval: Duration) -> Result<()> {
        self.poller.set_interval(interval)
    }

    pub fn set_poll_interval_temporarily(&self, interval: Duration, cycles: u32) -> Result<()> {
        self.poller.set_interval_temporarily(interval, cycles)
    }

    /// Run one poll cycle. Never fails: transport errors become a
    /// transition to disconnected.
    pub async fn tick(&self) {
        let (cached, epoch) = {
            let state = self.lock();
            (state.snapshot.clone(), state.epoch)
        };

        match cached {
            None => self.tick_disconnected(epoch).await,
            Some(previous) => self.tick_connected(&previous, epoch).await,
        }
    }

    async fn tick_disconnected(&self, epoch: u64) {
        let snapshot = match self.fetch_props().await {
            Ok(snapshot) => Arc::new(snapshot),
            Err(e) => {
                trace!(error = %e, "Camera still unreachable");
                return;
            }
        };

        {
            let mut state = self.lock();
            if state.epoch != epoch {
                trace!("Discarding stale connect result");
                return;
            }
            state.snapshot = Some(Arc::clone(&snapshot));
        }

        let model = snapshot.get("model").and_then(Value::as_str).unwrap_or("?");
        info!(family = self.profile.family, model, "Camera connected");
        self.events.emit(&CameraEvent::Connected { snapshot });
    }

    async fn tick_connected(&self, previous: &Arc<Snapshot>, epoch: u64) {
        let current = match self.fetch_for_poll(previous).await {
            Ok(current) => current,
            Err(e) => {
                {
                    let mut state = self.lock();
                    if state.epoch != epoch {
                        return;
                    }
                    state.snapshot = None;
                    state.epoch += 1;
                }
                warn!(error = %e, family = self.profile.family, "Camera disconnected");
                self.events.emit(&CameraEvent::Disconnected);
                return;
            }
        };

        let differences = diff::diff(previous, &current, self.profile.excluded);
        if differences.is_empty() {
            return;
        }

        let snapshot = Arc::new(current);
        {
            let mut state = self.lock();
            if state.epoch != epoch {
                trace!("Discarding stale poll result");
                return;
            }
            state.snapshot = Some(Arc::clone(&snapshot));
        }

        debug!(changed = differences.count(), "Camera state changed");
        self.dispatch(&snapshot, differences);
    }

    fn dispatch(&self, snapshot: &Arc<Snapshot>, differences: Differences) {
        let differences = Arc::new(differences);
        for &(kind, keys) in self.profile.event_keys {
            if !diff::any_changed(Some(keys), Some(&differences)) {
                continue;
            }
            if let Some(event) =
                CameraEvent::changed(kind, Arc::clone(snapshot), Arc::clone(&differences))
            {
                self.events.emit(&event);
            }
        }
    }

    fn supports(&self, kind: EventKind) -> bool {
        self.profile.event_keys.iter().any(|(k, _)| *k == kind)
    }

    /// Event kinds this generation can emit.
    pub fn event_kinds(&self) -> Vec<EventKind> {
        EventKind::ALL
            .into_iter()
            .filter(|&k| matches!(k, EventKind::Connected | EventKind::Disconnected) || self.supports(k))
            .collect()
    }

    // === Requests ===

    pub(crate) async fn fetch_props(&self) -> Result<Snapshot> {
        into_snapshot(PROPS_PATH, self.transport.get(PROPS_PATH).await?)
    }

    async fn fetch_for_poll(&self, previous: &Snapshot) -> Result<Snapshot> {
        match self.profile.poll_fetch {
            PollFetch::Full => self.fetch_props().await,
            PollFetch::Overlay(path) => {
                let params = into_snapshot(path, self.transport.get(path).await?)?;
                let mut merged = previous.clone();
                merged.extend(params);
                Ok(merged)
            }
        }
    }

    pub async fn get_status(&self) -> Result<Value> {
        self.transport.get(self.profile.status_path).await
    }

    pub fn live_view_url(&self) -> String {
        format!("{}{}", self.transport.base_url(), self.profile.live_view_path)
    }

    pub async fn get_capture_settings(&self) -> Result<CaptureSettings> {
        let path = self.profile.capture_settings_path;
        let snapshot = into_snapshot(path, self.transport.get(path).await?)?;
        Ok(CaptureSettings::from_snapshot(&snapshot, self.profile.capture_keys))
    }

    pub(crate) async fn write_capture_settings(&self, settings: &Snapshot) -> Result<()> {
        if settings.is_empty() {
            return Err(CameraError::invalid("no capture settings to write"));
        }
        let body = Body::form(settings.iter().map(|(k, v)| (k.clone(), wire_value(v))));
        self.transport
            .put(CAPTURE_SETTINGS_WRITE_PATH, body)
            .await
            .map(drop)
    }

    pub async fn lock_focus(&self, x: f64, y: f64) -> Result<()> {
        let pos = point(x, y)?;
        self.transport
            .post(FOCUS_LOCK_PATH, Body::form([("pos", pos)]))
            .await
            .map(drop)
    }

    pub async fn take_photo(&self, at: Option<(f64, f64)>) -> Result<()> {
        let body = match at {
            Some((x, y)) => Body::form([("af", "on".to_string()), ("pos", point(x, y)?)]),
            None => Body::form([("af", "camera")]),
        };
        self.transport.post(SHOOT_PATH, body).await.map(drop)
    }

    pub async fn send_command(&self, command: &str) -> Result<Value> {
        trace!(command, "Sending raw command");
        self.transport
            .post(COMMAND_PATH, Body::Raw(command.to_string()))
            .await
    }

    pub async fn power_off(&self) -> Result<()> {
        info!(family = self.profile.family, "Powering off camera");
        self.transport.post(POWER_OFF_PATH, Body::Empty).await.map(drop)
    }
}

/// Validate frame coordinates (percent) and format them as `x,y`.
pub(crate) fn point(x: f64, y: f64) -> Result<String> {
    for (name, value) in [("x", x), ("y", y)] {
        if !(0.0..=100.0).contains(&value) {
            return Err(CameraError::invalid(format!(
                "{name} must be between 0 and 100, got {value}"
            )));
        }
    }
    Ok(format!("{},{}", x.round(), y.round()))
}

/// Scalar or list value in the camera's flat wire format.
pub(crate) fn wire_value(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(wire_value).collect::<Vec<_>>().join(","),
        other => other.to_string(),
    }
}

pub(crate) fn into_snapshot(endpoint: &str, value: Value) -> Result<Snapshot> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(CameraError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: format!("expected an object, got {other}"),
        }),
    }
}
