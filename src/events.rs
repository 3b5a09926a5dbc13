//! Semantic camera events and the callback registry that delivers them.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tracing::trace;

use crate::Snapshot;
use crate::diff::Differences;

/// Event names, used for subscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Connected,
    Disconnected,
    CaptureSettingsChanged,
    FocusChanged,
    OrientationChanged,
    StorageChanged,
}

impl EventKind {
    pub const ALL: [Self; 6] = [
        Self::Connected,
        Self::Disconnected,
        Self::CaptureSettingsChanged,
        Self::FocusChanged,
        Self::OrientationChanged,
        Self::StorageChanged,
    ];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Connected => "connected",
            Self::Disconnected => "disconnected",
            Self::CaptureSettingsChanged => "capture_settings_changed",
            Self::FocusChanged => "focus_changed",
            Self::OrientationChanged => "orientation_changed",
            Self::StorageChanged => "storage_changed",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which snapshot keys trigger which change event.
pub type EventKeyMap = &'static [(EventKind, &'static [&'static str])];

/// An event emitted by an adapter (and re-emitted by the controller).
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum CameraEvent {
    Connected {
        snapshot: Arc<Snapshot>,
    },
    Disconnected,
    CaptureSettingsChanged {
        snapshot: Arc<Snapshot>,
        differences: Arc<Differences>,
    },
    FocusChanged {
        snapshot: Arc<Snapshot>,
        differences: Arc<Differences>,
    },
    OrientationChanged {
        snapshot: Arc<Snapshot>,
        differences: Arc<Differences>,
    },
    StorageChanged {
        snapshot: Arc<Snapshot>,
        differences: Arc<Differences>,
    },
}

impl CameraEvent {
    /// Build the change event for `kind`. `None` for connection events.
    pub fn changed(
        kind: EventKind,
        snapshot: Arc<Snapshot>,
        differences: Arc<Differences>,
    ) -> Option<Self> {
        match kind {
            EventKind::CaptureSettingsChanged => Some(Self::CaptureSettingsChanged {
                snapshot,
                differences,
            }),
            EventKind::FocusChanged => Some(Self::FocusChanged {
                snapshot,
                differences,
            }),
            EventKind::OrientationChanged => Some(Self::OrientationChanged {
                snapshot,
                differences,
            }),
            EventKind::StorageChanged => Some(Self::StorageChanged {
                snapshot,
                differences,
            }),
            EventKind::Connected | EventKind::Disconnected => None,
        }
    }

    pub const fn kind(&self) -> EventKind {
        match self {
            Self::Connected { .. } => EventKind::Connected,
            Self::Disconnected => EventKind::Disconnected,
            Self::CaptureSettingsChanged { .. } => EventKind::CaptureSettingsChanged,
            Self::FocusChanged { .. } => EventKind::FocusChanged,
            Self::OrientationChanged { .. } => EventKind::OrientationChanged,
            Self::StorageChanged { .. } => EventKind::StorageChanged,
        }
    }

    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Self::Connected { snapshot }
            | Self::CaptureSettingsChanged { snapshot, .. }
            | Self::FocusChanged { snapshot, .. }
            | Self::OrientationChanged { snapshot, .. }
            | Self::StorageChanged { snapshot, .. } => Some(snapshot),
            Self::Disconnected => None,
        }
    }

    pub fn differences(&self) -> Option<&Arc<Differences>> {
        match self {
            Self::CaptureSettingsChanged { differences, .. }
            | Self::FocusChanged { differences, .. }
            | Self::OrientationChanged { differences, .. }
            | Self::StorageChanged { differences, .. } => Some(differences),
            Self::Connected { .. } | Self::Disconnected => None,
        }
    }
}

/// Handle returned by [`EventBus::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

pub type Handler = Arc<dyn Fn(&CameraEvent) + Send + Sync>;

struct Listener {
    id: ListenerId,
    kind: EventKind,
    once: bool,
    handler: Handler,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    listeners: Vec<Listener>,
}

/// Per-component list of event callbacks.
///
/// Handlers run outside the registry lock, so a handler may subscribe or
/// unsubscribe (including itself) while an event is being delivered.
#[derive(Default)]
pub struct EventBus {
    registry: Mutex<Registry>,
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.lock().listeners.len())
            .finish()
    }
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.registry
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn add(&self, kind: EventKind, once: bool, handler: Handler) -> ListenerId {
        let mut registry = self.lock();
        registry.next_id += 1;
        let id = ListenerId(registry.next_id);
        registry.listeners.push(Listener {
            id,
            kind,
            once,
            handler,
        });
        id
    }

    /// Call `handler` for every `kind` event until unsubscribed.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&CameraEvent) + Send + Sync + 'static,
    {
        self.add(kind, false, Arc::new(handler))
    }

    /// Call `handler` for the next `kind` event only.
    pub fn once<F>(&self, kind: EventKind, handler: F) -> ListenerId
    where
        F: Fn(&CameraEvent) + Send + Sync + 'static,
    {
        self.add(kind, true, Arc::new(handler))
    }

    /// Detach a listener. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: ListenerId) -> bool {
        let mut registry = self.lock();
        let before = registry.listeners.len();
        registry.listeners.retain(|l| l.id != id);
        registry.listeners.len() != before
    }

    pub fn listener_count(&self, kind: EventKind) -> usize {
        self.lock()
            .listeners
            .iter()
            .filter(|l| l.kind == kind)
            .count()
    }

    /// Deliver `event` to every listener of its kind.
    pub fn emit(&self, event: &CameraEvent) {
        let kind = event.kind();
        let handlers: Vec<Handler> = {
            let mut registry = self.lock();
            let handlers = registry
                .listeners
                .iter()
                .filter(|l| l.kind == kind)
                .map(|l| Arc::clone(&l.handler))
                .collect();
            registry.listeners.retain(|l| !(l.once && l.kind == kind));
            handlers
        };

        trace!(event = %kind, listeners = handlers.len(), "Emitting event");
        for handler in handlers {
            handler(event);
        }
    }
}
