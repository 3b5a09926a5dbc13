//! Remote control for Ricoh GR II / GR III / GR IIIx cameras over Wi-Fi.
//!
//! The library backs the `grctl` CLI and can be embedded directly.
//!
//! # Modules
//!
//! - `controller`: detection, adapter hot-swap and event forwarding
//! - `adapter`: per-generation protocol adapters
//! - `transport`: HTTP access to the camera (plus a mock for tests)
//! - `poller`: cancellable periodic timer
//! - `diff`: key-wise snapshot comparison
//! - `events`: camera event types and the listener registry
//! - `shoot_mode`: drive mode / self-timer encoding
//! - `config`: settings file handling
#![forbid(unsafe_code)]

pub mod adapter;
pub mod cli;
pub mod config;
pub mod controller;
pub mod diff;
pub mod error;
pub mod events;
pub mod logging;
pub mod output;
pub mod poller;
pub mod shoot_mode;
pub mod transport;

pub use adapter::{CameraAdapter, CaptureSettings, DeviceFamily, PhotoDir, PhotoSize};
pub use controller::{Controller, ControllerOptions, ControllerState};
pub use error::{CameraError, Result};
pub use events::{CameraEvent, EventBus, EventKind, ListenerId};

/// Flat key-value view of a camera property payload.
pub type Snapshot = serde_json::Map<String, serde_json::Value>;
