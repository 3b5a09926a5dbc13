//! Output mode abstraction for robot and human output.

use serde::Serialize;
use serde_json::Value;

use crate::adapter::PhotoDir;
use crate::error::CameraError;
use crate::events::CameraEvent;

pub mod human;
pub mod robot;

pub use human::HumanOutput;
pub use robot::RobotOutput;

/// Build metadata reported by `grctl version`.
#[derive(Debug, Clone, Serialize)]
pub struct VersionInfo {
    pub version: &'static str,
    pub git_sha: &'static str,
    pub git_dirty: &'static str,
    pub build_timestamp: &'static str,
    pub rustc: &'static str,
    pub target: &'static str,
}

/// Determines how command output is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// JSON on stdout for scripts and agents.
    Robot,
    /// Styled text for terminals.
    Human,
}

impl OutputMode {
    pub const fn from_flag(json: bool) -> Self {
        if json { Self::Robot } else { Self::Human }
    }

    pub const fn is_robot(self) -> bool {
        matches!(self, Self::Robot)
    }

    pub fn into_output(self) -> Box<dyn Output> {
        match self {
            Self::Robot => Box::new(RobotOutput::new()),
            Self::Human => Box::new(HumanOutput::new()),
        }
    }
}

/// Everything a command prints goes through this trait.
pub trait Output {
    fn success(&self, message: &str);
    fn error(&self, error: &CameraError);

    /// A titled JSON document (device info, status, settings).
    fn document(&self, title: &str, value: &Value);

    /// A titled list of names.
    fn list(&self, title: &str, items: &[String]);

    /// A single URL.
    fn url(&self, url: &str);

    /// One streamed camera event.
    fn event(&self, event: &CameraEvent);

    fn photos(&self, dirs: &[PhotoDir]);

    fn version_info(&self, info: &VersionInfo);
}
