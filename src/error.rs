//! Error types for camera control operations.

use thiserror::Error;

/// Primary error type for camera operations.
#[derive(Error, Debug)]
pub enum CameraError {
    // Pre-flight errors (no request is sent)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("{operation} is not supported on {family}")]
    NotSupported {
        operation: &'static str,
        family: &'static str,
    },

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("No camera connected")]
    NotConnected,

    // Transport errors
    #[error("Request to {endpoint} failed: {reason}")]
    Transport { endpoint: String, reason: String },

    #[error("Request to {endpoint} returned HTTP {status}")]
    HttpStatus { endpoint: String, status: u16 },

    #[error("Invalid response from {endpoint}: {reason}")]
    InvalidResponse { endpoint: String, reason: String },

    // Configuration errors
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    #[error("Configuration parse error: {0}")]
    ConfigParse(String),

    #[error("Invalid configuration: {0}")]
    ConfigInvalid(String),

    // General errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl CameraError {
    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub(crate) fn transport(endpoint: impl Into<String>, err: impl std::fmt::Display) -> Self {
        Self::Transport {
            endpoint: endpoint.into(),
            reason: err.to_string(),
        }
    }

    /// Returns true if the failure means the camera could not be reached.
    pub const fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport { .. } | Self::HttpStatus { .. } | Self::InvalidResponse { .. }
        )
    }

    /// Returns true if the error is recoverable by the user.
    pub const fn is_user_recoverable(&self) -> bool {
        matches!(
            self,
            Self::InvalidArgument(_)
                | Self::NotConnected
                | Self::ConfigNotFound { .. }
                | Self::ConfigInvalid(_)
        )
    }

    /// Returns a suggestion for how to fix the error.
    pub fn suggestion(&self) -> Option<&'static str> {
        match self {
            Self::NotConnected => Some("Join the camera's Wi-Fi network and turn on remote control"),
            Self::Transport { .. } => Some("Check that the camera is awake and still on Wi-Fi"),
            Self::ConfigNotFound { .. } => Some("Omit --config to use the default location"),
            Self::NotSupported { .. } => Some("Run `grctl info` to see which camera is connected"),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for CameraError {
    fn from(err: serde_json::Error) -> Self {
        Self::InvalidResponse {
            endpoint: "json".to_string(),
            reason: err.to_string(),
        }
    }
}

/// Convenience type alias for Results using CameraError.
pub type Result<T> = std::result::Result<T, CameraError>;
