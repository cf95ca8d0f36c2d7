//! Error types for session-keepalive.
//!
//! Startup failures (bad configuration, missing process, missing window) are
//! fatal and abort the run. Delivery problems after the scheduler starts are
//! best-effort and only logged.

use std::io;
use thiserror::Error;

/// Main error type for session-keepalive operations.
#[derive(Error, Debug)]
pub enum KeepAliveError {
    /// Preconditions for running are not met.
    #[error("invalid configuration: {0}")]
    ConfigurationInvalid(String),

    /// Error reading or parsing a configuration file.
    #[error("failed to load config from '{path}': {reason}")]
    ConfigLoad { path: String, reason: String },

    /// Error writing a configuration file.
    #[error("failed to save config to '{path}': {reason}")]
    ConfigSave { path: String, reason: String },

    #[error("invalid duration '{value}': {reason}")]
    InvalidDuration { value: String, reason: String },

    #[error("invalid key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The client could not be started with the connection file.
    #[error("failed to launch '{program}': {reason}")]
    ClientLaunch { program: String, reason: String },

    /// The remote client process did not show up.
    #[error("process '{name}' not found after {retries} attempts")]
    ProcessNotFound { name: String, retries: u32 },

    /// The process exists but never opened a main window.
    #[error("process '{name}' has no main window after {retries} attempts")]
    SessionNotReady { name: String, retries: u32 },

    /// No window in the process hierarchy carries the required class.
    #[error("no window with class '{class_name}': {reason}")]
    TargetNotFound { class_name: String, reason: String },

    /// Best-effort delivery failed. Never surfaced per tick.
    #[error("input delivery failed: {0}")]
    InjectionDeliveryFailure(String),

    #[error("operation not supported on this platform: {0}")]
    UnsupportedPlatform(String),

    #[error("hotkey error: {0}")]
    Hotkey(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for session-keepalive operations.
pub type Result<T> = std::result::Result<T, KeepAliveError>;

impl KeepAliveError {
    pub fn configuration_invalid(message: impl Into<String>) -> Self {
        Self::ConfigurationInvalid(message.into())
    }

    pub fn config_load(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigLoad {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn config_save(path: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConfigSave {
            path: path.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_duration(value: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidDuration {
            value: value.into(),
            reason: reason.into(),
        }
    }

    pub fn invalid_key(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidKey {
            key: key.into(),
            reason: reason.into(),
        }
    }

    pub fn client_launch(program: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ClientLaunch {
            program: program.into(),
            reason: reason.into(),
        }
    }

    pub fn process_not_found(name: impl Into<String>, retries: u32) -> Self {
        Self::ProcessNotFound {
            name: name.into(),
            retries,
        }
    }

    pub fn session_not_ready(name: impl Into<String>, retries: u32) -> Self {
        Self::SessionNotReady {
            name: name.into(),
            retries,
        }
    }

    pub fn target_not_found(class_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::TargetNotFound {
            class_name: class_name.into(),
            reason: reason.into(),
        }
    }

    pub fn injection_delivery_failure(message: impl Into<String>) -> Self {
        Self::InjectionDeliveryFailure(message.into())
    }

    pub fn unsupported_platform(message: impl Into<String>) -> Self {
        Self::UnsupportedPlatform(message.into())
    }

    pub fn hotkey(message: impl Into<String>) -> Self {
        Self::Hotkey(message.into())
    }

    /// Whether this error must abort the run before the scheduler starts.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Self::InjectionDeliveryFailure(_) | Self::Hotkey(_))
    }
}
