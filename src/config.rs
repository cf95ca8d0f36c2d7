//! Configuration loading, saving and validation.
//!
//! Configuration is plain JSON. Every field is optional and falls back to a
//! default aimed at the stock Remote Desktop client:
//!
//! ```json
//! {
//!   "process_name": "mstsc.exe",
//!   "window_class": "IHWindowClass",
//!   "action": "key",
//!   "key": "a",
//!   "interval": "1s"
//! }
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{KeepAliveError, Result};
use crate::keys::{parse_key, VirtualKey};
use crate::scheduler::{MAX_INTERVAL, MIN_INTERVAL};

/// Which synthetic event a tick produces.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InjectionKind {
    /// Key-down followed by key-up of the configured key.
    #[default]
    Key,
    /// Left click at the center of the target window.
    Click,
}

/// How tick input reaches the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum InputChannel {
    /// Window messages posted to the located session window.
    #[default]
    Window,
    /// The keyboard stream the client forwards to the remote session.
    /// Key taps only.
    Session,
}

/// File extensions of connection files the supported clients accept.
pub const CONNECTION_FILE_EXTENSIONS: [&str; 2] = ["rdp", "ica"];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_process_name")]
    pub process_name: String,

    /// Class of the descendant window that receives the input.
    #[serde(default = "default_window_class")]
    pub window_class: String,

    #[serde(default)]
    pub action: InjectionKind,

    #[serde(default)]
    pub channel: InputChannel,

    /// `.rdp` or `.ica` file used to start the client when it is not
    /// running yet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_file: Option<String>,

    #[serde(default = "default_key")]
    pub key: String,

    #[serde(default = "default_interval", with = "duration_format")]
    pub interval: Duration,

    /// Attempts made while waiting for the client process and its window.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_retry_delay", with = "duration_format")]
    pub retry_delay: Duration,

    /// Global hotkey that toggles the simulation, e.g. `ctrl+alt+k`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub toggle_hotkey: Option<String>,

    #[serde(default)]
    pub verbose: bool,
}

fn default_process_name() -> String {
    "mstsc.exe".to_string()
}

fn default_window_class() -> String {
    "IHWindowClass".to_string()
}

fn default_key() -> String {
    "a".to_string()
}

fn default_interval() -> Duration {
    MIN_INTERVAL
}

fn default_max_retries() -> u32 {
    10
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(1)
}

impl Default for Config {
    fn default() -> Self {
        Self {
            process_name: default_process_name(),
            window_class: default_window_class(),
            action: InjectionKind::default(),
            channel: InputChannel::default(),
            connection_file: None,
            key: default_key(),
            interval: default_interval(),
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
            toggle_hotkey: None,
            verbose: false,
        }
    }
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self> {
        let content =
            fs::read_to_string(path).map_err(|e| KeepAliveError::config_load(path, e.to_string()))?;
        serde_json::from_str(&content).map_err(|e| KeepAliveError::config_load(path, e.to_string()))
    }

    pub fn save_to_file(&self, path: &str) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json).map_err(|e| KeepAliveError::config_save(path, e.to_string()))
    }

    /// Checks every precondition needed before a session is touched.
    pub fn validate(&self) -> Result<()> {
        if self.process_name.trim().is_empty() {
            return Err(KeepAliveError::configuration_invalid(
                "process_name cannot be empty",
            ));
        }

        if self.window_class.trim().is_empty() {
            return Err(KeepAliveError::configuration_invalid(
                "window_class cannot be empty",
            ));
        }

        if self.action == InjectionKind::Key {
            parse_key(&self.key)
                .map_err(|e| KeepAliveError::configuration_invalid(e.to_string()))?;
        }

        if self.channel == InputChannel::Session && self.action == InjectionKind::Click {
            return Err(KeepAliveError::configuration_invalid(
                "the session channel only carries key taps, use the window channel for clicks",
            ));
        }

        if let Some(file) = &self.connection_file {
            validate_connection_file(Path::new(file))?;
        }

        if self.interval < MIN_INTERVAL || self.interval > MAX_INTERVAL {
            return Err(KeepAliveError::configuration_invalid(format!(
                "interval must be between {}ms and {}ms, got {}ms",
                MIN_INTERVAL.as_millis(),
                MAX_INTERVAL.as_millis(),
                self.interval.as_millis()
            )));
        }

        if self.max_retries == 0 {
            return Err(KeepAliveError::configuration_invalid(
                "max_retries must be at least 1",
            ));
        }

        if let Some(hotkey) = &self.toggle_hotkey {
            crate::hotkey::parse_hotkey(hotkey)
                .map_err(|e| KeepAliveError::configuration_invalid(e.to_string()))?;
        }

        Ok(())
    }

    /// The key tapped on each tick. Only meaningful after `validate`.
    pub fn virtual_key(&self) -> Result<VirtualKey> {
        parse_key(&self.key)
    }
}

fn validate_connection_file(path: &Path) -> Result<()> {
    let supported = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| {
            CONNECTION_FILE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        });
    if !supported {
        return Err(KeepAliveError::configuration_invalid(format!(
            "connection file '{}' must be an .rdp or .ica file",
            path.display()
        )));
    }
    if !path.is_file() {
        return Err(KeepAliveError::configuration_invalid(format!(
            "connection file '{}' does not exist",
            path.display()
        )));
    }
    Ok(())
}

/// Parses `500ms`, `2s`, `1m` or a bare number of milliseconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let normalized = value.trim().to_lowercase();
    if normalized.is_empty() {
        return Err(KeepAliveError::invalid_duration(value, "empty duration"));
    }

    let split = normalized
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(normalized.len());
    let (number, unit) = normalized.split_at(split);

    if number.is_empty() {
        return Err(KeepAliveError::invalid_duration(
            value,
            "duration must start with a non-negative number",
        ));
    }

    let amount: u64 = number
        .parse()
        .map_err(|_| KeepAliveError::invalid_duration(value, "number out of range"))?;

    match unit.trim() {
        "" | "ms" => Ok(Duration::from_millis(amount)),
        "s" => Ok(Duration::from_secs(amount)),
        "m" => Ok(Duration::from_secs(amount.saturating_mul(60))),
        other => Err(KeepAliveError::invalid_duration(
            value,
            format!("unknown unit '{other}', expected ms, s or m"),
        )),
    }
}

mod duration_format {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format!("{}ms", duration.as_millis()))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let raw = String::deserialize(deserializer)?;
        super::parse_duration(&raw).map_err(serde::de::Error::custom)
    }
}
