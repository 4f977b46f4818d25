//! Runtime configuration.
//!
//! The configuration is loaded from a JSON file whose path is passed on the
//! command line (`--config <path>`).  It is read once at start-up and never
//! written back.
//!
//! # Example
//!
//! ```json
//! {
//!   "tracker": {
//!     "poll_interval_ms": 250,
//!     "settle_delay_ms": 200,
//!     "verify_shell_switch": true
//!   },
//!   "hotkeys": {
//!     "key_pause_ms": 20,
//!     "lead_in_ms": 50,
//!     "next_desktop_hotkey": true
//!   }
//! }
//! ```

use crate::strategy::{KeyTiming, Verification};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Top-level configuration.
///
/// Every field is optional: a minimal `{}` file is valid and all sections
/// fall back to their compiled-in defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Polling and switch timing.
    #[serde(default)]
    pub tracker: TrackerConfig,

    /// Synthetic and global hotkey settings.
    #[serde(default)]
    pub hotkeys: HotkeyConfig,
}

/// Polling and switch timing.  All durations are in **milliseconds**.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Interval between state reads while monitoring.
    pub poll_interval_ms: u64,
    /// Wait after dispatching a switch before re-reading state.
    pub settle_delay_ms: u64,
    /// Confirm shell automation switches by re-reading the active desktop.
    pub verify_shell_switch: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 250,
            settle_delay_ms: 200,
            verify_shell_switch: true,
        }
    }
}

impl TrackerConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }

    /// Shell verification settings, or `None` if disabled.
    pub fn verification(&self) -> Option<Verification> {
        self.verify_shell_switch.then(Verification::default)
    }
}

/// Synthetic and global hotkey settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HotkeyConfig {
    /// Pause between synthetic key transitions (ms).
    pub key_pause_ms: u64,
    /// Pause before the first synthetic key goes down (ms).
    pub lead_in_ms: u64,
    /// Register Alt+` as a global "next desktop" hotkey.
    pub next_desktop_hotkey: bool,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            key_pause_ms: 20,
            lead_in_ms: 50,
            next_desktop_hotkey: true,
        }
    }
}

impl HotkeyConfig {
    pub fn key_timing(&self) -> KeyTiming {
        KeyTiming {
            lead_in: Duration::from_millis(self.lead_in_ms),
            pause: Duration::from_millis(self.key_pause_ms),
        }
    }
}

impl Config {
    /// Load configuration from a JSON file at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read {}: {}", path.display(), e)))?;
        let config: Self = serde_json::from_str(&contents)
            .map_err(|e| ConfigError(format!("failed to parse {}: {}", path.display(), e)))?;
        Ok(config)
    }
}

/// Error from loading or parsing a configuration file.
#[derive(Debug, thiserror::Error)]
#[error("config error: {0}")]
pub struct ConfigError(String);
