//! Bridge settings file.
//!
//! Settings live in `opcua-settings.json` inside the host's data
//! folder:
//!
//! ```json
//! { "portNumber": 23591, "pgmEndToStartInterval": 1.0, "useHTTPS": true, "abortOnModeExit": false }
//! ```
//!
//! A missing file is created with defaults. An unreadable or corrupt
//! file falls back to defaults without being overwritten. Missing keys
//! take their individual defaults.

use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use opcua_bridge_gateway::GatewayEndpoint;
use serde::{Deserialize, Serialize};

/// File name inside the data folder.
pub const SETTINGS_FILE_NAME: &str = "opcua-settings.json";

/// Default gateway port.
pub const DEFAULT_PORT: u16 = 23591;

/// Default delay between program end and the automatic restart, in seconds.
pub const DEFAULT_RESUME_INTERVAL_SECS: f64 = 1.0;

// ---------------------------------------------------------------------------
// Settings
// ---------------------------------------------------------------------------

/// Immutable bridge configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "portNumber", default = "default_port")]
    pub port: u16,

    /// Program end to start interval in seconds.
    #[serde(rename = "pgmEndToStartInterval", default = "default_resume_interval")]
    pub resume_interval_secs: f64,

    #[serde(rename = "useHTTPS", default = "default_use_https")]
    pub use_https: bool,

    /// Pulse `Aborted` when the polled mode leaves SemiAuto/Auto.
    #[serde(rename = "abortOnModeExit", default)]
    pub abort_on_mode_exit: bool,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_resume_interval() -> f64 {
    DEFAULT_RESUME_INTERVAL_SECS
}

fn default_use_https() -> bool {
    true
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            resume_interval_secs: DEFAULT_RESUME_INTERVAL_SECS,
            use_https: true,
            abort_on_mode_exit: false,
        }
    }
}

impl Settings {
    /// Delay before a deferred "raise running". Negative and NaN values
    /// collapse to zero; values too large for a `Duration` saturate.
    pub fn resume_interval(&self) -> Duration {
        let secs = self.resume_interval_secs;
        if secs.is_nan() || secs <= 0.0 {
            return Duration::ZERO;
        }
        Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX)
    }

    pub fn endpoint(&self) -> GatewayEndpoint {
        GatewayEndpoint::new(self.port, self.use_https)
    }
}

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for settings file access.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Settings file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Read settings from `path`. `Ok(None)` when the file does not exist.
pub fn read_settings(path: &Path) -> Result<Option<Settings>, SettingsError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    Ok(Some(serde_json::from_str(&raw)?))
}

/// Write `settings` to `path` as pretty JSON.
pub fn write_settings(path: &Path, settings: &Settings) -> Result<(), SettingsError> {
    let json = serde_json::to_string_pretty(settings)?;
    std::fs::write(path, json)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// SettingsStore
// ---------------------------------------------------------------------------

/// Loads the settings file once and hands out the result.
///
/// Concurrent [`load`](Self::load) calls block on the same one-time
/// initialisation, so the file is read (and possibly created) exactly
/// once per store.
pub struct SettingsStore {
    path: PathBuf,
    loaded: OnceLock<Arc<Settings>>,
}

impl SettingsStore {
    /// Store backed by an explicit file path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            loaded: OnceLock::new(),
        }
    }

    /// Store backed by [`SETTINGS_FILE_NAME`] inside `data_folder`.
    pub fn in_data_folder(data_folder: impl AsRef<Path>) -> Self {
        Self::new(data_folder.as_ref().join(SETTINGS_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load settings, falling back to defaults. Idempotent.
    pub fn load(&self) -> Arc<Settings> {
        self.loaded
            .get_or_init(|| Arc::new(self.read_or_default()))
            .clone()
    }

    fn read_or_default(&self) -> Settings {
        match read_settings(&self.path) {
            Ok(Some(settings)) => {
                tracing::info!(path = %self.path.display(), ?settings, "Loaded settings");
                settings
            }
            Ok(None) => {
                let settings = Settings::default();
                match write_settings(&self.path, &settings) {
                    Ok(()) => {
                        tracing::info!(path = %self.path.display(), "Wrote default settings");
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %self.path.display(),
                            error = %e,
                            "Failed to persist default settings",
                        );
                    }
                }
                settings
            }
            Err(e) => {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "Unreadable settings file, using defaults",
                );
                Settings::default()
            }
        }
    }
}
