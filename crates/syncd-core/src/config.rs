//! Daemon configuration (spec §6 "Configuration").
//!
//! A JSON settings file located via an OS-appropriate search path
//! (`dirs::config_dir()`, the teacher's pattern). Recognized options:
//! `port` (admin listener), `remotePollingSeconds` (poll interval),
//! `httpTimeoutSeconds`, and the remote file service's connection
//! details (`remoteBaseUrl`/`remoteUsername`/`remoteToken`, spec §6).
//! CLI flags mirror `port` and `skipTray`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default poll interval (spec §5: "Poll interval defaults to 30 s").
pub const DEFAULT_POLL_SECONDS: u64 = 30;
/// Default HTTP timeout (spec §5: "configurable timeout (default 30 s)").
pub const DEFAULT_HTTP_TIMEOUT_SECONDS: u64 = 30;
const DEFAULT_PORT: u16 = 7276;
const DEFAULT_LOG_CAPACITY: usize = 5_000;

/// Top-level daemon settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    /// Admin listener port (out-of-scope admin surface, but the setting
    /// itself is still read from the same config file the teacher uses).
    #[serde(default = "default_port")]
    pub port: u16,

    /// Remote poller interval, seconds.
    #[serde(default = "default_poll_seconds")]
    pub remote_polling_seconds: u64,

    /// Timeout applied to every remote HTTP call.
    #[serde(default = "default_http_timeout")]
    pub http_timeout_seconds: u64,

    /// Number of entries kept in the bounded log ring (spec §6:
    /// "1,000-10,000 entries").
    #[serde(default = "default_log_capacity")]
    pub log_capacity: usize,

    /// Accepted for CLI compatibility; no tray shell is implemented by
    /// this workspace (out of scope per spec.md), so the flag is parsed
    /// and otherwise ignored.
    #[serde(default)]
    pub skip_tray: bool,

    /// Base URL of the remote file service (spec §6 "Remote file
    /// service"), e.g. `https://files.example.com`. Empty until
    /// configured; the daemon refuses to start the remote side without it.
    #[serde(default)]
    pub remote_base_url: String,

    /// HTTP Basic auth username against the remote file service.
    #[serde(default)]
    pub remote_username: String,

    /// HTTP Basic auth token or password against the remote file
    /// service (spec §6: "HTTP Basic with (username, token-or-password)").
    #[serde(default)]
    pub remote_token: String,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_poll_seconds() -> u64 {
    DEFAULT_POLL_SECONDS
}
fn default_http_timeout() -> u64 {
    DEFAULT_HTTP_TIMEOUT_SECONDS
}
fn default_log_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            port: default_port(),
            remote_polling_seconds: default_poll_seconds(),
            http_timeout_seconds: default_http_timeout(),
            log_capacity: default_log_capacity(),
            skip_tray: false,
            remote_base_url: String::new(),
            remote_username: String::new(),
            remote_token: String::new(),
        }
    }
}

impl Settings {
    /// Loads settings from `path`, failing if the file exists but is
    /// malformed.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        let settings: Settings = serde_json::from_str(&contents)?;
        Ok(settings)
    }

    /// Loads settings from `path`, falling back to defaults if the file
    /// is absent (first run).
    pub fn load_or_default(path: &Path) -> Self {
        if path.exists() {
            match Self::load(path) {
                Ok(settings) => return settings,
                Err(e) => {
                    tracing::warn!(error = %e, ?path, "failed to parse settings file, using defaults");
                }
            }
        }
        Self::default()
    }

    /// The OS-appropriate config file path: `<config_dir>/syncd/settings.json`.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(std::env::temp_dir)
            .join("syncd")
            .join("settings.json")
    }

    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let s = Settings::default();
        assert_eq!(s.remote_polling_seconds, 30);
        assert_eq!(s.http_timeout_seconds, 30);
        assert!(!s.skip_tray);
    }

    #[test]
    fn missing_fields_fall_back_to_defaults() {
        let s: Settings = serde_json::from_str("{}").unwrap();
        assert_eq!(s.port, DEFAULT_PORT);
        assert_eq!(s.remote_polling_seconds, DEFAULT_POLL_SECONDS);
        assert!(s.remote_base_url.is_empty());
    }

    #[test]
    fn remote_connection_fields_round_trip() {
        let mut s = Settings::default();
        s.remote_base_url = "https://files.example.com".into();
        s.remote_username = "alice".into();
        s.remote_token = "secret".into();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"remoteBaseUrl\""));
        let back: Settings = serde_json::from_str(&json).unwrap();
        assert_eq!(back.remote_base_url, "https://files.example.com");
        assert_eq!(back.remote_token, "secret");
    }

    #[test]
    fn load_or_default_survives_missing_file() {
        let s = Settings::load_or_default(&PathBuf::from("/nonexistent/settings.json"));
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let mut s = Settings::default();
        s.port = 9999;
        s.remote_polling_seconds = 15;
        s.save(&path).unwrap();

        let loaded = Settings::load(&path).unwrap();
        assert_eq!(loaded.port, 9999);
        assert_eq!(loaded.remote_polling_seconds, 15);
    }

    #[test]
    fn camel_case_field_names() {
        let s = Settings::default();
        let json = serde_json::to_string(&s).unwrap();
        assert!(json.contains("\"remotePollingSeconds\""));
        assert!(json.contains("\"httpTimeoutSeconds\""));
        assert!(json.contains("\"skipTray\""));
    }
}
